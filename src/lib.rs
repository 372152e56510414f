// src/lib.rs

//! lightkeeper: audit report lifecycle and score aggregation.

pub mod audit;
pub mod cache;
pub mod cleanup;
pub mod error;
pub mod ident;
pub mod models;
pub mod stats;
pub mod storage;
pub mod store;
