// src/ident.rs

//! Reversible mapping between a URL and a storage-safe identifier.
//!
//! The document store partitions runs by URL, but URLs contain characters
//! that are illegal in partition names (most notably `/`). The codec
//! substitutes `/` with `__`. To keep the transform injective for URLs that
//! already contain `%` or `_`, those characters are percent-escaped before
//! the slash substitution, so `decode(encode(u)) == u` holds for every URL.

/// Encode a URL into a storage-legal identifier.
pub fn encode(url: &str) -> String {
    url.replace('%', "%25").replace('_', "%5F").replace('/', "__")
}

/// Decode a storage identifier back into the original URL.
///
/// Exact inverse of [`encode`]. Escape sequences are unwound in reverse
/// order: `__` first (only slashes produce it), then `%5F`, then `%25`.
pub fn decode(id: &str) -> String {
    id.replace("__", "/").replace("%5F", "_").replace("%25", "%")
}
