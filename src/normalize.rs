//! Comparison keys for free-text product names.
//!
//! Different naming vocabularies spell the same product in different ways
//! (`"Apache HTTP Server"`, `"apache-http-server"`, `"Apache_HTTP_Server"`).
//! [`normalize_key`] folds case and drops everything that is not a letter or
//! digit so those spellings collapse to one key.

/// Turn a raw identity string into its canonical comparison key.
///
/// The function is pure and idempotent: `normalize_key(&normalize_key(s))`
/// always equals `normalize_key(s)`.
///
/// # Examples
///
/// ```rust
/// use fingerprint_engine::normalize_key;
///
/// assert_eq!(normalize_key("Apache HTTP-Server"), "apachehttpserver");
/// assert_eq!(normalize_key("NGINX"), normalize_key("nginx"));
/// ```
pub fn normalize_key(raw: &str) -> String {
    raw.chars()
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_alphanumeric())
        .collect()
}
