use core::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

const REDACTED: &str = "[REDACTED]";

/// The key used to authenticate against the upstream API.
///
/// Both `Debug` and `Display` print `[REDACTED]`, use [`ApiKey::expose`] to read the value.
/// The backing buffer is zeroed when dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct ApiKey(String);

impl ApiKey {
    /// Wrap a key value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Read-only access to the key.
    ///
    /// The returned value must only ever be placed into upstream requests.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Whether the key occurs anywhere inside of `haystack`.
    pub(crate) fn is_contained_in(&self, haystack: &[u8]) -> bool {
        let needle = self.0.as_bytes();
        !needle.is_empty() && haystack.windows(needle.len()).any(|window| window == needle)
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

impl fmt::Display for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

#[cfg(test)]
mod tests {
    use super::ApiKey;

    #[test]
    fn test_formatting_is_redacted() {
        let key = ApiKey::new("hunter2");
        assert_eq!(format!("{key}"), "[REDACTED]");
        assert_eq!(format!("{key:?}"), "[REDACTED]");
        assert_eq!(format!("{:?}", Some(key.clone())), "Some([REDACTED])");
        assert_eq!(key.expose(), "hunter2");
    }

    #[test]
    fn test_is_contained_in() {
        let key = ApiKey::new("hunter2");
        assert!(key.is_contained_in(b"hunter2"));
        assert!(key.is_contained_in(b"{\"error\":\"bad key hunter2\"}"));
        assert!(!key.is_contained_in(b"hunter"));
        assert!(!key.is_contained_in(b""));

        // An empty key never matches.
        assert!(!ApiKey::new("").is_contained_in(b"anything"));
    }
}
