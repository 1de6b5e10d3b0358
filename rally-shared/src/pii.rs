use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Wraps a secret (password, signing key, API key) so that it never shows up
/// in `Debug`/`Display` output or in anything serialised back out.
#[derive(Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Masked<T>(pub T);

impl<T> Masked<T> {
    pub fn new(value: T) -> Self {
        Self(value)
    }

    pub fn expose(&self) -> &T {
        &self.0
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> fmt::Debug for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "********")
    }
}

impl<T> fmt::Display for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "********")
    }
}

impl<T> Serialize for Masked<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str("********")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_never_printed() {
        let secret = Masked::new("admin123".to_string());
        assert_eq!(format!("{:?}", secret), "********");
        assert_eq!(serde_json::to_string(&secret).unwrap(), "\"********\"");
        assert_eq!(secret.expose(), "admin123");
    }

    #[test]
    fn test_deserializes_plain_value() {
        let secret: Masked<String> = serde_json::from_str("\"s3cret\"").unwrap();
        assert_eq!(secret.into_inner(), "s3cret");
    }
}
