use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Wrapper for contact details (emails, phone numbers) so request and booking
/// structs can be passed to log macros like `tracing::info!("{:?}", ..)`
/// without leaking the underlying value. Only the first character survives.
#[derive(Clone, Deserialize, PartialEq, Eq)]
pub struct Masked<T>(pub T);

impl<T: fmt::Display> fmt::Debug for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let raw = self.0.to_string();
        match raw.chars().next() {
            Some(first) => write!(f, "{}***", first),
            None => write!(f, "***"),
        }
    }
}

impl<T: fmt::Display> fmt::Display for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl<T: Serialize> Serialize for Masked<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        // API responses carry the real value; the mask only applies to the
        // Debug/Display paths log macros use.
        self.0.serialize(serializer)
    }
}

impl<T> Masked<T> {
    pub fn into_inner(self) -> T {
        self.0
    }

    pub fn as_inner(&self) -> &T {
        &self.0
    }
}

impl From<String> for Masked<String> {
    fn from(value: String) -> Self {
        Masked(value)
    }
}

impl From<&str> for Masked<String> {
    fn from(value: &str) -> Self {
        Masked(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_is_masked() {
        let email: Masked<String> = "customer@example.com".into();
        assert_eq!(format!("{:?}", email), "c***");
        assert_eq!(format!("{}", email), "c***");
    }

    #[test]
    fn empty_value_is_still_masked() {
        let empty: Masked<String> = "".into();
        assert_eq!(format!("{:?}", empty), "***");
    }

    #[test]
    fn serialization_exposes_the_real_value() {
        let phone: Masked<String> = "+84901234567".into();
        let json = serde_json::to_string(&phone).unwrap();
        assert_eq!(json, "\"+84901234567\"");
    }

    #[test]
    fn deserialization_round_trips() {
        let parsed: Masked<String> = serde_json::from_str("\"a@b.vn\"").unwrap();
        assert_eq!(parsed.as_inner(), "a@b.vn");
    }
}
