use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// An API key that never prints its cleartext.
///
/// `Debug` and `Display` show a masked form; call [`Secret::expose`] at the
/// single point where the key goes on the wire.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Non-blank and not a `your-...-key-here` placeholder.
    pub fn is_usable(&self) -> bool {
        is_usable_key(&self.0)
    }

    pub fn masked(&self) -> String {
        mask_key(&self.0)
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret({})", self.masked())
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.masked())
    }
}

impl From<String> for Secret {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for Secret {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl<'de> Deserialize<'de> for Secret {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self)
    }
}

/// Serialises masked. Config files are written from TOML text, never from
/// this impl, so nothing that round-trips through serde leaks the key.
impl Serialize for Secret {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.masked())
    }
}

/// Whether a raw key string is worth sending.
pub fn is_usable_key(key: &str) -> bool {
    let key = key.trim();
    if key.is_empty() {
        return false;
    }
    let lower = key.to_ascii_lowercase();
    !(lower.starts_with("your-") && lower.ends_with("-key-here"))
}

/// First 8 characters, bullets, last 4. Short keys are fully hidden.
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.is_empty() {
        return String::new();
    }
    if chars.len() <= 12 {
        return "•".repeat(chars.len());
    }
    let head: String = chars[..8].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}{}{tail}", "•".repeat(8))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_and_display_hide_cleartext() {
        let key = Secret::new("sk-or-v1-abcdef1234567890wxyz");
        assert!(!format!("{key:?}").contains("abcdef1234567890"));
        assert!(!key.to_string().contains("abcdef1234567890"));
        assert_eq!(key.to_string(), "sk-or-v1••••••••wxyz");
    }

    #[test]
    fn placeholders_and_blanks_are_not_usable() {
        assert!(!is_usable_key(""));
        assert!(!is_usable_key("   "));
        assert!(!is_usable_key("your-openrouter-key-here"));
        assert!(!is_usable_key("YOUR-DEEPSEEK-KEY-HERE"));
        assert!(is_usable_key("sk-live-123"));
    }

    #[test]
    fn short_keys_are_fully_masked() {
        assert_eq!(mask_key("abc"), "•••");
        assert_eq!(mask_key(""), "");
    }
}
