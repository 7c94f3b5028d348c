/// Caller-chosen storage key identifying one business process.
///
/// Only the empty string is rejected; any other value, whitespace included,
/// is a usable key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BusinessKey(String);

impl BusinessKey {
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.is_empty() {
            return None;
        }
        Some(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BusinessKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
