use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier of the learner owning a progress record.
///
/// Zero is representable so that untrusted input can be carried up to the
/// validation boundary; `is_valid` tells the two apart.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(u64);

impl UserId {
    #[must_use]
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }

    /// Returns true for any positive id.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.0 > 0
    }
}

impl fmt::Debug for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserId({})", self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    kind: String,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {} from string", self.kind)
    }
}

impl std::error::Error for ParseIdError {}

impl FromStr for UserId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(UserId::new)
            .map_err(|_| ParseIdError {
                kind: "UserId".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_display_and_parse() {
        let id: UserId = " 42 ".parse().unwrap();
        assert_eq!(id, UserId::new(42));
        assert_eq!(id.to_string(), "42");
    }

    #[test]
    fn user_id_rejects_garbage() {
        assert!("not-a-number".parse::<UserId>().is_err());
        assert!("-3".parse::<UserId>().is_err());
    }

    #[test]
    fn zero_is_not_a_valid_user() {
        assert!(!UserId::new(0).is_valid());
        assert!(UserId::new(1).is_valid());
    }
}
