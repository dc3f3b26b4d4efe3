use serde::{Deserialize, Serialize};

/// Revision of a saga instance, used for optimistic concurrency control.
///
/// An unsaved instance is at revision 0. Inserting it stores revision 1, and
/// every committed update increments the revision by one.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Revision(i64);

impl Revision {
    /// Creates a revision from a raw value.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the revision (0) of an instance that was never stored.
    pub fn initial() -> Self {
        Self(0)
    }

    /// Returns the revision (1) an instance is stored at when inserted.
    pub fn first() -> Self {
        Self(1)
    }

    /// Returns the next revision.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the raw revision value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Revision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Revision {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Revision> for i64 {
    fn from(revision: Revision) -> Self {
        revision.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_precedes_first() {
        assert_eq!(Revision::initial().next(), Revision::first());
        assert!(Revision::initial() < Revision::first());
        assert_eq!(Revision::default(), Revision::initial());
    }

    #[test]
    fn next_increments_by_one() {
        assert_eq!(Revision::new(41).next().as_i64(), 42);
    }

    #[test]
    fn serializes_as_plain_number() {
        let json = serde_json::to_string(&Revision::new(7)).unwrap();
        assert_eq!(json, "7");

        let parsed: Revision = serde_json::from_str("7").unwrap();
        assert_eq!(parsed, Revision::new(7));
    }
}
