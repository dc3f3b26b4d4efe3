use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A value used to match an incoming message to the saga instance it
/// belongs to.
///
/// Message-side and data-side key selectors both produce a `CorrelationKey`,
/// so messages and saga data of unrelated shapes can be compared. Keys of
/// different variants never compare equal: `Int(10)` does not match
/// `Text("10")`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum CorrelationKey {
    /// Signed integer key.
    Int(i64),
    /// Unsigned integer key too large for `Int`.
    Uint(u64),
    /// Free-form text key.
    Text(String),
    /// UUID key.
    Uuid(Uuid),
}

impl CorrelationKey {
    /// Returns the variant name, used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            CorrelationKey::Int(_) => "int",
            CorrelationKey::Uint(_) => "uint",
            CorrelationKey::Text(_) => "text",
            CorrelationKey::Uuid(_) => "uuid",
        }
    }
}

impl std::fmt::Display for CorrelationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CorrelationKey::Int(v) => write!(f, "{v}"),
            CorrelationKey::Uint(v) => write!(f, "{v}"),
            CorrelationKey::Text(v) => write!(f, "{v}"),
            CorrelationKey::Uuid(v) => write!(f, "{v}"),
        }
    }
}

macro_rules! impl_from_signed {
    ($($t:ty),*) => {
        $(impl From<$t> for CorrelationKey {
            fn from(value: $t) -> Self {
                CorrelationKey::Int(i64::from(value))
            }
        })*
    };
}

impl_from_signed!(i8, i16, i32, i64, u8, u16, u32);

impl From<u64> for CorrelationKey {
    fn from(value: u64) -> Self {
        match i64::try_from(value) {
            Ok(v) => CorrelationKey::Int(v),
            Err(_) => CorrelationKey::Uint(value),
        }
    }
}

impl From<String> for CorrelationKey {
    fn from(value: String) -> Self {
        CorrelationKey::Text(value)
    }
}

impl From<&str> for CorrelationKey {
    fn from(value: &str) -> Self {
        CorrelationKey::Text(value.to_string())
    }
}

impl From<Uuid> for CorrelationKey {
    fn from(value: Uuid) -> Self {
        CorrelationKey::Uuid(value)
    }
}

impl From<crate::InstanceId> for CorrelationKey {
    fn from(value: crate::InstanceId) -> Self {
        CorrelationKey::Uuid(value.as_uuid())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_widths_share_a_domain() {
        assert_eq!(CorrelationKey::from(800_i32), CorrelationKey::from(800_i64));
        assert_eq!(CorrelationKey::from(800_u32), CorrelationKey::from(800_u64));
        assert_eq!(CorrelationKey::from(7_u8), CorrelationKey::Int(7));
    }

    #[test]
    fn large_unsigned_values_stay_unsigned() {
        assert_eq!(CorrelationKey::from(u64::MAX), CorrelationKey::Uint(u64::MAX));
    }

    #[test]
    fn different_variants_never_match() {
        assert_ne!(CorrelationKey::from(10), CorrelationKey::from("10"));
    }

    #[test]
    fn display_shows_raw_value() {
        assert_eq!(CorrelationKey::from(23).to_string(), "23");
        assert_eq!(CorrelationKey::from("order-1").to_string(), "order-1");
        assert_eq!(CorrelationKey::from("order-1").kind(), "text");
    }

    #[test]
    fn serializes_with_variant_tag() {
        let json = serde_json::to_value(CorrelationKey::from(12)).unwrap();
        assert_eq!(json, serde_json::json!({"type": "Int", "value": 12}));
    }
}
