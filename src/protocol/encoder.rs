//! Outbound message encoding.
//!
//! The bridge never chooses a wire format itself; it is handed an encoder
//! that turns an application message into one text frame.

// ============================================================================
// Imports
// ============================================================================

use serde::Serialize;

use crate::error::Result;

// ============================================================================
// MessageEncoder
// ============================================================================

/// Converts an application message into transport text.
///
/// Implementations must be side-effect free and must not block.
pub trait MessageEncoder<M: ?Sized>: Send + Sync {
    /// Encodes `message` as a single text frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the message cannot be represented as text.
    fn encode(&self, message: &M) -> Result<String>;
}

// ============================================================================
// JsonEncoder
// ============================================================================

/// Encodes any [`Serialize`] message as compact JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonEncoder;

impl<M> MessageEncoder<M> for JsonEncoder
where
    M: Serialize + ?Sized,
{
    #[inline]
    fn encode(&self, message: &M) -> Result<String> {
        Ok(serde_json::to_string(message)?)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::BTreeMap;

    use serde::ser::Error as _;

    use crate::error::Error;

    struct Unencodable;

    impl Serialize for Unencodable {
        fn serialize<S: serde::Serializer>(&self, _: S) -> std::result::Result<S::Ok, S::Error> {
            Err(S::Error::custom("refused"))
        }
    }

    #[test]
    fn test_json_encoder_compact() {
        let mut map = BTreeMap::new();
        map.insert("a", 1);
        map.insert("b", 2);

        let text = JsonEncoder.encode(&map).expect("encode");
        assert_eq!(text, r#"{"a":1,"b":2}"#);
    }

    #[test]
    fn test_json_encoder_str() {
        let text = JsonEncoder.encode("line").expect("encode");
        assert_eq!(text, r#""line""#);
    }

    #[test]
    fn test_json_encoder_failure() {
        let err = JsonEncoder.encode(&Unencodable).unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }
}
