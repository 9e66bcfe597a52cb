//! Decoding of change feed payloads into typed entities.

use std::fmt;

use crate::models::{CongestionStatus, CongestionStatusRow, InvalidCongestionLevel};

/// Why a feed payload could not be turned into a [`CongestionStatus`].
#[derive(Debug)]
pub enum PayloadError {
    /// Missing fields or wrong JSON types
    Shape(serde_json::Error),
    /// Well-formed row with a status outside the known levels
    Status(InvalidCongestionLevel),
}

impl fmt::Display for PayloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PayloadError::Shape(err) => write!(f, "malformed status payload: {}", err),
            PayloadError::Status(err) => write!(f, "malformed status payload: {}", err),
        }
    }
}

impl std::error::Error for PayloadError {}

/// Decode an inserted `congestion_statuses` row.
pub fn decode_status(payload: serde_json::Value) -> Result<CongestionStatus, PayloadError> {
    let row: CongestionStatusRow = serde_json::from_value(payload).map_err(PayloadError::Shape)?;
    CongestionStatus::try_from(row).map_err(PayloadError::Status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CongestionLevel;
    use serde_json::json;

    #[test]
    fn test_decode_valid_row() {
        let status = decode_status(json!({
            "id": "c9",
            "store_id": "s1",
            "status": "somewhat-crowded",
            "user_id": "u2",
            "created_at": "2024-05-01T12:00:00.000000Z"
        }))
        .unwrap();

        assert_eq!(status.id, "c9");
        assert_eq!(status.store_id, "s1");
        assert_eq!(status.status, CongestionLevel::SomewhatCrowded);
        assert_eq!(status.user_id, "u2");
        assert_eq!(status.timestamp, "2024-05-01T12:00:00.000000Z");
    }

    #[test]
    fn test_decode_rejects_missing_fields() {
        let err = decode_status(json!({ "id": "c9", "status": "full" })).unwrap_err();
        assert!(matches!(err, PayloadError::Shape(_)));
    }

    #[test]
    fn test_decode_rejects_unknown_status() {
        let err = decode_status(json!({
            "id": "c9",
            "store_id": "s1",
            "status": "overflowing",
            "user_id": "u2",
            "created_at": "2024-05-01T12:00:00.000000Z"
        }))
        .unwrap_err();
        assert!(matches!(err, PayloadError::Status(_)));
    }

    #[test]
    fn test_decode_rejects_non_object() {
        assert!(decode_status(json!("full")).is_err());
    }
}
