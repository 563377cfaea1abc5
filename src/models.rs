//! Data models for humidity readings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

// ---

/// A stored humidity observation.
///
/// `id` and `timestamp` are assigned by storage on insert. The humidity value
/// is nullable in the table, and clients reading the JSON back may hand us
/// anything, so deserialization never fails on that field: a value that is
/// not a number (or a numeric string) becomes `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Reading {
    // ---
    pub id: i32,
    pub timestamp: DateTime<Utc>,
    #[serde(default, deserialize_with = "lenient_humidity")]
    pub humidity_value: Option<f64>,
    pub location: String,
}

impl Reading {
    // ---
    /// The humidity value if it can take part in numeric aggregation.
    pub fn valid_humidity(&self) -> Option<f64> {
        self.humidity_value.filter(|v| v.is_finite())
    }

    /// Humidity formatted for listings, `"N/A"` when unusable.
    pub fn humidity_display(&self) -> String {
        match self.valid_humidity() {
            Some(v) => format!("{v:.2}%"),
            None => "N/A".to_string(),
        }
    }
}

fn lenient_humidity<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    // ---
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}

/// Rejection reasons for the write path.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("request body must be a JSON object")]
    NotAnObject,

    #[error("humidity_value must be a finite number")]
    InvalidHumidity,

    #[error("location must be a non-empty string")]
    InvalidLocation,
}

/// Validated payload for inserting a reading.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewReading {
    // ---
    pub humidity_value: f64,
    pub location: String,
}

impl NewReading {
    // ---
    /// Validate an untyped request body.
    ///
    /// Types are checked strictly here, unlike [`Reading`]: a numeric string is
    /// not accepted as a humidity value on the way in.
    pub fn from_json(body: &Value) -> Result<Self, ValidationError> {
        // ---
        let obj = body.as_object().ok_or(ValidationError::NotAnObject)?;

        let humidity_value = obj
            .get("humidity_value")
            .and_then(Value::as_f64)
            .filter(|v| v.is_finite())
            .ok_or(ValidationError::InvalidHumidity)?;

        let location = obj
            .get("location")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(ValidationError::InvalidLocation)?;

        Ok(NewReading {
            humidity_value,
            location: location.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn create_test_reading(humidity_value: Option<f64>) -> Reading {
        // ---
        Reading {
            id: 7,
            timestamp: Utc.with_ymd_and_hms(2025, 3, 26, 18, 45, 0).unwrap(),
            humidity_value,
            location: "ubicacion 1".to_string(),
        }
    }

    #[test]
    fn test_valid_humidity_excludes_non_finite() {
        // ---
        assert_eq!(create_test_reading(Some(35.5)).valid_humidity(), Some(35.5));
        assert_eq!(create_test_reading(None).valid_humidity(), None);
        assert_eq!(create_test_reading(Some(f64::NAN)).valid_humidity(), None);
        assert_eq!(
            create_test_reading(Some(f64::INFINITY)).valid_humidity(),
            None
        );
    }

    #[test]
    fn test_humidity_display() {
        // ---
        assert_eq!(create_test_reading(Some(12.345)).humidity_display(), "12.35%");
        assert_eq!(create_test_reading(Some(40.0)).humidity_display(), "40.00%");
        assert_eq!(create_test_reading(None).humidity_display(), "N/A");
    }

    #[test]
    fn test_deserialize_tolerates_malformed_humidity() {
        // ---
        let rows: Vec<Reading> = serde_json::from_value(json!([
            {"id": 1, "timestamp": "2025-03-26T18:45:00Z", "humidity_value": 21.5, "location": "ubicacion 1"},
            {"id": 2, "timestamp": "2025-03-26T18:46:00Z", "humidity_value": null, "location": "ubicacion 1"},
            {"id": 3, "timestamp": "2025-03-26T18:47:00Z", "humidity_value": "wet", "location": "ubicacion 2"},
            {"id": 4, "timestamp": "2025-03-26T18:48:00Z", "location": "ubicacion 2"},
            {"id": 5, "timestamp": "2025-03-26T18:49:00Z", "humidity_value": " 33 ", "location": "ubicacion 2"},
            {"id": 6, "timestamp": "2025-03-26T18:50:00Z", "humidity_value": {"v": 1}, "location": "ubicacion 2"}
        ]))
        .unwrap();

        let values: Vec<Option<f64>> = rows.iter().map(|r| r.humidity_value).collect();
        assert_eq!(
            values,
            vec![Some(21.5), None, None, None, Some(33.0), None]
        );
    }

    #[test]
    fn test_new_reading_accepts_valid_body() {
        // ---
        let body = json!({"humidity_value": 42.5, "location": "  ubicacion 2 "});
        let reading = NewReading::from_json(&body).unwrap();

        assert_eq!(reading.humidity_value, 42.5);
        assert_eq!(reading.location, "ubicacion 2");
    }

    #[test]
    fn test_new_reading_rejects_bad_bodies() {
        // ---
        let cases = [
            (json!([1, 2]), ValidationError::NotAnObject),
            (json!({"location": "ubicacion 1"}), ValidationError::InvalidHumidity),
            (
                json!({"humidity_value": "12", "location": "ubicacion 1"}),
                ValidationError::InvalidHumidity,
            ),
            (
                json!({"humidity_value": null, "location": "ubicacion 1"}),
                ValidationError::InvalidHumidity,
            ),
            (json!({"humidity_value": 12}), ValidationError::InvalidLocation),
            (
                json!({"humidity_value": 12, "location": "   "}),
                ValidationError::InvalidLocation,
            ),
            (
                json!({"humidity_value": 12, "location": 5}),
                ValidationError::InvalidLocation,
            ),
        ];

        for (body, expected) in cases {
            assert_eq!(NewReading::from_json(&body), Err(expected), "body: {body}");
        }
    }
}
