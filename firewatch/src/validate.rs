use serde_json::Value;

use crate::errors::{Error, Result};

/// The coerced fields of an inbound sample, before the server assigns a
/// timestamp.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorInput {
    pub smoke: i64,
    pub temperature: f64,
    pub humidity: f64,
}

/// Coerces an untyped ingest payload into well-formed sensor fields.
///
/// Missing fields and nulls default to zero, numeric strings are parsed and
/// smoke is clamped to be non-negative. A value that cannot be read as a
/// number at all is the only rejection. A missing body counts as an empty
/// object.
pub fn parse_payload(body: &Value) -> Result<SensorInput> {
    let map = match body {
        Value::Object(map) => map,
        Value::Null => {
            return Ok(SensorInput {
                smoke: 0,
                temperature: 0.0,
                humidity: 0.0,
            })
        }
        _ => {
            return Err(Error::Validation(
                "payload must be a JSON object".to_string(),
            ))
        }
    };

    Ok(SensorInput {
        smoke: coerce_int(map.get("smoke"), "smoke")?,
        temperature: coerce_float(map.get("temperature"), "temperature")?,
        humidity: coerce_float(map.get("humidity"), "humidity")?,
    })
}

fn coerce_int(value: Option<&Value>, field: &str) -> Result<i64> {
    match value {
        None | Some(Value::Null) => Ok(0),
        Some(Value::Number(n)) => {
            if let Some(i) = n.as_i64() {
                Ok(i.max(0))
            } else if let Some(f) = n.as_f64() {
                Ok(f.max(0.0) as i64)
            } else {
                // u64 beyond i64 range
                Ok(i64::MAX)
            }
        }
        Some(Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map(|i| i.max(0))
            .or_else(|_| s.trim().parse::<f64>().map(|f| f.max(0.0) as i64))
            .map_err(|_| unparseable(field)),
        Some(_) => Err(unparseable(field)),
    }
}

fn coerce_float(value: Option<&Value>, field: &str) -> Result<f64> {
    let parsed = match value {
        None | Some(Value::Null) => 0.0,
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse::<f64>().map_err(|_| unparseable(field))?,
        Some(_) => return Err(unparseable(field)),
    };
    if parsed.is_finite() {
        Ok(parsed)
    } else {
        Err(unparseable(field))
    }
}

fn unparseable(field: &str) -> Error {
    Error::Validation(format!("field {field:?} is not a number"))
}
