//! Shared parsing helpers for the five resource codecs (C1, §4.1).
//!
//! Parsers are permissive: unknown fields are ignored, missing optional
//! fields take documented defaults, and only the structural property that
//! `resources`/`canvases`/etc. are JSON arrays when present is enforced.

use crate::error::{CodecError, StatusCode};
use serde_json::Value;

/// Parses `raw` as a JSON object, producing the prescribed
/// `CodecError::MalformedJson` when it isn't valid JSON or isn't an object.
pub(crate) fn parse_object(channel: &'static str, raw: &str) -> Result<Value, CodecError> {
    let value: Value = serde_json::from_str(raw).map_err(|_| CodecError::MalformedJson {
        channel,
        raw: raw.to_string(),
    })?;
    if !value.is_object() {
        return Err(CodecError::MalformedJson {
            channel,
            raw: raw.to_string(),
        });
    }
    Ok(value)
}

/// Looks up `field` in `obj`, requiring it be a JSON array when present.
/// Returns an empty slice-equivalent (`None`) when the field is absent.
pub(crate) fn optional_array<'a>(
    channel: &'static str,
    raw: &str,
    obj: &'a Value,
    field: &'static str,
) -> Result<Option<&'a Vec<Value>>, CodecError> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(items)) => Ok(Some(items)),
        Some(_) => Err(CodecError::ExpectedArray {
            channel,
            field,
            raw: raw.to_string(),
        }),
    }
}

/// Parses a status object of the shape `{"code": <int-or-string>, "message":
/// <string>}`, supporting both the integer and symbolic wire
/// representations (§4.1).
pub(crate) fn parse_status(obj: Option<&Value>) -> (StatusCode, String) {
    let Some(obj) = obj else {
        return (StatusCode::Ok, String::new());
    };
    let code = match obj.get("code") {
        Some(Value::String(s)) => StatusCode::from_symbol(s),
        Some(Value::Number(n)) => StatusCode::from_i32(n.as_i64().unwrap_or(0) as i32),
        _ => StatusCode::Unknown,
    };
    let message = obj
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    (code, message)
}

/// Validates a client-assigned request id: non-zero per invariant 1 (§3).
pub(crate) fn require_nonzero_request_id(request_id: i64) -> Result<(), CodecError> {
    if request_id == 0 {
        return Err(CodecError::InvalidRequest("Request ID must be set".into()));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn non_object_top_level_is_malformed() {
        let err = parse_object("media-entries", "[1,2,3]").unwrap_err();
        assert!(matches!(err, CodecError::MalformedJson { .. }));
    }

    #[test]
    fn invalid_json_is_malformed() {
        let err = parse_object("media-entries", "{not json").unwrap_err();
        assert!(matches!(err, CodecError::MalformedJson { .. }));
    }

    #[test]
    fn missing_array_field_parses_as_none() {
        let obj = parse_object("media-entries", "{}").unwrap();
        let resources = optional_array("media-entries", "{}", &obj, "resources").unwrap();
        assert!(resources.is_none());
    }

    #[test]
    fn non_array_field_is_expected_array_error() {
        let raw = r#"{"resources": {"id": 1}}"#;
        let obj = parse_object("media-entries", raw).unwrap();
        let err = optional_array("media-entries", raw, &obj, "resources").unwrap_err();
        assert!(matches!(err, CodecError::ExpectedArray { .. }));
    }

    #[test]
    fn status_defaults_to_ok_when_absent() {
        let (code, message) = parse_status(None);
        assert_eq!(code, StatusCode::Ok);
        assert!(message.is_empty());
    }

    #[test]
    fn status_parses_symbolic_and_integer_forms() {
        let symbolic = serde_json::json!({"code": "PERMISSION_DENIED", "message": "nope"});
        assert_eq!(
            parse_status(Some(&symbolic)).0,
            StatusCode::PermissionDenied
        );

        let integer = serde_json::json!({"code": 7, "message": "nope"});
        assert_eq!(parse_status(Some(&integer)).0, StatusCode::PermissionDenied);
    }

    #[test]
    fn zero_request_id_is_rejected() {
        assert!(require_nonzero_request_id(0).is_err());
        assert!(require_nonzero_request_id(1).is_ok());
    }
}
