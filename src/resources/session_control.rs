//! `session-control` resource codec: session lifecycle, carries `leave`.

use super::codec::{optional_array, parse_object, parse_status, require_nonzero_request_id};
use crate::error::{CodecError, StatusCode};
use crate::types::ConnectionState;

const CHANNEL: &str = "session-control";

/// An optional response to a prior `session-control` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionControlResponse {
    /// The request id this responds to.
    pub request_id: i64,
    /// Status of the request.
    pub status: StatusCode,
    /// Status message.
    pub message: String,
    /// Present iff the request was a `leave`.
    pub leave_response: bool,
}

/// A snapshot of the session-status singleton resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionControlResourceSnapshot {
    /// Resource id (zero for the session-status singleton).
    pub id: i64,
    /// Current connection state.
    pub connection_state: ConnectionState,
}

/// Server → client envelope on `session-control`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionControlToClient {
    /// Response to a prior request, if any.
    pub response: Option<SessionControlResponse>,
    /// Resource snapshots.
    pub resources: Vec<SessionControlResourceSnapshot>,
}

/// Client → server envelope on `session-control`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionControlFromClient {
    /// Client-assigned, non-zero, session-unique request id.
    pub request_id: i64,
    /// True to send a `leave` request.
    pub leave: bool,
}

/// Parses a `session-control` server push.
pub fn parse(raw: &str) -> Result<SessionControlToClient, CodecError> {
    let obj = parse_object(CHANNEL, raw)?;

    let response = obj.get("response").map(|r| {
        let (status, message) = parse_status(r.get("status"));
        SessionControlResponse {
            request_id: r.get("requestId").and_then(|v| v.as_i64()).unwrap_or(0),
            status,
            message,
            leave_response: r.get("leaveResponse").is_some(),
        }
    });

    let resources = optional_array(CHANNEL, raw, &obj, "resources")?
        .into_iter()
        .flatten()
        .map(|item| {
            let connection_state = item
                .get("sessionStatus")
                .and_then(|s| s.get("connectionState"))
                .and_then(|v| v.as_str())
                .map(|s| match s {
                    "waiting" => ConnectionState::Waiting,
                    "joined" => ConnectionState::Joined,
                    "disconnected" => ConnectionState::Disconnected,
                    _ => ConnectionState::Unknown,
                })
                .unwrap_or_default();
            SessionControlResourceSnapshot {
                id: item.get("id").and_then(|v| v.as_i64()).unwrap_or(0),
                connection_state,
            }
        })
        .collect();

    Ok(SessionControlToClient {
        response,
        resources,
    })
}

/// Serializes a `session-control` client request.
pub fn serialize(req: &SessionControlFromClient) -> Result<String, CodecError> {
    require_nonzero_request_id(req.request_id)?;

    let mut request = serde_json::json!({ "requestId": req.request_id });
    if req.leave {
        request["leave"] = serde_json::json!({});
    }

    Ok(serde_json::json!({ "request": request }).to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_joined_session_status() {
        let update = parse(r#"{"resources":[{"sessionStatus":{"connectionState":"joined"}}]}"#)
            .unwrap();
        assert_eq!(update.resources.len(), 1);
        assert_eq!(
            update.resources[0].connection_state,
            ConnectionState::Joined
        );
    }

    #[test]
    fn missing_resources_parses_as_empty() {
        let update = parse("{}").unwrap();
        assert!(update.resources.is_empty());
        assert!(update.response.is_none());
    }

    #[test]
    fn resources_as_object_is_internal_error() {
        let err = parse(r#"{"resources": {}}"#).unwrap_err();
        assert!(matches!(err, CodecError::ExpectedArray { .. }));
    }

    #[test]
    fn serializes_leave_request() {
        let body = serialize(&SessionControlFromClient {
            request_id: 7,
            leave: true,
        })
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(value, serde_json::json!({"request":{"requestId":7,"leave":{}}}));
    }

    #[test]
    fn zero_request_id_is_rejected() {
        let err = serialize(&SessionControlFromClient {
            request_id: 0,
            leave: true,
        })
        .unwrap_err();
        assert!(matches!(err, CodecError::InvalidRequest(_)));
    }
}
