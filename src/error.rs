//! Error and status types shared across every component.
//!
//! `SessionError` is the public-API error type (§7 of the spec: four kinds
//! — `InvalidArgument`, `FailedPrecondition`, `DeadlineExceeded`,
//! `Internal`). `StatusCode` is the larger, gRPC-shaped status space used on
//! the wire and reported to `on_disconnected`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Symbolic status codes used by the conference service, exhaustive over
/// both the integer and string wire representations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusCode {
    /// Not an error.
    Ok,
    /// The operation was cancelled.
    Cancelled,
    /// Unknown error; catch-all for unrecognized symbols or codes.
    Unknown,
    /// Caller supplied an invalid argument.
    InvalidArgument,
    /// The operation expired before completing.
    DeadlineExceeded,
    /// Some requested entity was not found.
    NotFound,
    /// The entity a caller attempted to create already exists.
    AlreadyExists,
    /// The caller does not have permission.
    PermissionDenied,
    /// The request does not have valid authentication credentials.
    Unauthenticated,
    /// Some resource has been exhausted.
    ResourceExhausted,
    /// The operation was rejected because the system is not in a state
    /// required for the operation's execution.
    FailedPrecondition,
    /// The operation was aborted.
    Aborted,
    /// The operation was attempted past the valid range.
    OutOfRange,
    /// The operation is not implemented or not supported.
    Unimplemented,
    /// Internal error.
    Internal,
    /// The service is currently unavailable.
    Unavailable,
    /// Unrecoverable data loss or corruption.
    DataLoss,
}

impl StatusCode {
    /// Maps the symbolic strings the server sends on some channels.
    /// Unknown symbols map to `Unknown`, never an error.
    #[must_use]
    pub fn from_symbol(symbol: &str) -> Self {
        match symbol {
            "OK" => Self::Ok,
            "CANCELLED" => Self::Cancelled,
            "INVALID_ARGUMENT" => Self::InvalidArgument,
            "DEADLINE_EXCEEDED" => Self::DeadlineExceeded,
            "NOT_FOUND" => Self::NotFound,
            "ALREADY_EXISTS" => Self::AlreadyExists,
            "PERMISSION_DENIED" => Self::PermissionDenied,
            "UNAUTHENTICATED" => Self::Unauthenticated,
            "RESOURCE_EXHAUSTED" => Self::ResourceExhausted,
            "FAILED_PRECONDITION" => Self::FailedPrecondition,
            "ABORTED" => Self::Aborted,
            "OUT_OF_RANGE" => Self::OutOfRange,
            "UNIMPLEMENTED" => Self::Unimplemented,
            "INTERNAL" => Self::Internal,
            "UNAVAILABLE" => Self::Unavailable,
            "DATA_LOSS" => Self::DataLoss,
            _ => Self::Unknown,
        }
    }

    /// Maps the integer codes the server sends on other channels. This
    /// follows the same ordinal assignment as the canonical gRPC status
    /// space; out-of-range integers map to `Unknown`.
    #[must_use]
    pub fn from_i32(code: i32) -> Self {
        match code {
            0 => Self::Ok,
            1 => Self::Cancelled,
            2 => Self::Unknown,
            3 => Self::InvalidArgument,
            4 => Self::DeadlineExceeded,
            5 => Self::NotFound,
            6 => Self::AlreadyExists,
            7 => Self::PermissionDenied,
            16 => Self::Unauthenticated,
            8 => Self::ResourceExhausted,
            9 => Self::FailedPrecondition,
            10 => Self::Aborted,
            11 => Self::OutOfRange,
            12 => Self::Unimplemented,
            13 => Self::Internal,
            14 => Self::Unavailable,
            15 => Self::DataLoss,
            _ => Self::Unknown,
        }
    }
}

/// The status delivered to `on_disconnected`: exactly one of these fires per
/// session, per invariant 5 (spec §3) and §4.6.4.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisconnectStatus {
    /// The status code. `Ok` iff the disconnect was graceful.
    pub code: StatusCode,
    /// A human-readable cause, preserved from the underlying error where one
    /// exists.
    pub message: String,
}

impl DisconnectStatus {
    /// Builds the graceful `Ok` status used for server- or caller-initiated
    /// clean shutdown.
    #[must_use]
    pub fn ok() -> Self {
        Self {
            code: StatusCode::Ok,
            message: String::new(),
        }
    }

    /// Builds a non-`Ok` status carrying `code` and `message`.
    #[must_use]
    pub fn failed(code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// True iff this status represents a graceful disconnect.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.code == StatusCode::Ok
    }
}

/// A join-handshake failure that preserves the server's own status code and
/// message, rather than flattening every cause into `Internal` (§4.3 step 3:
/// "maps to a status of the matching kind"; §8 scenario 3). Used internally
/// between the transport adapter's `join` and the orchestrator's disconnect
/// path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinError {
    /// The status to report to `on_disconnected`.
    pub status: StatusCode,
    /// The cause, preserved verbatim from the server where one was given.
    pub message: String,
}

impl JoinError {
    /// Builds a `JoinError` carrying `status` and `message` directly, e.g.
    /// from a server's `{"error": {"status": ..., "message": ...}}`
    /// envelope.
    #[must_use]
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl From<SessionError> for JoinError {
    fn from(value: SessionError) -> Self {
        Self {
            status: value.status_code(),
            message: value.to_string(),
        }
    }
}

impl From<JoinError> for DisconnectStatus {
    fn from(value: JoinError) -> Self {
        Self {
            code: value.status,
            message: value.message,
        }
    }
}

/// Public-API error kinds (§7). Every fallible operation on `Session`
/// returns this type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Caller contract violated: zero request id, missing canvas id, wrong
    /// request variant for the channel, more than 3 video streams
    /// requested, or an invalid endpoint URL.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A channel is not open, or the operation is not valid in the current
    /// session state.
    #[error("failed precondition: {0}")]
    FailedPrecondition(String),

    /// Local or remote SDP did not complete within the 3-second budget.
    #[error("deadline exceeded: {0}")]
    DeadlineExceeded(String),

    /// Signaling HTTP failed, the server returned an error envelope, a
    /// parse failed in a context that must surface synchronously, the peer
    /// connection failed, a caller attempted to send a `media-stats`
    /// request directly, or `leave` was called while already disconnected.
    #[error("internal: {0}")]
    Internal(String),
}

impl SessionError {
    /// The `StatusCode` this error kind corresponds to when it causes a
    /// session disconnect.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidArgument(_) => StatusCode::InvalidArgument,
            Self::FailedPrecondition(_) => StatusCode::FailedPrecondition,
            Self::DeadlineExceeded(_) => StatusCode::DeadlineExceeded,
            Self::Internal(_) => StatusCode::Internal,
        }
    }
}

/// Errors raised while parsing or serializing a resource channel's JSON
/// (C1). Never disconnects a session on its own; callers log and drop.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The payload was not valid JSON, or violated a required structural
    /// property (e.g. `resources` present but not an array). Carries the
    /// raw offending payload for diagnosis.
    #[error("Invalid {channel} json format: {raw}")]
    MalformedJson {
        /// The channel label this codec is bound to.
        channel: &'static str,
        /// The raw payload that failed to parse.
        raw: String,
    },

    /// A field that is documented to be a JSON array was a different JSON
    /// type.
    #[error("Invalid {channel} json format. Expected {field} field to be an array: {raw}")]
    ExpectedArray {
        /// The channel label this codec is bound to.
        channel: &'static str,
        /// The offending field's name.
        field: &'static str,
        /// The raw payload that failed to parse.
        raw: String,
    },

    /// A client request failed the serialization contract (§4.1): zero
    /// request id, zero canvas id, or a request variant that does not
    /// match the channel.
    #[error("{0}")]
    InvalidRequest(String),
}

impl From<CodecError> for SessionError {
    fn from(value: CodecError) -> Self {
        match value {
            CodecError::InvalidRequest(msg) => Self::InvalidArgument(msg),
            other => Self::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn symbolic_status_mapping_is_exhaustive() {
        assert_eq!(StatusCode::from_symbol("OK"), StatusCode::Ok);
        assert_eq!(
            StatusCode::from_symbol("PERMISSION_DENIED"),
            StatusCode::PermissionDenied
        );
        assert_eq!(StatusCode::from_symbol("DATA_LOSS"), StatusCode::DataLoss);
        assert_eq!(StatusCode::from_symbol("bogus"), StatusCode::Unknown);
    }

    #[test]
    fn integer_status_mapping_is_exhaustive() {
        assert_eq!(StatusCode::from_i32(0), StatusCode::Ok);
        assert_eq!(StatusCode::from_i32(7), StatusCode::PermissionDenied);
        assert_eq!(StatusCode::from_i32(999), StatusCode::Unknown);
    }

    #[test]
    fn disconnect_status_ok_helper() {
        let status = DisconnectStatus::ok();
        assert!(status.is_ok());
    }

    #[test]
    fn codec_error_maps_to_invalid_argument_only_for_request_errors() {
        let err: SessionError = CodecError::InvalidRequest("Request ID must be set".into()).into();
        assert_eq!(
            err,
            SessionError::InvalidArgument("Request ID must be set".into())
        );

        let err: SessionError = CodecError::MalformedJson {
            channel: "media-entries",
            raw: "not json".into(),
        }
        .into();
        assert!(matches!(err, SessionError::Internal(_)));
    }

    #[test]
    fn join_error_preserves_server_status_and_message_into_disconnect_status() {
        let join_err = JoinError::new(StatusCode::PermissionDenied, "nope");
        let status: DisconnectStatus = join_err.into();
        assert_eq!(status.code, StatusCode::PermissionDenied);
        assert_eq!(status.message, "nope");
    }

    #[test]
    fn join_error_from_session_error_preserves_kind_and_text() {
        let join_err: JoinError = SessionError::DeadlineExceeded("timed out".into()).into();
        assert_eq!(join_err.status, StatusCode::DeadlineExceeded);
        assert_eq!(join_err.message, "deadline exceeded: timed out");
    }
}
