//! C1: Resource Codec. Five named resources, each bound to one data channel
//! and one pair of parse/serialize functions (§3, §4.1).

pub mod codec;
pub mod media_entries;
pub mod media_stats;
pub mod participants;
pub mod session_control;
pub mod video_assignment;

use crate::error::CodecError;

/// A canonicalized update from any of the five resource channels, handed to
/// the observer via `on_resource_update` (§4.6.3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceUpdate {
    /// `session-control` push.
    SessionControl(session_control::SessionControlToClient),
    /// `media-entries` push.
    MediaEntries(media_entries::MediaEntriesToClient),
    /// `participants` push.
    Participants(participants::ParticipantsToClient),
    /// `video-assignment` push.
    VideoAssignment(video_assignment::VideoAssignmentToClient),
    /// `media-stats` push.
    MediaStats(media_stats::MediaStatsToClient),
}

/// A request the client may send on one of the bidirectional channels.
/// `MediaStats` is only ever constructed internally by C5 — the public
/// `send_request` surface rejects it (§4.5's forbidden path).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceRequest {
    /// `session-control` request (e.g. `leave`).
    SessionControl(session_control::SessionControlFromClient),
    /// `video-assignment` request.
    VideoAssignment(video_assignment::VideoAssignmentFromClient),
    /// `media-stats` upload, reserved to C5.
    MediaStats(media_stats::MediaStatsFromClient),
}

/// A resource codec's channel label, used in adapter construction and log
/// lines.
pub trait ResourceCodec: Send + Sync + 'static {
    /// The channel label this codec is bound to, e.g. `"media-entries"`.
    const CHANNEL: &'static str;

    /// The parsed server → client update type.
    type ToClient: Send + 'static;
    /// The client → server request type.
    type FromClient: Send + 'static;

    /// Parses a raw server push into its update type.
    fn parse(raw: &str) -> Result<Self::ToClient, CodecError>;

    /// Serializes a client request into its wire form.
    fn serialize(request: &Self::FromClient) -> Result<String, CodecError>;
}

/// Codec for `session-control`.
pub struct SessionControlCodec;
impl ResourceCodec for SessionControlCodec {
    const CHANNEL: &'static str = "session-control";
    type ToClient = session_control::SessionControlToClient;
    type FromClient = session_control::SessionControlFromClient;

    fn parse(raw: &str) -> Result<Self::ToClient, CodecError> {
        session_control::parse(raw)
    }

    fn serialize(request: &Self::FromClient) -> Result<String, CodecError> {
        session_control::serialize(request)
    }
}

/// Codec for `media-entries` (server → client only; `FromClient` is never
/// constructed).
pub struct MediaEntriesCodec;
impl ResourceCodec for MediaEntriesCodec {
    const CHANNEL: &'static str = "media-entries";
    type ToClient = media_entries::MediaEntriesToClient;
    type FromClient = std::convert::Infallible;

    fn parse(raw: &str) -> Result<Self::ToClient, CodecError> {
        media_entries::parse(raw)
    }

    fn serialize(request: &Self::FromClient) -> Result<String, CodecError> {
        match *request {}
    }
}

/// Codec for `participants` (server → client only).
pub struct ParticipantsCodec;
impl ResourceCodec for ParticipantsCodec {
    const CHANNEL: &'static str = "participants";
    type ToClient = participants::ParticipantsToClient;
    type FromClient = std::convert::Infallible;

    fn parse(raw: &str) -> Result<Self::ToClient, CodecError> {
        participants::parse(raw)
    }

    fn serialize(request: &Self::FromClient) -> Result<String, CodecError> {
        match *request {}
    }
}

/// Codec for `video-assignment`.
pub struct VideoAssignmentCodec;
impl ResourceCodec for VideoAssignmentCodec {
    const CHANNEL: &'static str = "video-assignment";
    type ToClient = video_assignment::VideoAssignmentToClient;
    type FromClient = video_assignment::VideoAssignmentFromClient;

    fn parse(raw: &str) -> Result<Self::ToClient, CodecError> {
        video_assignment::parse(raw)
    }

    fn serialize(request: &Self::FromClient) -> Result<String, CodecError> {
        video_assignment::serialize(request)
    }
}

/// Codec for `media-stats`.
pub struct MediaStatsCodec;
impl ResourceCodec for MediaStatsCodec {
    const CHANNEL: &'static str = "media-stats";
    type ToClient = media_stats::MediaStatsToClient;
    type FromClient = media_stats::MediaStatsFromClient;

    fn parse(raw: &str) -> Result<Self::ToClient, CodecError> {
        media_stats::parse(raw)
    }

    fn serialize(request: &Self::FromClient) -> Result<String, CodecError> {
        media_stats::serialize(request)
    }
}
