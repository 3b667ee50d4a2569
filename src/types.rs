//! Core data-model types shared across the resource channels (§3).

use serde::{Deserialize, Serialize};

/// The session's finite-state machine states (§3, §4.6.2). `Disconnected`
/// is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No connection attempt has been made yet.
    Ready,
    /// `connect()` has been called; the HTTP join exchange is in flight.
    Connecting,
    /// The join exchange completed; waiting for `session-control` to push
    /// `connection_state = Joined`.
    Joining,
    /// The session is fully joined.
    Joined,
    /// Terminal. No further transitions, callbacks, or queued requests.
    Disconnected,
}

impl SessionState {
    /// A short machine-readable name, used in log lines and error messages.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ready => "Ready",
            Self::Connecting => "Connecting",
            Self::Joining => "Joining",
            Self::Joined => "Joined",
            Self::Disconnected => "Disconnected",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `connection_state` carried by the `session-control` singleton resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// Not yet known.
    #[default]
    Unknown,
    /// Admitted pending; the session may never observe this if admission is
    /// fast.
    Waiting,
    /// Session has fully joined the conference.
    Joined,
    /// Session is not connected.
    Disconnected,
}

/// Dimensions requested for a video canvas. Defaults match the server's
/// documented default of 640×480.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasDimensions {
    /// Vertical space, in pixels.
    pub height: i32,
    /// Horizontal space, in pixels.
    pub width: i32,
}

impl Default for CanvasDimensions {
    fn default() -> Self {
        Self {
            height: 480,
            width: 640,
        }
    }
}

/// How the server should assign a video feed to a canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentProtocol {
    /// The server picks who fills the canvas.
    Relevant,
    /// The client picks explicitly (by media entry).
    Direct,
}

/// A client-declared receive slot for a video stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoCanvas {
    /// Identifier, unique within the containing `LayoutModel`. Must be
    /// non-zero.
    pub id: i32,
    /// Requested pixel dimensions.
    pub dimensions: CanvasDimensions,
    /// Assignment protocol for this canvas.
    pub assignment_protocol: AssignmentProtocol,
}

/// A client-assigned label plus an ordered set of canvases: the client's
/// desired video configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutModel {
    /// Client-chosen identifier, referenced in subsequent server pushes.
    pub label: String,
    /// The canvases that videos are assigned to.
    pub canvases: Vec<VideoCanvas>,
}

/// Maximum resolution the client wants to receive for any video feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoResolution {
    /// Height in pixels.
    pub height: i32,
    /// Width in pixels.
    pub width: i32,
    /// Frame rate in frames per second.
    pub frame_rate: i32,
}

impl Default for VideoResolution {
    fn default() -> Self {
        Self {
            height: 480,
            width: 640,
            frame_rate: 30,
        }
    }
}

/// One canvas's server-assigned stream, within a pushed `VideoAssignment`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoCanvasAssignment {
    /// The canvas this assignment targets.
    pub canvas_id: i32,
    /// The video SSRC assigned, or zero if no video is assigned.
    pub ssrc: u32,
    /// The `MediaEntry.id` of the media being shown.
    pub media_entry_id: i32,
}

/// Server-pushed assignment of SSRCs to the client's declared canvases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoAssignment {
    /// The `LayoutModel.label` this assignment is based on.
    pub label: String,
    /// Individual canvas assignments, unordered.
    pub canvases: Vec<VideoCanvasAssignment>,
}

/// A participant's discriminated identity metadata (§6.3 supplement).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParticipantIdentity {
    /// A signed-in Google account.
    SignedInUser {
        /// Display name shown to other participants.
        display_name: String,
        /// Opaque user identifier.
        user_id: String,
    },
    /// An anonymous participant.
    AnonymousUser {
        /// Display name shown to other participants.
        display_name: String,
    },
    /// A participant dialed in by phone.
    PhoneUser {
        /// Display name shown to other participants.
        display_name: String,
    },
}

/// A producing participant's live-stream record (§3).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MediaEntry {
    /// Correlates multiple entries from the same participant (e.g. joined
    /// from two devices).
    pub participant_id: i32,
    /// CSRC of any audio stream this participant contributes; zero if none.
    pub audio_csrc: u32,
    /// CSRCs of any video streams this participant contributes.
    pub video_csrcs: Vec<u32>,
    /// True if this entry is currently presenting.
    pub presenter: bool,
    /// True if this entry is a screenshare.
    pub screenshare: bool,
    /// True if the audio stream is muted.
    pub audio_muted: bool,
    /// True if the video stream is muted.
    pub video_muted: bool,
}

/// Server-provided statistics upload policy (§3).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatsConfig {
    /// Upload period in seconds; zero disables collection.
    pub upload_interval_seconds: i32,
    /// Mapping from statistics section name to the set of permitted field
    /// names within it.
    pub allowlist: std::collections::HashMap<String, std::collections::HashSet<String>>,
}

/// A decoded audio frame delivered to the observer (§4.4, §6.1).
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Interleaved 16-bit PCM samples, `channels * frames` long.
    pub pcm16: Vec<i16>,
    /// Bits per sample; always 16 for frames that reach the observer.
    pub bits_per_sample: u8,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Number of interleaved channels.
    pub channels: usize,
    /// Number of frames (samples per channel).
    pub frames: usize,
    /// Contributing source: which participant produced this frame.
    pub contributing_source: u32,
    /// Synchronization source: which stream slot this frame arrived on.
    pub synchronization_source: u32,
}

/// A decoded video frame delivered to the observer (§4.4, §6.1).
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// Opaque decoded video payload, owned by the caller's renderer.
    pub frame: Vec<u8>,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Contributing source: which participant produced this frame. May
    /// change across frames on the same SSRC as the server rotates
    /// relevance.
    pub contributing_source: u32,
    /// Synchronization source: which stream slot this frame arrived on.
    pub synchronization_source: u32,
}

/// Reserved CSRC value denoting the synthetic "loudest speaker" track; it
/// never represents a real participant (invariant 4, §3).
pub const CSRC_LOUDEST_SPEAKER: u32 = 42;

/// Configuration fixed at session construction (§6.1, §6.4). Slot counts
/// are never renegotiated after `Session::create`.
#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    /// Number of video streams to receive: 0..=3.
    pub receiving_video_stream_count: u32,
    /// Whether to negotiate the 3 fixed audio receive slots.
    pub enable_audio_streams: bool,
}

impl SessionConfig {
    /// Maximum number of video streams the server will negotiate.
    pub const MAX_VIDEO_STREAMS: u32 = 3;

    /// Exactly 3 audio receive slots are used whenever audio is enabled.
    pub const AUDIO_STREAM_COUNT: u32 = 3;
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            receiving_video_stream_count: 0,
            enable_audio_streams: true,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn canvas_dimensions_default_matches_server_default() {
        assert_eq!(
            CanvasDimensions::default(),
            CanvasDimensions {
                height: 480,
                width: 640
            }
        );
    }

    #[test]
    fn video_resolution_default_is_640x480_at_30fps() {
        let res = VideoResolution::default();
        assert_eq!(res.width, 640);
        assert_eq!(res.height, 480);
        assert_eq!(res.frame_rate, 30);
    }

    #[test]
    fn session_state_display() {
        assert_eq!(SessionState::Joined.to_string(), "Joined");
    }
}
