//! Conference session core: a receive-only conference client.
//!
//! Joins a single conference over an HTTP-negotiated WebRTC peer
//! connection, multiplexes the five JSON data channels that carry
//! conference resources, demultiplexes incoming RTP by contributing source
//! (participant) and synchronization source (stream slot), and uploads
//! filtered statistics on a server-driven schedule.
//!
//! # Examples
//!
//! ```rust,no_run
//! use conference_session_core::{DisconnectStatus, ObserverInterface, Session, SessionConfig};
//! use std::sync::Arc;
//!
//! struct PrintingObserver;
//! impl ObserverInterface for PrintingObserver {
//!     fn on_joined(&self) {
//!         println!("joined");
//!     }
//!     fn on_disconnected(&self, status: DisconnectStatus) {
//!         println!("disconnected: {status:?}");
//!     }
//! }
//!
//! # async fn example() -> Result<(), conference_session_core::SessionError> {
//! let session = Session::create(SessionConfig::default(), Arc::new(PrintingObserver), None, None)?;
//! session
//!     .connect("https://example.invalid".into(), "space-1".into(), "token".into())
//!     .await?;
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::panic)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

/// Error and status types shared across every component.
pub mod error;

/// Core data-model types shared across the resource channels.
pub mod types;

/// Resource codecs: parsing and serializing the five data-channel wire
/// formats (C1).
pub mod resources;

/// Data channel adapter binding one resource codec to one WebRTC data
/// channel (C2).
pub mod data_channel;

/// Media track adapter: RTP CSRC/SSRC demultiplexing and frame attribution
/// (C4).
pub mod media_track;

/// Transport adapter: peer-connection lifecycle and HTTP join signaling
/// (C3).
pub mod transport;

/// Stats collector: server-configured, allowlist-filtered stats upload
/// (C5).
pub mod stats;

/// Session orchestrator: the public API and the connection state machine
/// (C6).
pub mod session;

pub use data_channel::{ResourceChannel, UpdateCallback};
pub use error::{CodecError, DisconnectStatus, SessionError, StatusCode};
pub use media_track::{AudioDecoder, DecodedAudio, DecodedVideo, VideoDecoder};
pub use resources::{ResourceCodec, ResourceRequest, ResourceUpdate};
pub use session::{ObserverInterface, Session};
pub use stats::{RawStatsSection, StatsCollector, StatsSource};
pub use transport::{ConferenceDataChannels, SignaledTrack, TransportAdapter, TransportCallbacks};
pub use types::*;

/// Convenient re-exports for consumers of this crate.
pub mod prelude {
    pub use crate::data_channel::ResourceChannel;
    pub use crate::error::{DisconnectStatus, SessionError, StatusCode};
    pub use crate::resources::{ResourceRequest, ResourceUpdate};
    pub use crate::session::{ObserverInterface, Session};
    pub use crate::types::{AudioFrame, SessionConfig, SessionState, VideoFrame};
}
