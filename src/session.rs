//! C6: Session Orchestrator. Binds C1-C5 behind the public API and the
//! state machine that drives them (§4.6).

use crate::data_channel::ResourceChannel;
use crate::error::{DisconnectStatus, SessionError};
use crate::media_track::{AudioDecoder, AudioTrackAdapter, VideoDecoder, VideoTrackAdapter};
use crate::resources::session_control::SessionControlFromClient;
use crate::resources::{
    MediaEntriesCodec, MediaStatsCodec, ParticipantsCodec, ResourceRequest, ResourceUpdate,
    SessionControlCodec, VideoAssignmentCodec,
};
use crate::stats::{StatsCollector, StatsSource};
use crate::types::{AudioFrame, ConnectionState, SessionConfig, SessionState, VideoFrame};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// The observer a caller supplies to [`Session::create`]. All callbacks may
/// be invoked from any internal thread and must return quickly (§6.1,
/// §5's "Observer callbacks").
pub trait ObserverInterface: Send + Sync {
    /// The session has fully joined the conference.
    fn on_joined(&self) {}
    /// The session has reached its terminal state. Fires exactly once
    /// (§4.6.2).
    fn on_disconnected(&self, status: DisconnectStatus);
    /// A canonicalized resource push from any of the five channels.
    fn on_resource_update(&self, update: ResourceUpdate) {
        let _ = update;
    }
    /// A decoded, attributed audio frame.
    fn on_audio_frame(&self, frame: AudioFrame) {
        let _ = frame;
    }
    /// A decoded, attributed video frame.
    fn on_video_frame(&self, frame: VideoFrame) {
        let _ = frame;
    }
}

struct Channels {
    session_control: Arc<ResourceChannel<SessionControlCodec>>,
    media_entries: Arc<ResourceChannel<MediaEntriesCodec>>,
    participants: Arc<ResourceChannel<ParticipantsCodec>>,
    video_assignment: Arc<ResourceChannel<VideoAssignmentCodec>>,
    media_stats: Arc<ResourceChannel<MediaStatsCodec>>,
}

/// A receive-only conference session. One instance covers exactly one
/// `connect`/disconnect lifecycle (§2, invariant: single-shot).
pub struct Session {
    state: Mutex<SessionState>,
    alive: Arc<AtomicBool>,
    observer: Arc<dyn ObserverInterface>,
    config: SessionConfig,
    transport: Mutex<Option<Arc<crate::transport::TransportAdapter>>>,
    channels: Mutex<Option<Channels>>,
    stats: Mutex<Option<Arc<StatsCollector>>>,
    audio_decoder: Option<Arc<dyn AudioDecoder>>,
    video_decoder: Option<Arc<dyn VideoDecoder>>,
}

impl Session {
    /// Builds a new session in `Ready`. Does not touch the network.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if `config.receiving_video_stream_count`
    /// exceeds [`SessionConfig::MAX_VIDEO_STREAMS`].
    pub fn create(
        config: SessionConfig,
        observer: Arc<dyn ObserverInterface>,
        audio_decoder: Option<Arc<dyn AudioDecoder>>,
        video_decoder: Option<Arc<dyn VideoDecoder>>,
    ) -> Result<Arc<Self>, SessionError> {
        if config.receiving_video_stream_count > SessionConfig::MAX_VIDEO_STREAMS {
            return Err(SessionError::InvalidArgument(format!(
                "receiving video stream count must be less than or equal to {}; got {}",
                SessionConfig::MAX_VIDEO_STREAMS,
                config.receiving_video_stream_count
            )));
        }

        Ok(Arc::new(Self {
            state: Mutex::new(SessionState::Ready),
            alive: Arc::new(AtomicBool::new(true)),
            observer,
            config,
            transport: Mutex::new(None),
            channels: Mutex::new(None),
            stats: Mutex::new(None),
            audio_decoder,
            video_decoder,
        }))
    }

    /// The session's current state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        *self.state.lock()
    }

    /// Begins the join handshake (§4.6.1). Returns synchronously once the
    /// handshake has been dispatched; success or failure of the handshake
    /// itself is reported via `on_joined`/`on_disconnected`.
    ///
    /// # Errors
    ///
    /// Returns `FailedPrecondition` if called outside `Ready`.
    pub async fn connect(
        self: &Arc<Self>,
        endpoint: String,
        conference_id: String,
        token: String,
    ) -> Result<(), SessionError> {
        {
            let mut state = self.state.lock();
            if *state != SessionState::Ready {
                return Err(SessionError::FailedPrecondition(format!(
                    "connect called in state {state}"
                )));
            }
            *state = SessionState::Connecting;
        }

        let this = Arc::clone(self);
        tokio::spawn(async move {
            this.run_connect(endpoint, conference_id, token).await;
        });

        Ok(())
    }

    async fn run_connect(self: &Arc<Self>, endpoint: String, conference_id: String, token: String) {
        let callbacks = self.build_transport_callbacks();

        let (transport, data_channels) =
            match crate::transport::TransportAdapter::create(self.config, callbacks).await {
                Ok(pair) => pair,
                Err(err) => {
                    self.fail(err).await;
                    return;
                }
            };
        let transport = Arc::new(transport);

        let channels = self.wire_channels(&data_channels);
        // Every data-channel callback is wired before Joining is entered
        // (§4.6.2's transition invariant).
        *self.channels.lock() = Some(channels);
        *self.transport.lock() = Some(Arc::clone(&transport));

        let stats_channel = self.channels.lock().as_ref().map(|c| Arc::clone(&c.media_stats));
        if let Some(stats_channel) = stats_channel {
            let collector = Arc::new(StatsCollector::new(
                Arc::clone(&transport) as Arc<dyn StatsSource>,
                stats_channel,
                Arc::clone(&self.alive),
            ));
            *self.stats.lock() = Some(collector);
        }

        // Joining is only entered once the HTTP round-trip has succeeded and
        // the remote description has been applied (§4.6.2): a join that
        // fails mid-flight must disconnect straight out of Connecting.
        match transport.join(&endpoint, &conference_id, &token).await {
            Ok(()) => *self.state.lock() = SessionState::Joining,
            Err(err) => self.disconnect(err.into()).await,
        }
    }

    fn build_transport_callbacks(self: &Arc<Self>) -> crate::transport::TransportCallbacks {
        let this_disconnect = Arc::clone(self);
        let this_track = Arc::clone(self);

        crate::transport::TransportCallbacks {
            on_disconnect: Box::new(move |status| {
                let this = Arc::clone(&this_disconnect);
                tokio::spawn(async move {
                    this.disconnect(status).await;
                });
            }),
            on_track_signaled: Box::new(move |signaled| {
                this_track.on_track_signaled(signaled);
            }),
        }
    }

    fn on_track_signaled(self: &Arc<Self>, signaled: crate::transport::SignaledTrack) {
        use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;

        if !self.alive.load(Ordering::Acquire) {
            return;
        }

        let kind = signaled.track.kind();
        let observer = Arc::clone(&self.observer);
        let alive = Arc::clone(&self.alive);

        match kind {
            RTPCodecType::Audio => {
                let Some(decoder) = self.audio_decoder.clone() else {
                    tracing::warn!("audio track signaled with no decoder configured");
                    return;
                };
                AudioTrackAdapter::spawn(signaled.track, signaled.receiver, decoder, alive, move |frame| {
                    observer.on_audio_frame(frame);
                });
            }
            RTPCodecType::Video => {
                let Some(decoder) = self.video_decoder.clone() else {
                    tracing::warn!("video track signaled with no decoder configured");
                    return;
                };
                VideoTrackAdapter::spawn(signaled.track, signaled.receiver, decoder, alive, move |frame| {
                    observer.on_video_frame(frame);
                });
            }
            RTPCodecType::Unspecified => {
                tracing::warn!("track signaled with unspecified codec type");
            }
        }
    }

    fn wire_channels(self: &Arc<Self>, data_channels: &crate::transport::ConferenceDataChannels) -> Channels {
        let session_control = Arc::new(ResourceChannel::<SessionControlCodec>::new(Arc::clone(
            &data_channels.session_control,
        )));
        let media_entries = Arc::new(ResourceChannel::<MediaEntriesCodec>::new(Arc::clone(
            &data_channels.media_entries,
        )));
        let participants = Arc::new(ResourceChannel::<ParticipantsCodec>::new(Arc::clone(
            &data_channels.participants,
        )));
        let video_assignment = Arc::new(ResourceChannel::<VideoAssignmentCodec>::new(Arc::clone(
            &data_channels.video_assignment,
        )));
        let media_stats = Arc::new(ResourceChannel::<MediaStatsCodec>::new(Arc::clone(
            &data_channels.media_stats,
        )));

        {
            let this = Arc::clone(self);
            session_control.set_callback(Box::new(move |update| {
                this.on_session_control_update(update);
            }));
        }
        {
            let observer = Arc::clone(&self.observer);
            let alive = Arc::clone(&self.alive);
            media_entries.set_callback(Box::new(move |update| {
                if alive.load(Ordering::Acquire) {
                    observer.on_resource_update(ResourceUpdate::MediaEntries(update));
                }
            }));
        }
        {
            let observer = Arc::clone(&self.observer);
            let alive = Arc::clone(&self.alive);
            participants.set_callback(Box::new(move |update| {
                if alive.load(Ordering::Acquire) {
                    observer.on_resource_update(ResourceUpdate::Participants(update));
                }
            }));
        }
        {
            let observer = Arc::clone(&self.observer);
            let alive = Arc::clone(&self.alive);
            video_assignment.set_callback(Box::new(move |update| {
                if alive.load(Ordering::Acquire) {
                    observer.on_resource_update(ResourceUpdate::VideoAssignment(update));
                }
            }));
        }
        {
            let this = Arc::clone(self);
            media_stats.set_callback(Box::new(move |update| {
                this.on_media_stats_update(update);
            }));
        }

        Channels {
            session_control,
            media_entries,
            participants,
            video_assignment,
            media_stats,
        }
    }

    fn on_session_control_update(self: &Arc<Self>, update: crate::resources::session_control::SessionControlToClient) {
        if !self.alive.load(Ordering::Acquire) {
            return;
        }

        let reached_joined = update
            .resources
            .iter()
            .any(|r| r.connection_state == ConnectionState::Joined);
        let reached_disconnected = update
            .resources
            .iter()
            .any(|r| r.connection_state == ConnectionState::Disconnected);

        self.observer
            .on_resource_update(ResourceUpdate::SessionControl(update));

        if reached_joined {
            let mut state = self.state.lock();
            if *state == SessionState::Joining {
                *state = SessionState::Joined;
                drop(state);
                self.observer.on_joined();
            }
        }

        if reached_disconnected {
            let this = Arc::clone(self);
            tokio::spawn(async move {
                this.disconnect(DisconnectStatus::ok()).await;
            });
        }
    }

    fn on_media_stats_update(self: &Arc<Self>, update: crate::resources::media_stats::MediaStatsToClient) {
        if !self.alive.load(Ordering::Acquire) {
            return;
        }

        if let Some(collector) = self.stats.lock().clone() {
            for resource in &update.resources {
                if let Some(config) = &resource.configuration {
                    collector.configure(config.clone());
                }
            }
        }

        self.observer.on_resource_update(ResourceUpdate::MediaStats(update));
    }

    /// Dispatches `request` to the channel matching its variant (§4.6.1).
    ///
    /// # Errors
    ///
    /// Returns `Internal` if `request` is a `media-stats` request (§4.5's
    /// forbidden path — reserved to the internal stats collector);
    /// otherwise propagates the underlying channel's `InvalidArgument` /
    /// `FailedPrecondition`.
    pub async fn send_request(&self, request: ResourceRequest) -> Result<(), SessionError> {
        if matches!(request, ResourceRequest::MediaStats(_)) {
            return Err(SessionError::Internal(
                "media-stats requests are reserved to the internal stats collector".into(),
            ));
        }

        if *self.state.lock() != SessionState::Joined {
            tracing::warn!(state = %self.state(), "send_request called outside Joined");
        }

        let channels = self.channels.lock().as_ref().map(|c| {
            (
                Arc::clone(&c.session_control),
                Arc::clone(&c.video_assignment),
            )
        });
        let Some((session_control, video_assignment)) = channels else {
            return Err(SessionError::FailedPrecondition(
                "session has no active channels".into(),
            ));
        };

        match request {
            ResourceRequest::SessionControl(req) => session_control.send_request(&req).await,
            ResourceRequest::VideoAssignment(req) => video_assignment.send_request(&req).await,
            ResourceRequest::MediaStats(_) => Err(SessionError::Internal(
                "media-stats requests are reserved to the internal stats collector".into(),
            )),
        }
    }

    /// Leaves the conference (§4.6.1). In `Joined`, sends a graceful
    /// `session-control` leave request and waits for the server to push
    /// `Disconnected`. In any other live state, synthesizes an immediate
    /// graceful disconnect without a network round-trip. In `Disconnected`,
    /// returns `Internal`.
    ///
    /// # Errors
    ///
    /// Returns `Internal` if the session is already disconnected.
    pub async fn leave(self: &Arc<Self>, request_id: i64) -> Result<(), SessionError> {
        let state = *self.state.lock();

        if state == SessionState::Disconnected {
            return Err(SessionError::Internal("session is already disconnected".into()));
        }

        if state == SessionState::Joined {
            let channel = self.channels.lock().as_ref().map(|c| Arc::clone(&c.session_control));
            if let Some(channel) = channel {
                channel
                    .send_request(&SessionControlFromClient {
                        request_id,
                        leave: true,
                    })
                    .await?;
            }
            return Ok(());
        }

        // Not yet joined: the server will never see this request, so the
        // orchestrator synthesizes the graceful disconnect itself (§4.6.4).
        self.disconnect(DisconnectStatus::ok()).await;
        Ok(())
    }

    async fn fail(self: &Arc<Self>, err: SessionError) {
        self.disconnect(DisconnectStatus::failed(err.status_code(), err.to_string()))
            .await;
    }

    async fn disconnect(self: &Arc<Self>, status: DisconnectStatus) {
        // Idempotent: only the first caller to flip `alive` performs the
        // transition and fires the callback (§4.6.2).
        if !self.alive.swap(false, Ordering::AcqRel) {
            return;
        }

        *self.state.lock() = SessionState::Disconnected;

        if let Some(collector) = self.stats.lock().take() {
            collector.cancel();
        }

        if let Some(transport) = self.transport.lock().take() {
            transport.close().await;
        }

        self.observer.on_disconnected(status);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    struct RecordingObserver;
    impl ObserverInterface for RecordingObserver {
        fn on_disconnected(&self, _status: DisconnectStatus) {}
    }

    #[test]
    fn create_rejects_too_many_video_streams() {
        let config = SessionConfig {
            receiving_video_stream_count: 4,
            enable_audio_streams: true,
        };
        let err = Session::create(config, Arc::new(RecordingObserver), None, None).unwrap_err();
        assert!(matches!(err, SessionError::InvalidArgument(_)));
    }

    #[test]
    fn new_session_starts_in_ready() {
        let session = Session::create(SessionConfig::default(), Arc::new(RecordingObserver), None, None).unwrap();
        assert_eq!(session.state(), SessionState::Ready);
    }
}
