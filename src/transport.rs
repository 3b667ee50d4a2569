//! C3: Transport Adapter. Owns the peer-connection object, performs the
//! one-shot HTTPS signaling, exposes a disconnect fan-out, and relays
//! remote-track-added events to the orchestrator (§4.3).

use crate::error::{DisconnectStatus, JoinError, SessionError, StatusCode};
use crate::types::SessionConfig;
use std::sync::Arc;
use std::time::Duration;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::APIBuilder;
use webrtc::data_channel::data_channel_init::RTCDataChannelInit;
use webrtc::data_channel::RTCDataChannel;
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::rtp_transceiver::rtp_receiver::RTCRtpReceiver;
use webrtc::rtp_transceiver::rtp_transceiver_direction::RTCRtpTransceiverDirection;
use webrtc::rtp_transceiver::RTCRtpTransceiverInit;
use webrtc::rtp_transceiver::RTCRtpTransceiver;
use webrtc::track::track_remote::TrackRemote;

/// The five data-channel labels, in the order the join protocol creates
/// them.
pub const CHANNEL_LABELS: [&str; 5] = [
    "media-entries",
    "media-stats",
    "participants",
    "session-control",
    "video-assignment",
];

/// SDP completion budget (§5): exceeding it is a disconnect-causing
/// `DeadlineExceeded`.
const SDP_TIMEOUT: Duration = Duration::from_secs(3);

/// The five data channels created during the join handshake.
pub struct ConferenceDataChannels {
    /// `media-entries` channel.
    pub media_entries: Arc<RTCDataChannel>,
    /// `media-stats` channel.
    pub media_stats: Arc<RTCDataChannel>,
    /// `participants` channel.
    pub participants: Arc<RTCDataChannel>,
    /// `session-control` channel.
    pub session_control: Arc<RTCDataChannel>,
    /// `video-assignment` channel.
    pub video_assignment: Arc<RTCDataChannel>,
}

/// A remote track plus its receiver, handed to the orchestrator's
/// `track_signaled` hook (§4.3's "Track signaling").
pub struct SignaledTrack {
    /// The remote track.
    pub track: Arc<TrackRemote>,
    /// The track's RTP receiver.
    pub receiver: Arc<RTCRtpReceiver>,
    /// The negotiated transceiver.
    pub transceiver: Arc<RTCRtpTransceiver>,
}

/// Callbacks the orchestrator supplies before the join begins, so every
/// hook is wired before `Joining` is entered (§4.6.2's transition
/// invariant).
pub struct TransportCallbacks {
    /// Fired when the peer connection enters a terminal state (closed,
    /// failed, disconnected). Fan-out is idempotent; the orchestrator folds
    /// repeat firings into a no-op.
    pub on_disconnect: Box<dyn Fn(DisconnectStatus) + Send + Sync>,
    /// Fired once per negotiated audio/video slot when the remote track is
    /// signaled.
    pub on_track_signaled: Box<dyn Fn(SignaledTrack) + Send + Sync>,
}

/// Owns the peer connection and performs the join handshake.
pub struct TransportAdapter {
    peer_connection: Arc<RTCPeerConnection>,
}

impl TransportAdapter {
    /// Builds the peer connection, negotiates transceivers and data
    /// channels, wires `callbacks`, and returns the adapter plus the
    /// created channels. Does not yet perform signaling — call
    /// [`TransportAdapter::join`] next.
    ///
    /// # Errors
    ///
    /// Returns `Internal` if the peer connection or any transceiver/data
    /// channel fails to create.
    pub async fn create(
        config: SessionConfig,
        callbacks: TransportCallbacks,
    ) -> Result<(Self, ConferenceDataChannels), SessionError> {
        if config.receiving_video_stream_count > SessionConfig::MAX_VIDEO_STREAMS {
            return Err(SessionError::InvalidArgument(format!(
                "receiving video stream count must be less than or equal to {}; got {}",
                SessionConfig::MAX_VIDEO_STREAMS,
                config.receiving_video_stream_count
            )));
        }

        let mut media_engine = MediaEngine::default();
        media_engine
            .register_default_codecs()
            .map_err(|err| SessionError::Internal(format!("failed to register codecs: {err}")))?;

        let mut registry = Registry::new();
        registry = register_default_interceptors(registry, &mut media_engine)
            .map_err(|err| SessionError::Internal(format!("failed to register interceptors: {err}")))?;

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(registry)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers: vec![RTCIceServer {
                urls: vec!["stun:stun.l.google.com:19302".to_owned()],
                ..Default::default()
            }],
            ..Default::default()
        };

        let peer_connection = Arc::new(
            api.new_peer_connection(rtc_config)
                .await
                .map_err(|err| SessionError::Internal(format!("failed to create peer connection: {err}")))?,
        );

        Self::configure_transceivers(&peer_connection, config).await?;
        let channels = Self::create_data_channels(&peer_connection).await?;
        Self::wire_callbacks(&peer_connection, callbacks);

        Ok((Self { peer_connection }, channels))
    }

    async fn configure_transceivers(
        peer_connection: &RTCPeerConnection,
        config: SessionConfig,
    ) -> Result<(), SessionError> {
        use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;

        let recv_only = RTCRtpTransceiverInit {
            direction: RTCRtpTransceiverDirection::Recvonly,
            send_encodings: vec![],
        };

        if config.enable_audio_streams {
            for _ in 0..SessionConfig::AUDIO_STREAM_COUNT {
                peer_connection
                    .add_transceiver_from_kind(RTPCodecType::Audio, Some(recv_only.clone()))
                    .await
                    .map_err(|err| SessionError::Internal(format!("failed to add audio transceiver: {err}")))?;
            }
        }

        for _ in 0..config.receiving_video_stream_count {
            peer_connection
                .add_transceiver_from_kind(RTPCodecType::Video, Some(recv_only.clone()))
                .await
                .map_err(|err| SessionError::Internal(format!("failed to add video transceiver: {err}")))?;
        }

        Ok(())
    }

    async fn create_data_channels(
        peer_connection: &RTCPeerConnection,
    ) -> Result<ConferenceDataChannels, SessionError> {
        let init = RTCDataChannelInit {
            ordered: Some(true),
            ..Default::default()
        };

        let mut created = Vec::with_capacity(CHANNEL_LABELS.len());
        for label in CHANNEL_LABELS {
            let channel = peer_connection
                .create_data_channel(label, Some(init.clone()))
                .await
                .map_err(|err| SessionError::Internal(format!("failed to create {label} data channel: {err}")))?;
            created.push(channel);
        }

        let mut iter = created.into_iter();
        Ok(ConferenceDataChannels {
            media_entries: iter.next().expect("5 channels created"),
            media_stats: iter.next().expect("5 channels created"),
            participants: iter.next().expect("5 channels created"),
            session_control: iter.next().expect("5 channels created"),
            video_assignment: iter.next().expect("5 channels created"),
        })
    }

    fn wire_callbacks(peer_connection: &Arc<RTCPeerConnection>, callbacks: TransportCallbacks) {
        let on_disconnect = Arc::new(callbacks.on_disconnect);
        let disconnect_for_state = Arc::clone(&on_disconnect);
        peer_connection.on_peer_connection_state_change(Box::new(move |state| {
            let on_disconnect = Arc::clone(&disconnect_for_state);
            Box::pin(async move {
                match state {
                    RTCPeerConnectionState::Closed
                    | RTCPeerConnectionState::Failed
                    | RTCPeerConnectionState::Disconnected => {
                        tracing::info!(?state, "peer connection entered terminal state");
                        on_disconnect(DisconnectStatus::failed(
                            StatusCode::Internal,
                            format!("peer connection state: {state:?}"),
                        ));
                    }
                    _ => {}
                }
            })
        }));

        let on_track_signaled = Arc::new(callbacks.on_track_signaled);
        peer_connection.on_track(Box::new(move |track, receiver, transceiver| {
            let on_track_signaled = Arc::clone(&on_track_signaled);
            Box::pin(async move {
                on_track_signaled(SignaledTrack {
                    track,
                    receiver,
                    transceiver,
                });
            })
        }));
    }

    /// Performs the join protocol (§4.3): generates and sets the local
    /// offer, POSTs it to `<join_endpoint>/spaces/<conference_id>
    /// :connectActiveConference`, and applies the returned answer as the
    /// remote description. The HTTP response must complete and the remote
    /// description must be applied before this function returns `Ok`.
    ///
    /// # Errors
    ///
    /// Returns a `DeadlineExceeded`-status error if either SDP operation
    /// exceeds 3 seconds, `InvalidArgument` for an empty endpoint, the
    /// server's own status/message when it rejects the join with an error
    /// envelope, and `Internal` for any other signaling or peer-connection
    /// failure.
    pub async fn join(
        &self,
        endpoint: &str,
        conference_id: &str,
        token: &str,
    ) -> Result<(), JoinError> {
        if endpoint.is_empty() {
            return Err(SessionError::InvalidArgument("endpoint must not be empty".into()).into());
        }
        let endpoint = endpoint.trim_end_matches('/');

        let offer = self
            .peer_connection
            .create_offer(None)
            .await
            .map_err(|err| SessionError::Internal(format!("failed to create offer: {err}")))?;

        tokio::time::timeout(SDP_TIMEOUT, self.peer_connection.set_local_description(offer.clone()))
            .await
            .map_err(|_| SessionError::DeadlineExceeded("set_local_description timed out".into()))?
            .map_err(|err| SessionError::Internal(format!("failed to set local description: {err}")))?;

        let answer_sdp = Self::post_join(endpoint, conference_id, token, &offer.sdp).await?;

        let answer = RTCSessionDescription::answer(answer_sdp)
            .map_err(|err| SessionError::Internal(format!("invalid answer SDP: {err}")))?;

        tokio::time::timeout(SDP_TIMEOUT, self.peer_connection.set_remote_description(answer))
            .await
            .map_err(|_| SessionError::DeadlineExceeded("set_remote_description timed out".into()))?
            .map_err(|err| SessionError::Internal(format!("failed to set remote description: {err}")))?;

        Ok(())
    }

    async fn post_join(
        endpoint: &str,
        conference_id: &str,
        token: &str,
        offer_sdp: &str,
    ) -> Result<String, JoinError> {
        let url = format!("{endpoint}/spaces/{conference_id}:connectActiveConference");

        let client = reqwest::Client::new();
        let response = client
            .post(&url)
            .header("Content-Type", "application/json;charset=UTF-8")
            .header("Authorization", format!("Bearer {token}"))
            .json(&serde_json::json!({ "offer": offer_sdp }))
            .send()
            .await
            .map_err(|err| SessionError::Internal(format!("join request failed: {err}")))?;

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|_| SessionError::Internal("Unexpected or malformed response from Meet servers.".into()))?;

        if !body.is_object() {
            return Err(SessionError::Internal(
                "Unexpected or malformed response from Meet servers.".into(),
            )
            .into());
        }

        if let Some(error) = body.get("error") {
            let status = error
                .get("status")
                .and_then(|v| v.as_str())
                .map(StatusCode::from_symbol)
                .unwrap_or(StatusCode::Unknown);
            let message = error
                .get("message")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            tracing::warn!(?status, %message, "join rejected by server");
            // Preserve the server's own status/message rather than flattening
            // to Internal (§4.3 step 3, §8 scenario 3).
            return Err(JoinError::new(status, message));
        }

        body.get("answer")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| {
                SessionError::Internal("Unexpected or malformed response from Meet servers.".into())
                    .into()
            })
    }

    /// Closes the underlying peer connection. Idempotent.
    pub async fn close(&self) {
        if let Err(err) = self.peer_connection.close().await {
            tracing::warn!(%err, "error closing peer connection");
        }
    }
}

/// C5 draws its raw report from the peer connection's own `get_stats()`
/// rather than a synthetic collaborator, matching the teacher's own use of
/// `webrtc::stats` for adaptive-bitrate decisions.
#[async_trait::async_trait]
impl crate::stats::StatsSource for TransportAdapter {
    async fn collect(&self) -> Vec<crate::stats::RawStatsSection> {
        use webrtc::stats::StatsReportType;

        let report = self.peer_connection.get_stats().await;

        report
            .reports
            .iter()
            .filter_map(|(id, stat)| {
                let StatsReportType::CandidatePair(pair) = stat else {
                    return None;
                };

                let mut fields = std::collections::HashMap::new();
                fields.insert(
                    "lastPacketSentTimestamp".to_string(),
                    pair.last_packet_sent_timestamp.to_string(),
                );
                fields.insert(
                    "lastPacketReceivedTimestamp".to_string(),
                    pair.last_packet_received_timestamp.to_string(),
                );
                fields.insert("bytesSent".to_string(), pair.bytes_sent.to_string());
                fields.insert("bytesReceived".to_string(), pair.bytes_received.to_string());

                Some(crate::stats::RawStatsSection {
                    id: id.clone(),
                    kind: "candidate-pair".to_string(),
                    fields,
                })
            })
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn channel_labels_match_the_wire_resource_namespace() {
        assert_eq!(
            CHANNEL_LABELS,
            [
                "media-entries",
                "media-stats",
                "participants",
                "session-control",
                "video-assignment",
            ]
        );
    }
}
