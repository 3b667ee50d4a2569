//! Scenario-level tests for the session orchestrator that do not require a
//! live peer connection: the parts of §8's concrete scenarios reachable
//! without a real network round-trip.

use conference_session_core::{DisconnectStatus, ObserverInterface, ResourceRequest, Session, SessionConfig, SessionState, StatusCode};
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Default)]
struct RecordingObserver {
    joined: Mutex<u32>,
    disconnected: Mutex<Vec<DisconnectStatus>>,
}

impl ObserverInterface for RecordingObserver {
    fn on_joined(&self) {
        *self.joined.lock() += 1;
    }

    fn on_disconnected(&self, status: DisconnectStatus) {
        self.disconnected.lock().push(status);
    }
}

#[tokio::test]
async fn leave_before_joined_synthesizes_immediate_graceful_disconnect() {
    let observer = Arc::new(RecordingObserver::default());
    let session = Session::create(SessionConfig::default(), Arc::clone(&observer) as Arc<dyn ObserverInterface>, None, None)
        .expect("valid config");

    assert_eq!(session.state(), SessionState::Ready);

    session.leave(1).await.expect("leave synthesizes a disconnect outside Joined");

    let disconnects = observer.disconnected.lock();
    assert_eq!(disconnects.len(), 1);
    assert!(disconnects[0].is_ok());
    assert_eq!(*observer.joined.lock(), 0);
}

#[tokio::test]
async fn leave_on_already_disconnected_session_is_internal_error() {
    let observer = Arc::new(RecordingObserver::default());
    let session = Session::create(SessionConfig::default(), Arc::clone(&observer) as Arc<dyn ObserverInterface>, None, None)
        .expect("valid config");

    session.leave(1).await.expect("first leave succeeds");
    let err = session.leave(2).await.expect_err("second leave on a disconnected session must fail");
    assert!(matches!(err, conference_session_core::SessionError::Internal(_)));

    // Idempotence: the disconnect callback still only fired once (§8).
    assert_eq!(observer.disconnected.lock().len(), 1);
}

#[tokio::test]
async fn media_stats_requests_are_rejected_from_the_public_surface() {
    let observer = Arc::new(RecordingObserver::default());
    let session = Session::create(SessionConfig::default(), observer as Arc<dyn ObserverInterface>, None, None)
        .expect("valid config");

    let request = ResourceRequest::MediaStats(conference_session_core::resources::media_stats::MediaStatsFromClient {
        request_id: 1,
        upload_media_stats: conference_session_core::resources::media_stats::UploadMediaStats {
            sections: vec![],
        },
    });

    let err = session.send_request(request).await.expect_err("media-stats must be rejected");
    assert!(matches!(err, conference_session_core::SessionError::Internal(_)));
}

#[test]
fn construction_rejects_more_than_three_video_streams() {
    struct Quiet;
    impl ObserverInterface for Quiet {
        fn on_disconnected(&self, _status: DisconnectStatus) {}
    }

    let config = SessionConfig {
        receiving_video_stream_count: 4,
        enable_audio_streams: false,
    };
    let err = Session::create(config, Arc::new(Quiet), None, None).expect_err("4 video streams exceeds the maximum");
    assert!(matches!(err, conference_session_core::SessionError::InvalidArgument(_)));
}

#[test]
fn disconnect_status_ok_carries_ok_status_code() {
    let status = DisconnectStatus::ok();
    assert_eq!(status.code, StatusCode::Ok);
    assert!(status.is_ok());
}
