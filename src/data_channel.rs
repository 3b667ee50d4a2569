//! C2: Data Channel Adapter. Wraps one reliable, ordered WebRTC data
//! channel bound to one resource, marrying it with its codec (C1) and an
//! observer callback (§4.2).
//!
//! Grounded on `conference_resource_data_channel.h`'s
//! "validate → handler → notify → callback" receive pipeline and
//! "verify → handler → stringify → servers" send pipeline.

use crate::error::SessionError;
use crate::resources::ResourceCodec;
use parking_lot::Mutex;
use std::marker::PhantomData;
use std::sync::Arc;
use webrtc::data_channel::data_channel_state::RTCDataChannelState;
use webrtc::data_channel::RTCDataChannel;

/// A callback invoked exactly once per successfully parsed message. Must be
/// short and non-blocking — heavy work belongs to the orchestrator.
pub type UpdateCallback<U> = Box<dyn Fn(U) + Send + Sync>;

/// One resource's data-channel adapter.
pub struct ResourceChannel<C: ResourceCodec> {
    channel: Arc<RTCDataChannel>,
    callback: Arc<Mutex<Option<UpdateCallback<C::ToClient>>>>,
    _codec: PhantomData<C>,
}

impl<C: ResourceCodec> ResourceChannel<C> {
    /// Wraps `channel`, wiring the receive-path callbacks. The channel's
    /// label is expected to already be `C::CHANNEL` (set at creation time by
    /// the transport adapter).
    #[must_use]
    pub fn new(channel: Arc<RTCDataChannel>) -> Self {
        let callback: Arc<Mutex<Option<UpdateCallback<C::ToClient>>>> = Arc::new(Mutex::new(None));

        let on_message_callback = Arc::clone(&callback);
        channel.on_message(Box::new(move |msg| {
            let callback = Arc::clone(&on_message_callback);
            Box::pin(async move {
                if !msg.is_string {
                    tracing::warn!(channel = C::CHANNEL, "dropped binary frame on text-only channel");
                    return;
                }
                let raw = match std::str::from_utf8(&msg.data) {
                    Ok(raw) => raw,
                    Err(err) => {
                        tracing::warn!(channel = C::CHANNEL, %err, "dropped non-utf8 frame");
                        return;
                    }
                };
                match C::parse(raw) {
                    Ok(update) => {
                        let guard = callback.lock();
                        if let Some(cb) = guard.as_ref() {
                            cb(update);
                        }
                    }
                    Err(err) => {
                        tracing::warn!(channel = C::CHANNEL, %err, "dropped unparseable frame");
                    }
                }
            })
        }));

        Self {
            channel,
            callback,
            _codec: PhantomData,
        }
    }

    /// Sets the at-most-one receive callback. Must be called before the
    /// session is connected; not thread-safe with respect to concurrent
    /// receives.
    pub fn set_callback(&self, cb: UpdateCallback<C::ToClient>) {
        *self.callback.lock() = Some(cb);
    }

    /// Serializes and enqueues `request`. Returns `InvalidArgument` if the
    /// codec rejects the payload, `FailedPrecondition` if the channel is
    /// not open.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails or the channel is not open.
    pub async fn send_request(&self, request: &C::FromClient) -> Result<(), SessionError> {
        if self.channel.ready_state() != RTCDataChannelState::Open {
            return Err(SessionError::FailedPrecondition(format!(
                "{} channel is not open",
                C::CHANNEL
            )));
        }

        let body = C::serialize(request)?;

        self.channel.send_text(body).await.map_err(|err| {
            tracing::warn!(channel = C::CHANNEL, %err, "asynchronous send failure");
            SessionError::FailedPrecondition(format!("{} send failed: {err}", C::CHANNEL))
        })?;
        Ok(())
    }

    /// The channel's wire label.
    #[must_use]
    pub fn label(&self) -> &str {
        C::CHANNEL
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::resources::SessionControlCodec;

    // `RTCDataChannel` cannot be constructed without a live peer connection,
    // so the receive/send pipeline is exercised end-to-end in
    // `tests/session_scenarios.rs` against a real (loopback) webrtc
    // connection. This module checks the parts that do not need one.

    #[test]
    fn update_callback_type_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<UpdateCallback<<SessionControlCodec as ResourceCodec>::ToClient>>();
    }
}
