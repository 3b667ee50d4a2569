//! C4: Media Track Adapter. Converts raw RTP callbacks into the public
//! `AudioFrame`/`VideoFrame` shape, extracting CSRC (participant) and SSRC
//! (slot) (§4.4).
//!
//! Decoding payload bytes into PCM/pixels is the underlying transport's
//! concern (§1 lists "codecs" as an external collaborator, interfaced
//! through an abstract transport interface) — this module owns only the
//! CSRC/SSRC extraction and filtering contract, grounded directly on
//! `meet_media_streams.cc`'s `OnData`/`OnFrame` implementations.

use crate::types::{AudioFrame, VideoFrame, CSRC_LOUDEST_SPEAKER};
use std::sync::Arc;
use webrtc::rtp_transceiver::rtp_receiver::RTCRtpReceiver;
use webrtc::track::track_remote::TrackRemote;

/// Decodes an RTP audio payload into PCM16. An external collaborator —
/// out of scope per §1.
pub trait AudioDecoder: Send + Sync {
    /// Decodes one RTP payload. Returns `None` if the payload could not be
    /// decoded (logged and dropped by the caller).
    fn decode(&self, payload: &[u8]) -> Option<DecodedAudio>;
}

/// Decodes RTP video payloads into a pixel buffer. An external
/// collaborator — out of scope per §1.
pub trait VideoDecoder: Send + Sync {
    /// Decodes a frame's worth of RTP payload. Returns `None` if the frame
    /// could not be decoded.
    fn decode(&self, payload: &[u8]) -> Option<DecodedVideo>;
}

/// Decoded PCM audio, prior to CSRC/SSRC attribution.
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    /// Interleaved 16-bit PCM samples.
    pub pcm16: Vec<i16>,
    /// Bits per sample as reported by the decoder.
    pub bits_per_sample: u8,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Number of interleaved channels.
    pub channels: usize,
    /// Number of frames (samples per channel).
    pub frames: usize,
}

/// Decoded video pixels, prior to CSRC/SSRC attribution.
#[derive(Debug, Clone)]
pub struct DecodedVideo {
    /// Opaque decoded pixel payload.
    pub frame: Vec<u8>,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
}

/// Builds the public `AudioFrame`, applying the audio-path filters
/// (§4.4): exactly one CSRC and one SSRC expected; empty CSRC list or
/// zero/missing SSRC drops the frame; `CSRC == 42` (loudest-speaker
/// indicator) drops the frame; `bits_per_sample != 16` drops the frame.
#[must_use]
pub fn build_audio_frame(
    decoded: DecodedAudio,
    csrcs: &[u32],
    ssrc: u32,
) -> Option<AudioFrame> {
    if decoded.bits_per_sample != 16 {
        tracing::error!(
            bits_per_sample = decoded.bits_per_sample,
            "unsupported bits per sample, expected 16"
        );
        return None;
    }

    let Some(&csrc) = csrcs.first() else {
        tracing::warn!("dropped audio frame with empty CSRC list");
        return None;
    };

    if ssrc == 0 {
        tracing::warn!("dropped audio frame with missing/zero SSRC");
        return None;
    }

    if csrc == CSRC_LOUDEST_SPEAKER {
        tracing::info!("dropped audio frame from loudest-speaker indicator track");
        return None;
    }

    Some(AudioFrame {
        pcm16: decoded.pcm16,
        bits_per_sample: decoded.bits_per_sample,
        sample_rate: decoded.sample_rate,
        channels: decoded.channels,
        frames: decoded.frames,
        contributing_source: csrc,
        synchronization_source: ssrc,
    })
}

/// Builds the public `VideoFrame`. The video path applies neither the
/// `CSRC == 42` nor the `SSRC == 0` filter that the audio path does — this
/// asymmetry is intentional (§9). An empty packet-info list (no CSRC/SSRC
/// available) drops the frame.
#[must_use]
pub fn build_video_frame(decoded: DecodedVideo, csrcs: &[u32], ssrc: u32) -> Option<VideoFrame> {
    let Some(&csrc) = csrcs.first() else {
        tracing::error!("dropped video frame with empty packet-info/CSRC list");
        return None;
    };

    Some(VideoFrame {
        frame: decoded.frame,
        width: decoded.width,
        height: decoded.height,
        contributing_source: csrc,
        synchronization_source: ssrc,
    })
}

/// Drives one remote audio track: reads RTP packets, decodes them, and
/// forwards attributed frames to `on_frame`.
pub struct AudioTrackAdapter;

impl AudioTrackAdapter {
    /// Spawns the read loop for `track`, invoking `on_frame` for every frame
    /// that survives the filters in `build_audio_frame`. Stops when the
    /// track ends or `alive` is cleared.
    pub fn spawn(
        track: Arc<TrackRemote>,
        _receiver: Arc<RTCRtpReceiver>,
        decoder: Arc<dyn AudioDecoder>,
        alive: Arc<std::sync::atomic::AtomicBool>,
        on_frame: impl Fn(AudioFrame) + Send + Sync + 'static,
    ) {
        tokio::spawn(async move {
            let mut buf = vec![0u8; 1500];
            while alive.load(std::sync::atomic::Ordering::Acquire) {
                let Ok((packet, _attrs)) = track.read(&mut buf).await else {
                    break;
                };
                let Some(decoded) = decoder.decode(&packet.payload) else {
                    continue;
                };
                let csrcs: Vec<u32> = packet.header.csrc;
                if let Some(frame) = build_audio_frame(decoded, &csrcs, packet.header.ssrc) {
                    on_frame(frame);
                }
            }
        });
    }
}

/// Drives one remote video track, mirroring `AudioTrackAdapter`.
pub struct VideoTrackAdapter;

impl VideoTrackAdapter {
    /// Spawns the read loop for `track`, invoking `on_frame` for every frame
    /// that survives `build_video_frame`.
    pub fn spawn(
        track: Arc<TrackRemote>,
        _receiver: Arc<RTCRtpReceiver>,
        decoder: Arc<dyn VideoDecoder>,
        alive: Arc<std::sync::atomic::AtomicBool>,
        on_frame: impl Fn(VideoFrame) + Send + Sync + 'static,
    ) {
        tokio::spawn(async move {
            let mut buf = vec![0u8; 65536];
            while alive.load(std::sync::atomic::Ordering::Acquire) {
                let Ok((packet, _attrs)) = track.read(&mut buf).await else {
                    break;
                };
                let Some(decoded) = decoder.decode(&packet.payload) else {
                    continue;
                };
                let csrcs: Vec<u32> = packet.header.csrc;
                if let Some(frame) = build_video_frame(decoded, &csrcs, packet.header.ssrc) {
                    on_frame(frame);
                }
            }
        });
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn audio(bits: u8) -> DecodedAudio {
        DecodedAudio {
            pcm16: vec![0; 160],
            bits_per_sample: bits,
            sample_rate: 16000,
            channels: 1,
            frames: 160,
        }
    }

    fn video() -> DecodedVideo {
        DecodedVideo {
            frame: vec![0; 16],
            width: 4,
            height: 4,
        }
    }

    #[test]
    fn audio_frame_dropped_when_csrc_is_loudest_speaker() {
        let frame = build_audio_frame(audio(16), &[CSRC_LOUDEST_SPEAKER], 1);
        assert!(frame.is_none());
    }

    #[test]
    fn audio_frame_dropped_when_ssrc_zero() {
        let frame = build_audio_frame(audio(16), &[7], 0);
        assert!(frame.is_none());
    }

    #[test]
    fn audio_frame_dropped_when_csrc_list_empty() {
        let frame = build_audio_frame(audio(16), &[], 1);
        assert!(frame.is_none());
    }

    #[test]
    fn audio_frame_dropped_when_bits_per_sample_not_16() {
        let frame = build_audio_frame(audio(8), &[7], 1);
        assert!(frame.is_none());
    }

    #[test]
    fn audio_frame_delivered_when_valid() {
        let frame = build_audio_frame(audio(16), &[7], 99).unwrap();
        assert_eq!(frame.contributing_source, 7);
        assert_eq!(frame.synchronization_source, 99);
    }

    #[test]
    fn video_frame_allows_csrc_42_and_ssrc_zero() {
        let frame = build_video_frame(video(), &[CSRC_LOUDEST_SPEAKER], 0).unwrap();
        assert_eq!(frame.contributing_source, CSRC_LOUDEST_SPEAKER);
        assert_eq!(frame.synchronization_source, 0);
    }

    #[test]
    fn video_frame_dropped_when_packet_info_empty() {
        let frame = build_video_frame(video(), &[], 5);
        assert!(frame.is_none());
    }
}
