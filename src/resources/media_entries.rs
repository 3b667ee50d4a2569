//! `media-entries` resource codec: server → client only. Announces the
//! addition/removal of live media producers and their CSRCs.

use super::codec::{optional_array, parse_object};
use crate::error::CodecError;
use crate::types::MediaEntry;

const CHANNEL: &str = "media-entries";

/// A snapshot of one media entry resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaEntriesResourceSnapshot {
    /// Resource id.
    pub id: i64,
    /// The entry's current state, if present in this snapshot.
    pub media_entry: Option<MediaEntry>,
}

/// A deleted media entry resource; carries only the id (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaEntriesDeletedResource {
    /// The resource id being deleted.
    pub id: i64,
}

/// Server → client envelope on `media-entries`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MediaEntriesToClient {
    /// Added/updated resource snapshots, unordered.
    pub resources: Vec<MediaEntriesResourceSnapshot>,
    /// Deleted resources, unordered.
    pub deleted_resources: Vec<MediaEntriesDeletedResource>,
}

/// Parses a `media-entries` server push.
pub fn parse(raw: &str) -> Result<MediaEntriesToClient, CodecError> {
    let obj = parse_object(CHANNEL, raw)?;

    let resources = optional_array(CHANNEL, raw, &obj, "resources")?
        .into_iter()
        .flatten()
        .map(|item| MediaEntriesResourceSnapshot {
            id: item.get("id").and_then(|v| v.as_i64()).unwrap_or(0),
            media_entry: item.get("mediaEntry").map(parse_media_entry),
        })
        .collect();

    let deleted_resources = optional_array(CHANNEL, raw, &obj, "deletedResources")?
        .into_iter()
        .flatten()
        .map(|item| MediaEntriesDeletedResource {
            id: item.get("id").and_then(|v| v.as_i64()).unwrap_or(0),
        })
        .collect();

    Ok(MediaEntriesToClient {
        resources,
        deleted_resources,
    })
}

fn parse_media_entry(value: &serde_json::Value) -> MediaEntry {
    let video_csrcs = value
        .get("videoCsrcs")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|c| c.as_u64())
                .map(|c| c as u32)
                .collect()
        })
        .unwrap_or_default();

    MediaEntry {
        participant_id: value
            .get("participantId")
            .and_then(|v| v.as_i64())
            .unwrap_or(0) as i32,
        audio_csrc: value.get("audioCsrc").and_then(|v| v.as_u64()).unwrap_or(0) as u32,
        video_csrcs,
        presenter: value
            .get("presenter")
            .and_then(|v| v.as_bool())
            .unwrap_or(false),
        screenshare: value
            .get("screenshare")
            .and_then(|v| v.as_bool())
            .unwrap_or(false),
        audio_muted: value
            .get("audioMuted")
            .and_then(|v| v.as_bool())
            .unwrap_or(false),
        video_muted: value
            .get("videoMuted")
            .and_then(|v| v.as_bool())
            .unwrap_or(false),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_media_entry() {
        let raw = r#"{"resources":[{"id":1,"mediaEntry":{"participantId":9,"audioCsrc":111,
            "videoCsrcs":[222,333],"presenter":true,"screenshare":false,
            "audioMuted":false,"videoMuted":true}}]}"#;
        let update = parse(raw).unwrap();
        let entry = update.resources[0].media_entry.as_ref().unwrap();
        assert_eq!(entry.participant_id, 9);
        assert_eq!(entry.audio_csrc, 111);
        assert_eq!(entry.video_csrcs, vec![222, 333]);
        assert!(entry.presenter);
        assert!(entry.video_muted);
    }

    #[test]
    fn missing_fields_take_documented_defaults() {
        let raw = r#"{"resources":[{"id":1,"mediaEntry":{}}]}"#;
        let update = parse(raw).unwrap();
        let entry = update.resources[0].media_entry.as_ref().unwrap();
        assert_eq!(entry, &MediaEntry::default());
    }

    #[test]
    fn deletion_carries_only_id() {
        let raw = r#"{"deletedResources":[{"id":5}]}"#;
        let update = parse(raw).unwrap();
        assert_eq!(update.deleted_resources, vec![MediaEntriesDeletedResource { id: 5 }]);
    }

    #[test]
    fn resources_wrong_type_is_internal_error() {
        let err = parse(r#"{"resources": "oops"}"#).unwrap_err();
        assert!(matches!(err, CodecError::ExpectedArray { .. }));
    }
}
