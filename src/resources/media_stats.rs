//! `media-stats` resource codec: both directions, but the client→server
//! direction is wholly owned by the Stats Collector (C5) — the public
//! `send_request` surface must refuse it (§4.5).

use super::codec::{optional_array, parse_object, require_nonzero_request_id};
use crate::error::CodecError;
use crate::types::StatsConfig;
use std::collections::{HashMap, HashSet};

const CHANNEL: &str = "media-stats";

/// A snapshot of the media-stats singleton resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaStatsResourceSnapshot {
    /// Resource id (zero for the singleton).
    pub id: i64,
    /// The upload policy, if present in this snapshot.
    pub configuration: Option<StatsConfig>,
}

/// Server → client envelope on `media-stats`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MediaStatsToClient {
    /// Resource snapshots.
    pub resources: Vec<MediaStatsResourceSnapshot>,
}

/// One statistics section carried in an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsSection {
    /// The section's stable identifier.
    pub id: String,
    /// Allowlisted field name → stringified value.
    pub values: HashMap<String, String>,
}

/// The client's stats upload payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadMediaStats {
    /// The sections being uploaded.
    pub sections: Vec<StatsSection>,
}

/// Client → server envelope on `media-stats`. Only ever constructed by C5.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaStatsFromClient {
    /// Monotonically increasing, per-session request id, reserved to C5.
    pub request_id: i64,
    /// The stats payload.
    pub upload_media_stats: UploadMediaStats,
}

/// Parses a `media-stats` server push.
pub fn parse(raw: &str) -> Result<MediaStatsToClient, CodecError> {
    let obj = parse_object(CHANNEL, raw)?;

    let resources = optional_array(CHANNEL, raw, &obj, "resources")?
        .into_iter()
        .flatten()
        .map(|item| MediaStatsResourceSnapshot {
            id: item.get("id").and_then(|v| v.as_i64()).unwrap_or(0),
            configuration: item.get("configuration").map(parse_configuration),
        })
        .collect();

    Ok(MediaStatsToClient { resources })
}

fn parse_configuration(value: &serde_json::Value) -> StatsConfig {
    let upload_interval_seconds = value
        .get("uploadIntervalSeconds")
        .and_then(|v| v.as_i64())
        .unwrap_or(0) as i32;

    let mut allowlist: HashMap<String, HashSet<String>> = HashMap::new();
    if let Some(obj) = value.get("allowlist").and_then(|v| v.as_object()) {
        for (section, fields) in obj {
            let field_set = fields
                .as_array()
                .map(|arr| {
                    arr.iter()
                        .filter_map(|f| f.as_str())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default();
            allowlist.insert(section.clone(), field_set);
        }
    }

    StatsConfig {
        upload_interval_seconds,
        allowlist,
    }
}

/// Serializes a `media-stats` upload request. This codec does not itself
/// apply the allowlist filter — C5 is responsible for filtering sections
/// and fields before calling this function, per §4.5.
pub fn serialize(req: &MediaStatsFromClient) -> Result<String, CodecError> {
    require_nonzero_request_id(req.request_id)?;

    let sections: Vec<_> = req
        .upload_media_stats
        .sections
        .iter()
        .map(|s| serde_json::json!({ "id": s.id, "values": s.values }))
        .collect();

    Ok(serde_json::json!({
        "request": {
            "requestId": req.request_id,
            "uploadMediaStats": { "sections": sections },
        }
    })
    .to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_upload_configuration() {
        let raw = r#"{"resources":[{"id":0,"configuration":{"uploadIntervalSeconds":1,
            "allowlist":{"candidate-pair":["lastPacketSentTimestamp","lastPacketReceivedTimestamp"]}}}]}"#;
        let update = parse(raw).unwrap();
        let config = update.resources[0].configuration.as_ref().unwrap();
        assert_eq!(config.upload_interval_seconds, 1);
        assert_eq!(config.allowlist["candidate-pair"].len(), 2);
    }

    #[test]
    fn zero_upload_interval_disables() {
        let raw = r#"{"resources":[{"id":0,"configuration":{"uploadIntervalSeconds":0}}]}"#;
        let update = parse(raw).unwrap();
        assert_eq!(update.resources[0].configuration.as_ref().unwrap().upload_interval_seconds, 0);
    }

    #[test]
    fn serializes_section_values_as_strings() {
        let mut values = HashMap::new();
        values.insert("lastPacketSentTimestamp".to_string(), "123".to_string());
        let req = MediaStatsFromClient {
            request_id: 1,
            upload_media_stats: UploadMediaStats {
                sections: vec![StatsSection {
                    id: "candidate-pair".into(),
                    values,
                }],
            },
        };
        let body = serialize(&req).unwrap();
        assert!(body.contains("\"lastPacketSentTimestamp\":\"123\""));
    }
}
