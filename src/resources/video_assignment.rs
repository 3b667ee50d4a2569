//! `video-assignment` resource codec: both directions. Client declares a
//! layout; server assigns SSRCs to canvases.

use super::codec::{optional_array, parse_object, parse_status, require_nonzero_request_id};
use crate::error::{CodecError, StatusCode};
use crate::types::{
    AssignmentProtocol, CanvasDimensions, LayoutModel, VideoAssignment, VideoCanvas,
    VideoCanvasAssignment, VideoResolution,
};

const CHANNEL: &str = "video-assignment";

/// An optional response to a prior `video-assignment` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoAssignmentResponse {
    /// The request id this responds to.
    pub request_id: i64,
    /// Status of the request.
    pub status: StatusCode,
    /// Status message.
    pub message: String,
    /// True iff the response is to a `set_assignment` request.
    pub set_assignment: bool,
}

/// A snapshot of the video-assignment singleton resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoAssignmentResourceSnapshot {
    /// Resource id (zero for the singleton).
    pub id: i64,
    /// The current assignment, if present.
    pub assignment: Option<VideoAssignment>,
}

/// Server → client envelope on `video-assignment`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VideoAssignmentToClient {
    /// Response to a prior request, if any.
    pub response: Option<VideoAssignmentResponse>,
    /// Resource snapshots.
    pub resources: Vec<VideoAssignmentResourceSnapshot>,
}

/// The client's desired layout and maximum resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetVideoAssignmentRequest {
    /// The layout to activate, replacing any previous layout.
    pub layout_model: LayoutModel,
    /// The maximum resolution the client wants for any video feed.
    pub max_video_resolution: VideoResolution,
}

/// Client → server envelope on `video-assignment`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoAssignmentFromClient {
    /// Client-assigned, non-zero, session-unique request id.
    pub request_id: i64,
    /// The layout-setting request, if this request sets one.
    pub set_assignment: Option<SetVideoAssignmentRequest>,
}

/// Parses a `video-assignment` server push.
pub fn parse(raw: &str) -> Result<VideoAssignmentToClient, CodecError> {
    let obj = parse_object(CHANNEL, raw)?;

    let response = obj.get("response").map(|r| {
        let (status, message) = parse_status(r.get("status"));
        VideoAssignmentResponse {
            request_id: r.get("requestId").and_then(|v| v.as_i64()).unwrap_or(0),
            status,
            message,
            set_assignment: r.get("setAssignment").is_some(),
        }
    });

    let resources = optional_array(CHANNEL, raw, &obj, "resources")?
        .into_iter()
        .flatten()
        .map(|item| VideoAssignmentResourceSnapshot {
            id: item.get("id").and_then(|v| v.as_i64()).unwrap_or(0),
            assignment: item.get("videoAssignment").map(parse_assignment),
        })
        .collect();

    Ok(VideoAssignmentToClient {
        response,
        resources,
    })
}

fn parse_assignment(value: &serde_json::Value) -> VideoAssignment {
    let canvases = value
        .get("canvases")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .map(|c| VideoCanvasAssignment {
                    canvas_id: c.get("canvasId").and_then(|v| v.as_i64()).unwrap_or(0) as i32,
                    ssrc: c.get("ssrc").and_then(|v| v.as_u64()).unwrap_or(0) as u32,
                    media_entry_id: c
                        .get("mediaEntryId")
                        .and_then(|v| v.as_i64())
                        .unwrap_or(0) as i32,
                })
                .collect()
        })
        .unwrap_or_default();

    VideoAssignment {
        label: value
            .get("label")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
        canvases,
    }
}

/// Serializes a `video-assignment` client request.
pub fn serialize(req: &VideoAssignmentFromClient) -> Result<String, CodecError> {
    require_nonzero_request_id(req.request_id)?;

    let mut request = serde_json::json!({ "requestId": req.request_id });

    if let Some(set_assignment) = &req.set_assignment {
        let mut canvases = Vec::with_capacity(set_assignment.layout_model.canvases.len());
        for canvas in &set_assignment.layout_model.canvases {
            if canvas.id == 0 {
                return Err(CodecError::InvalidRequest("Canvas ID must be set".into()));
            }
            let protocol_key = match canvas.assignment_protocol {
                AssignmentProtocol::Direct => "direct",
                AssignmentProtocol::Relevant => "relevant",
            };
            canvases.push(serde_json::json!({
                "id": canvas.id,
                "dimensions": {
                    "height": canvas.dimensions.height,
                    "width": canvas.dimensions.width,
                },
                protocol_key: {},
            }));
        }

        request["setAssignment"] = serde_json::json!({
            "layoutModel": {
                "label": set_assignment.layout_model.label,
                "canvases": canvases,
            },
            "maxVideoResolution": {
                "height": set_assignment.max_video_resolution.height,
                "width": set_assignment.max_video_resolution.width,
                "frameRate": set_assignment.max_video_resolution.frame_rate,
            },
        });
    }

    Ok(serde_json::json!({ "request": request }).to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn layout() -> LayoutModel {
        LayoutModel {
            label: "L".into(),
            canvases: vec![
                VideoCanvas {
                    id: 1,
                    dimensions: CanvasDimensions {
                        height: 100,
                        width: 100,
                    },
                    assignment_protocol: AssignmentProtocol::Direct,
                },
                VideoCanvas {
                    id: 2,
                    dimensions: CanvasDimensions {
                        height: 200,
                        width: 200,
                    },
                    assignment_protocol: AssignmentProtocol::Relevant,
                },
            ],
        }
    }

    #[test]
    fn serializes_canonical_layout_round_trip() {
        let req = VideoAssignmentFromClient {
            request_id: 1,
            set_assignment: Some(SetVideoAssignmentRequest {
                layout_model: layout(),
                max_video_resolution: VideoResolution::default(),
            }),
        };
        let body = serialize(&req).unwrap();
        let value: serde_json::Value = serde_json::from_str(&body).unwrap();
        let expected = serde_json::json!({
            "request": {
                "requestId": 1,
                "setAssignment": {
                    "layoutModel": {
                        "label": "L",
                        "canvases": [
                            {"id": 1, "dimensions": {"height": 100, "width": 100}, "direct": {}},
                            {"id": 2, "dimensions": {"height": 200, "width": 200}, "relevant": {}}
                        ]
                    },
                    "maxVideoResolution": {"height": 480, "width": 640, "frameRate": 30}
                }
            }
        });
        assert_eq!(value, expected);
    }

    #[test]
    fn zero_canvas_id_is_rejected() {
        let mut layout = layout();
        layout.canvases[0].id = 0;
        let req = VideoAssignmentFromClient {
            request_id: 1,
            set_assignment: Some(SetVideoAssignmentRequest {
                layout_model: layout,
                max_video_resolution: VideoResolution::default(),
            }),
        };
        let err = serialize(&req).unwrap_err();
        assert!(matches!(err, CodecError::InvalidRequest(_)));
    }

    #[test]
    fn parses_response_with_set_assignment_and_resources() {
        let raw = r#"{"response":{"requestId":1,"status":{"code":0,"message":""},
            "setAssignment":{}},
            "resources":[{"id":0,"videoAssignment":{"label":"L",
            "canvases":[{"canvasId":1,"ssrc":111,"mediaEntryId":9}]}}]}"#;
        let update = parse(raw).unwrap();
        assert!(update.response.unwrap().set_assignment);
        let assignment = update.resources[0].assignment.as_ref().unwrap();
        assert_eq!(assignment.label, "L");
        assert_eq!(assignment.canvases[0].ssrc, 111);
    }
}
