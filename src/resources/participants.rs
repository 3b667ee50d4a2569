//! `participants` resource codec: server → client only. Identity metadata
//! per-participant, discriminated by which single-key object is present
//! (§6.3 supplement, grounded on `resource_parsers.h`'s
//! `ParticipantsStringify`).

use super::codec::{optional_array, parse_object};
use crate::error::CodecError;
use crate::types::ParticipantIdentity;

const CHANNEL: &str = "participants";

/// A snapshot of one participant resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantsResourceSnapshot {
    /// Resource id.
    pub id: i64,
    /// The participant's identity, if present in this snapshot.
    pub participant: Option<ParticipantIdentity>,
}

/// A deleted participant resource; carries only the id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParticipantsDeletedResource {
    /// The resource id being deleted.
    pub id: i64,
}

/// Server → client envelope on `participants`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParticipantsToClient {
    /// Added/updated resource snapshots, unordered.
    pub resources: Vec<ParticipantsResourceSnapshot>,
    /// Deleted resources, unordered.
    pub deleted_resources: Vec<ParticipantsDeletedResource>,
}

/// Parses a `participants` server push.
pub fn parse(raw: &str) -> Result<ParticipantsToClient, CodecError> {
    let obj = parse_object(CHANNEL, raw)?;

    let resources = optional_array(CHANNEL, raw, &obj, "resources")?
        .into_iter()
        .flatten()
        .map(|item| ParticipantsResourceSnapshot {
            id: item.get("id").and_then(|v| v.as_i64()).unwrap_or(0),
            participant: item.get("participant").and_then(parse_identity),
        })
        .collect();

    let deleted_resources = optional_array(CHANNEL, raw, &obj, "deletedResources")?
        .into_iter()
        .flatten()
        .map(|item| ParticipantsDeletedResource {
            id: item.get("id").and_then(|v| v.as_i64()).unwrap_or(0),
        })
        .collect();

    Ok(ParticipantsToClient {
        resources,
        deleted_resources,
    })
}

fn parse_identity(value: &serde_json::Value) -> Option<ParticipantIdentity> {
    let display_name = |v: &serde_json::Value| {
        v.get("displayName")
            .and_then(|d| d.as_str())
            .unwrap_or_default()
            .to_string()
    };

    if let Some(u) = value.get("signedInUser") {
        return Some(ParticipantIdentity::SignedInUser {
            display_name: display_name(u),
            user_id: u
                .get("userId")
                .and_then(|d| d.as_str())
                .unwrap_or_default()
                .to_string(),
        });
    }
    if let Some(u) = value.get("anonymousUser") {
        return Some(ParticipantIdentity::AnonymousUser {
            display_name: display_name(u),
        });
    }
    if let Some(u) = value.get("phoneUser") {
        return Some(ParticipantIdentity::PhoneUser {
            display_name: display_name(u),
        });
    }
    None
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_signed_in_user() {
        let raw = r#"{"resources":[{"id":1,"participant":{"signedInUser":
            {"displayName":"Ada","userId":"u-1"}}}]}"#;
        let update = parse(raw).unwrap();
        assert_eq!(
            update.resources[0].participant,
            Some(ParticipantIdentity::SignedInUser {
                display_name: "Ada".into(),
                user_id: "u-1".into()
            })
        );
    }

    #[test]
    fn parses_anonymous_and_phone_users() {
        let raw = r#"{"resources":[
            {"id":1,"participant":{"anonymousUser":{"displayName":"Guest"}}},
            {"id":2,"participant":{"phoneUser":{"displayName":"Caller"}}}
        ]}"#;
        let update = parse(raw).unwrap();
        assert_eq!(
            update.resources[0].participant,
            Some(ParticipantIdentity::AnonymousUser {
                display_name: "Guest".into()
            })
        );
        assert_eq!(
            update.resources[1].participant,
            Some(ParticipantIdentity::PhoneUser {
                display_name: "Caller".into()
            })
        );
    }

    #[test]
    fn unrecognized_identity_variant_parses_as_none() {
        let raw = r#"{"resources":[{"id":1,"participant":{"somethingElse":{}}}]}"#;
        let update = parse(raw).unwrap();
        assert_eq!(update.resources[0].participant, None);
    }
}
