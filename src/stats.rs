//! C5: Stats Collector. While joined, periodically queries the transport
//! for a statistics report, filters it through the server-supplied
//! allowlist, and uploads the result on `media-stats` (§4.5).

use crate::data_channel::ResourceChannel;
use crate::resources::media_stats::{MediaStatsFromClient, StatsSection, UploadMediaStats};
use crate::resources::MediaStatsCodec;
use crate::types::StatsConfig;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicU32, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// A single section of a raw statistics report, prior to allowlist
/// filtering.
#[derive(Debug, Clone)]
pub struct RawStatsSection {
    /// The stable identifier for this section.
    pub id: String,
    /// The statistics kind (e.g. `"candidate-pair"`), matched against the
    /// allowlist.
    pub kind: String,
    /// All field values present in this section, stringified.
    pub fields: HashMap<String, String>,
}

/// Queries the transport for a full statistics report. An external
/// collaborator — backed by the peer connection's `get_stats()`.
#[async_trait::async_trait]
pub trait StatsSource: Send + Sync {
    /// Returns the current statistics report.
    async fn collect(&self) -> Vec<RawStatsSection>;
}

/// Filters `sections` through `allowlist`, keeping only sections whose
/// `kind` is present and, within those, only the allowlisted field names
/// (§4.1's media-stats filter, §4.5 step 2).
#[must_use]
pub fn filter_sections(
    sections: Vec<RawStatsSection>,
    allowlist: &HashMap<String, std::collections::HashSet<String>>,
) -> Vec<StatsSection> {
    sections
        .into_iter()
        .filter_map(|section| {
            let allowed_fields = allowlist.get(&section.kind)?;
            let values = section
                .fields
                .into_iter()
                .filter(|(field, _)| allowed_fields.contains(field))
                .collect();
            Some(StatsSection {
                id: section.id,
                values,
            })
        })
        .collect()
}

/// Owns the recurring stats-upload tick once armed.
pub struct StatsCollector {
    source: Arc<dyn StatsSource>,
    channel: Arc<ResourceChannel<MediaStatsCodec>>,
    next_request_id: Arc<AtomicI64>,
    tick_generation: Arc<AtomicU32>,
    handle: parking_lot::Mutex<Option<JoinHandle<()>>>,
    alive: Arc<std::sync::atomic::AtomicBool>,
}

impl StatsCollector {
    /// Builds a disabled collector. Call [`StatsCollector::configure`] on
    /// receipt of the server's `media-stats` configuration push to arm it.
    #[must_use]
    pub fn new(
        source: Arc<dyn StatsSource>,
        channel: Arc<ResourceChannel<MediaStatsCodec>>,
        alive: Arc<std::sync::atomic::AtomicBool>,
    ) -> Self {
        Self {
            source,
            channel,
            next_request_id: Arc::new(AtomicI64::new(1)),
            tick_generation: Arc::new(AtomicU32::new(0)),
            handle: parking_lot::Mutex::new(None),
            alive,
        }
    }

    /// Applies a server-pushed configuration. `upload_interval_seconds ==
    /// 0` disables further ticks (and cancels any running tick loop);
    /// otherwise arms a recurring tick at that interval, with the first
    /// tick scheduled immediately.
    pub fn configure(self: &Arc<Self>, config: StatsConfig) {
        // Bumping the generation invalidates any previously spawned tick
        // loop the moment it next checks in, without needing to await its
        // task handle.
        self.tick_generation.fetch_add(1, Ordering::SeqCst);
        let generation = self.tick_generation.load(Ordering::SeqCst);

        if let Some(previous) = self.handle.lock().take() {
            previous.abort();
        }

        if config.upload_interval_seconds <= 0 {
            tracing::info!("media-stats upload disabled by server configuration");
            return;
        }

        let interval = std::time::Duration::from_secs(config.upload_interval_seconds as u64);
        let this = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if !this.alive.load(Ordering::Acquire) {
                    break;
                }
                if this.tick_generation.load(Ordering::SeqCst) != generation {
                    break;
                }
                this.run_tick(&config.allowlist).await;
            }
        });

        *self.handle.lock() = Some(handle);
    }

    async fn run_tick(&self, allowlist: &HashMap<String, std::collections::HashSet<String>>) {
        let raw = self.source.collect().await;
        let sections = filter_sections(raw, allowlist);
        let request_id = self.next_request_id.fetch_add(1, Ordering::SeqCst);

        let request = MediaStatsFromClient {
            request_id,
            upload_media_stats: UploadMediaStats { sections },
        };

        if let Err(err) = self.channel.send_request(&request).await {
            tracing::warn!(%err, "failed to enqueue media-stats upload");
        }
    }

    /// Cancels any pending tick. Called on transition to `Disconnected`
    /// (§4.5's cancellation contract).
    pub fn cancel(&self) {
        self.tick_generation.fetch_add(1, Ordering::SeqCst);
        if let Some(handle) = self.handle.lock().take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn section(kind: &str, fields: &[(&str, &str)]) -> RawStatsSection {
        RawStatsSection {
            id: kind.to_string(),
            kind: kind.to_string(),
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    #[test]
    fn drops_sections_not_in_allowlist() {
        let sections = vec![section("candidate-pair", &[("a", "1")]), section("codec", &[("b", "2")])];
        let mut allowlist = HashMap::new();
        allowlist.insert("candidate-pair".to_string(), ["a".to_string()].into());

        let filtered = filter_sections(sections, &allowlist);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id, "candidate-pair");
    }

    #[test]
    fn drops_fields_not_in_field_allowlist() {
        let sections = vec![section(
            "candidate-pair",
            &[("lastPacketSentTimestamp", "1"), ("unapproved", "2")],
        )];
        let mut allowlist = HashMap::new();
        allowlist.insert(
            "candidate-pair".to_string(),
            ["lastPacketSentTimestamp".to_string()].into(),
        );

        let filtered = filter_sections(sections, &allowlist);
        assert_eq!(filtered[0].values.len(), 1);
        assert!(filtered[0].values.contains_key("lastPacketSentTimestamp"));
    }

    #[test]
    fn empty_allowlist_drops_everything() {
        let sections = vec![section("candidate-pair", &[("a", "1")])];
        let filtered = filter_sections(sections, &HashMap::new());
        assert!(filtered.is_empty());
    }
}
