use crate::host::KvStore;
use crate::models::{aggregate_key, AggregateRecord, StatsHistory};
use chrono::Utc;

/// Durable store key for the serialized statistics mapping.
pub const HISTORY_KEY: &str = "llmhook_history";

/// Maintains the cumulative per platform+model statistics through the
/// host's key-value store.
///
/// Every update reads the whole mapping, mutates one record, and writes the
/// whole mapping back; the store offers no compare-and-swap, so concurrent
/// responses for the same key can drop increments (last writer wins). That
/// race is accepted: deployments needing exactness must serialize updates
/// outside this crate.
pub struct StatsStore<'a> {
    store: &'a dyn KvStore,
}

impl<'a> StatsStore<'a> {
    pub fn new(store: &'a dyn KvStore) -> Self {
        Self { store }
    }

    /// Reads the persisted mapping. An absent or corrupt value yields a
    /// fresh history rather than an error.
    pub fn read_history(&self) -> StatsHistory {
        let Some(raw) = self.store.read(HISTORY_KEY) else {
            return StatsHistory::default();
        };
        match serde_json::from_str(&raw) {
            Ok(history) => history,
            Err(e) => {
                log::warn!("corrupt statistics history, starting fresh: {e}");
                StatsHistory::default()
            }
        }
    }

    fn write_history(&self, history: &StatsHistory) {
        match serde_json::to_string(history) {
            Ok(json) => self.store.write(Some(&json), HISTORY_KEY),
            Err(e) => log::warn!("failed to serialize statistics history: {e}"),
        }
    }

    /// Clears all accumulated statistics.
    pub fn reset(&self) {
        self.store.write(None, HISTORY_KEY);
    }

    /// Folds one completed response into the aggregate for
    /// `platform::model` and persists the mapping. Returns the updated
    /// record.
    ///
    /// `request_count` advances unconditionally: counting completed
    /// responses is independent of whether they carried usage data.
    /// Duration accumulates only when known, finite, and non-negative;
    /// records and tokens only when positive.
    pub fn update(
        &self,
        platform: &str,
        model: &str,
        duration_ms: Option<f64>,
        record_count: u64,
        total_tokens: u64,
    ) -> AggregateRecord {
        let mut history = self.read_history();
        let key = aggregate_key(platform, model);
        let record = history
            .by_key
            .entry(key)
            .or_insert_with(|| AggregateRecord::new(platform, model));

        record.request_count += 1;

        if let Some(d) = duration_ms {
            if d.is_finite() && d >= 0.0 {
                record.total_ms += d;
            }
        }
        record.avg_ms = record.total_ms / record.request_count as f64;

        if record_count > 0 {
            record.total_records += record_count;
        }
        if total_tokens > 0 {
            record.total_tokens += total_tokens;
        }

        record.updated_at = Utc::now();
        let updated = record.clone();
        self.write_history(&history);
        updated
    }
}
