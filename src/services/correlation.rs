use crate::host::KvStore;
use crate::models::PendingRequest;

/// Store key prefix for in-flight request records.
pub const PENDING_KEY_PREFIX: &str = "llmhook_req_";

/// Sentinel correlation key used when the host supplies no request id.
///
/// All in-flight requests without an id share this single slot, so
/// concurrent exchanges can cross-talk exactly the way per-id keying was
/// meant to prevent. Whether that is acceptable depends on host guarantees
/// this code cannot see; the degradation is logged, not repaired.
pub const NO_ID_KEY: &str = "NO_ID";

/// Correlates a response back to the request that produced it, through the
/// host's key-value store. `take` is read-then-clear: clearing after a
/// successful read is what bounds store growth under sustained traffic.
pub struct CorrelationStore<'a> {
    store: &'a dyn KvStore,
}

impl<'a> CorrelationStore<'a> {
    pub fn new(store: &'a dyn KvStore) -> Self {
        Self { store }
    }

    /// Derives the correlation key for an exchange: the host request id if
    /// present, otherwise [`NO_ID_KEY`].
    pub fn correlation_key(request_id: Option<&str>) -> String {
        match request_id {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => NO_ID_KEY.to_string(),
        }
    }

    fn store_key(correlation_key: &str) -> String {
        format!("{PENDING_KEY_PREFIX}{correlation_key}")
    }

    pub fn put(&self, pending: &PendingRequest) {
        match serde_json::to_string(pending) {
            Ok(json) => {
                self.store
                    .write(Some(&json), &Self::store_key(&pending.correlation_key));
                log::debug!(
                    "recorded start for {} ({})",
                    pending.correlation_key,
                    pending.requested_model
                );
            }
            Err(e) => log::warn!("failed to serialize pending request: {e}"),
        }
    }

    /// Looks up and clears the pending record for `correlation_key`.
    /// Returns `None` when no record exists or the stored value is corrupt;
    /// the slot is cleared in either case.
    pub fn take(&self, correlation_key: &str) -> Option<PendingRequest> {
        let key = Self::store_key(correlation_key);
        let raw = self.store.read(&key)?;
        self.store.write(None, &key);

        match serde_json::from_str(&raw) {
            Ok(pending) => Some(pending),
            Err(e) => {
                log::warn!("corrupt pending record under {key}: {e}");
                None
            }
        }
    }
}
