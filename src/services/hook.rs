//! The two phase handlers the host drives, one invocation per leg of an
//! exchange. Both are no-throw by contract: every internal failure degrades
//! to a default, gets logged, and is reported in the returned
//! [`HookOutcome`]. The worst user-visible effect of bad input is a
//! degraded notification, never a blocked exchange.

use crate::host::{KvStore, Notifier};
use crate::models::{Derived, FallbackReason, HostRequest, HostResponse, PendingRequest};
use crate::services::correlation::CorrelationStore;
use crate::services::notify::format_notification;
use crate::services::platform::{derive_platform, derive_requested_model, trimmed_model, UNKNOWN};
use crate::services::records::{count_request_images, derive_record_count};
use crate::services::stats::StatsStore;
use crate::services::usage::derive_usage;
use chrono::Utc;
use serde_json::Value;

/// Ways a handler invocation degraded while still completing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Degradation {
    /// The host supplied no request id; correlation fell back to the
    /// shared `NO_ID` slot.
    MissingRequestId,
    /// No pending record matched the response; duration is unknown.
    MissingPendingRecord,
    /// The response body was not parseable JSON; usage and record count
    /// were not derived from it.
    UnparseableResponseBody,
}

/// What one handler invocation did. Produced exactly once per invocation
/// on every path; the embedding maps it to its completion signal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HookOutcome {
    /// True when a notification was posted (response phase only).
    pub notified: bool,
    pub degradations: Vec<Degradation>,
}

/// The interception hook itself, parameterized over the host's store and
/// notification channel.
pub struct UsageHook<'a> {
    store: &'a dyn KvStore,
    notifier: &'a dyn Notifier,
}

impl<'a> UsageHook<'a> {
    pub fn new(store: &'a dyn KvStore, notifier: &'a dyn Notifier) -> Self {
        Self { store, notifier }
    }

    /// Request leg: capture start time, requested model, platform, and
    /// image count, and persist them under the exchange's correlation key.
    pub fn handle_request(&self, req: &HostRequest) -> HookOutcome {
        let mut outcome = HookOutcome::default();

        let correlation_key = CorrelationStore::correlation_key(req.id.as_deref());
        if req.id.as_deref().map_or(true, str::is_empty) {
            log::warn!("host supplied no request id, timing may cross-talk between exchanges");
            outcome.degradations.push(Degradation::MissingRequestId);
        }

        let pending = PendingRequest {
            correlation_key,
            start_time_ms: Utc::now().timestamp_millis(),
            requested_model: derive_requested_model(&req.body),
            platform: derive_platform(&req.url).to_string(),
            url: req.url.clone(),
            image_count: count_request_images(&req.body),
        };

        CorrelationStore::new(self.store).put(&pending);
        outcome
    }

    /// Response leg: correlate back to the request, compute latency,
    /// derive usage and record count, fold into the aggregate, and post
    /// the notification.
    pub fn handle_response(&self, req: &HostRequest, resp: &HostResponse) -> HookOutcome {
        let mut outcome = HookOutcome::default();

        let correlation_key = CorrelationStore::correlation_key(req.id.as_deref());
        let pending = CorrelationStore::new(self.store).take(&correlation_key);
        if pending.is_none() {
            log::info!("no start record for {correlation_key}, duration unknown");
            outcome.degradations.push(Degradation::MissingPendingRecord);
        }

        let parsed: Option<Value> = match serde_json::from_str(&resp.body) {
            Ok(v) => Some(v),
            Err(e) => {
                log::info!("response body is not JSON ({e}), sending basic notification");
                outcome
                    .degradations
                    .push(Degradation::UnparseableResponseBody);
                None
            }
        };

        let mut platform = derive_platform(&req.url).to_string();
        let mut model = UNKNOWN.to_string();
        let mut image_count = 1;
        let mut duration_ms = None;
        if let Some(p) = &pending {
            if !p.platform.is_empty() {
                platform = p.platform.clone();
            }
            if p.requested_model != UNKNOWN {
                model = p.requested_model.clone();
            }
            image_count = p.image_count;
            duration_ms = Some((Utc::now().timestamp_millis() - p.start_time_ms) as f64);
        }

        // The request leg may not have seen a model; the response body is
        // the fallback source.
        if model == UNKNOWN {
            if let Some(m) = parsed.as_ref().and_then(trimmed_model) {
                model = m;
            }
        }

        let usage = parsed.as_ref().map(derive_usage).unwrap_or_default();
        let record_count = parsed
            .as_ref()
            .map(derive_record_count)
            .unwrap_or(Derived::Fallback(FallbackReason::BodyNotJson))
            .value_or(0);

        let aggregate = StatsStore::new(self.store).update(
            &platform,
            &model,
            duration_ms,
            record_count,
            usage.total_tokens,
        );

        let notification = format_notification(
            &platform,
            &model,
            duration_ms,
            record_count,
            image_count,
            &usage,
            &aggregate,
        );
        self.notifier
            .post(&notification.title, &notification.subtitle, &notification.body);
        outcome.notified = true;

        log::debug!(
            "completed exchange for {platform}::{model}: {record_count} records, {} tokens",
            usage.total_tokens
        );
        outcome
    }
}
