//! Interception hook for LLM API traffic inside a proxy/traffic-shaping
//! host. The request leg records a start timestamp and the requested model;
//! the response leg correlates back, computes latency, extracts token usage
//! and a derived record count from provider-specific response shapes,
//! updates cumulative per platform+model statistics, and posts a
//! notification.
//!
//! The host's collaborators (key-value store, notification channel) are
//! modeled as traits in [`host`]; [`services::UsageHook`] holds the two
//! phase handlers.

pub mod host;
pub mod models;
pub mod services;
