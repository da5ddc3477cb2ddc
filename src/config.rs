//! Engine configuration — the tunables spec.md calls out as configuration
//! rather than literals (approver thresholds, approval window, retry
//! policies, catalog block-lists).

use crate::model::UserId;
use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Retry policy for a single step category: initial interval, backoff
/// coefficient, max interval, max attempts (spec.md §4.1 item 2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub initial_interval_ms: u64,
    pub backoff_coefficient: f64,
    pub max_interval_ms: u64,
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_interval_ms: 200,
            backoff_coefficient: 2.0,
            max_interval_ms: 30_000,
            max_attempts: 5,
        }
    }
}

impl RetryPolicy {
    /// A policy for the purchase gateway: longer max interval, the engine
    /// may legitimately back off for hours on a transient vendor outage
    /// (spec.md §4.5).
    pub fn purchase_gateway() -> Self {
        Self {
            initial_interval_ms: 1_000,
            backoff_coefficient: 2.0,
            max_interval_ms: 3_600_000,
            max_attempts: 10,
        }
    }

    /// A policy for fire-and-observe notifications: few attempts, failures
    /// are swallowed regardless (spec.md §4.2 `NotifyRecipient`).
    pub fn notification() -> Self {
        Self {
            initial_interval_ms: 100,
            backoff_coefficient: 2.0,
            max_interval_ms: 2_000,
            max_attempts: 3,
        }
    }
}

/// Per-engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Amount above which the CEO is added to the approver chain.
    pub threshold_high: i64,
    /// Amount above which Manager + Supervisor are added to the chain.
    pub threshold_mid: i64,
    /// Whether an amount exactly equal to `threshold_mid` takes the mid-tier
    /// path (true, the chosen convention — see DESIGN.md §Open Questions)
    /// or the low tier path (false).
    pub mid_tier_inclusive_bound: bool,
    /// Default approval wait window (spec.md §4.3 step 4).
    pub approval_window: Duration,
    /// Cap on `usedAmount / maxAmount` for a delegation (default 1.0, strict).
    pub delegation_usage_cap: f64,
    /// Case-insensitive substrings that make a catalog item's title
    /// prohibited.
    pub catalog_block_terms: Vec<String>,
    /// Product ids that are always prohibited.
    pub catalog_block_ids: Vec<String>,
    pub catalog_retry: RetryPolicy,
    pub purchase_retry: RetryPolicy,
    pub notification_retry: RetryPolicy,
    /// Organizational identity of the CEO, added to the approver chain
    /// above `threshold_high` (spec.md §4.2 `ResolveApprovers` step 1).
    pub ceo_user_id: UserId,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            threshold_high: 10_000_00,
            threshold_mid: 1_000_00,
            mid_tier_inclusive_bound: true,
            approval_window: Duration::days(7),
            delegation_usage_cap: 1.0,
            catalog_block_terms: vec!["weapon".to_string(), "explosive".to_string()],
            catalog_block_ids: Vec::new(),
            catalog_retry: RetryPolicy::default(),
            purchase_retry: RetryPolicy::purchase_gateway(),
            notification_retry: RetryPolicy::notification(),
            ceo_user_id: UserId::from("ceo@co"),
        }
    }
}
