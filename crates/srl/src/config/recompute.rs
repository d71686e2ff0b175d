use std::num::NonZero;
use std::time::Duration;

use serde::{Deserialize, Deserializer};

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct RecomputeConfig {
    /// How many leaderboards may be recomputed at the same time.
    pub workers: NonZero<usize>,

    pub retry: RetryPolicy,
}

impl Default for RecomputeConfig {
    fn default() -> Self {
        Self { workers: NonZero::<usize>::MIN.saturating_add(3), retry: RetryPolicy::default() }
    }
}

/// How repository calls are retried.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct RetryPolicy {
    /// Total number of attempts, the first one included.
    pub attempts: NonZero<u32>,

    #[serde(rename = "initial-backoff-ms", deserialize_with = "deserialize_millis")]
    pub initial_backoff: Duration,

    #[serde(rename = "max-backoff-ms", deserialize_with = "deserialize_millis")]
    pub max_backoff: Duration,

    /// Upper bound for a single attempt.
    #[serde(rename = "timeout-ms", deserialize_with = "deserialize_millis")]
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: NonZero::<u32>::MIN.saturating_add(4),
            initial_backoff: Duration::from_millis(250),
            max_backoff: Duration::from_secs(10),
            timeout: Duration::from_secs(30),
        }
    }
}

fn deserialize_millis<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    u64::deserialize(deserializer).map(Duration::from_millis)
}
