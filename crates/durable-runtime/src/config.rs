use crate::backoff::BackoffPolicy;

pub const SUPPORTED_PROTOCOL_VERSION: u16 = 1;

/// Runtime-wide configuration, one instance shared by every `Machine`.
///
/// Grounded on `invariant-engine::engine::EngineConfig`'s fluent builder
/// idiom (`epoch_interval_ms` there, `side_effect_backoff` here).
#[derive(Clone, Debug, PartialEq)]
pub struct RuntimeConfig {
    protocol_version: u16,
    side_effect_backoff: BackoffPolicy,
}

impl RuntimeConfig {
    pub fn protocol_version(&self) -> u16 {
        self.protocol_version
    }

    pub fn side_effect_backoff(&self) -> BackoffPolicy {
        self.side_effect_backoff
    }

    pub fn with_side_effect_backoff(mut self, policy: BackoffPolicy) -> Self {
        self.side_effect_backoff = policy;
        self
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            protocol_version: SUPPORTED_PROTOCOL_VERSION,
            side_effect_backoff: BackoffPolicy::default(),
        }
    }
}
