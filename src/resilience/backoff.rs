//! Backoff delay policies.
//!
//! A [`BackoffPolicy`] names the curve; a [`Backoff`] is the per-request state
//! that walks it. Randomized policies draw from a generator owned by the
//! `Backoff` and seeded from the request's correlation id, so concurrent
//! requests never share a random source and a given id replays its sequence.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::validation::{validate_retry_options, ValidationError};
use crate::config::{ConfigError, RetryOptions};

/// Retry ceiling of [`BackoffPolicy::SimpleExponentialJitter`].
pub const SIMPLE_JITTER_MAX_RETRIES: u32 = 5;

/// HTTP status that makes [`BackoffPolicy::ServerDirected`] honour the peer's hint.
const TOO_MANY_REQUESTS: u16 = 429;

// Shape constants of the decorrelated jitter V2 curve.
const P_FACTOR: f64 = 4.0;
const RP_SCALING_FACTOR: f64 = 1.0 / 1.4;

/// Immutable retry configuration shared by every attempt of one logical request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    min_delay: Duration,
    max_delay: Duration,
    max_attempts: u32,
    jitter_low: Duration,
    jitter_high: Duration,
}

impl RetryConfig {
    /// Build a configuration, rejecting `max_delay < min_delay` and
    /// `jitter_high < jitter_low`.
    pub fn new(
        min_delay: Duration,
        max_delay: Duration,
        max_attempts: u32,
        jitter_low: Duration,
        jitter_high: Duration,
    ) -> Result<Self, ConfigError> {
        let mut errors = Vec::new();
        if max_delay < min_delay {
            errors.push(ValidationError::DelayRange {
                min: min_delay.as_millis() as u64,
                max: max_delay.as_millis() as u64,
            });
        }
        if jitter_high < jitter_low {
            errors.push(ValidationError::JitterRange {
                start: jitter_low.as_millis() as u64,
                end: jitter_high.as_millis() as u64,
            });
        }
        if !errors.is_empty() {
            return Err(ConfigError::Validation(errors));
        }

        Ok(Self {
            min_delay,
            max_delay,
            max_attempts,
            jitter_low,
            jitter_high,
        })
    }

    pub fn min_delay(&self) -> Duration {
        self.min_delay
    }

    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    /// Maximum number of retries after the first attempt.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn jitter(&self) -> (Duration, Duration) {
        (self.jitter_low, self.jitter_high)
    }
}

impl TryFrom<&RetryOptions> for RetryConfig {
    type Error = ConfigError;

    fn try_from(options: &RetryOptions) -> Result<Self, Self::Error> {
        validate_retry_options(options).map_err(ConfigError::Validation)?;
        Self::new(
            Duration::from_millis(options.min_delay_is_ms),
            Duration::from_millis(options.max_delay_is_ms),
            options.max_retry,
            Duration::from_millis(options.jitter_start),
            Duration::from_millis(options.jitter_end),
        )
    }
}

/// Server-provided metadata a result can expose to the backoff policy.
pub trait ServerHint {
    /// HTTP-style status of the result, if it has one.
    fn status(&self) -> Option<u16> {
        None
    }

    /// Wait requested by the peer (e.g. a parsed `Retry-After` header).
    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

/// Backoff curves available to the retry client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackoffPolicy {
    /// `min_delay` on every attempt.
    Constant,
    /// `min_delay * i`.
    Linear,
    /// `min_delay * 2^(i-1)`.
    Exponential,
    /// `2^(i-1)` seconds plus uniform jitter, at most five retries.
    #[serde(rename = "exponential-jitter")]
    SimpleExponentialJitter,
    /// Whatever the last 429 response asked for through `Retry-After`.
    #[serde(rename = "retry-after")]
    ServerDirected,
    /// AWS-style: `uniform(min, min(max, previous * 3))`.
    DecorrelatedJitter,
    /// Exponential curve with bounded per-step jitter, anchored at `min_delay`.
    #[serde(rename = "decorrelated-jitter-v2")]
    DecorrelatedJitterV2,
}

impl BackoffPolicy {
    /// Every policy, in menu order.
    pub const ALL: [BackoffPolicy; 7] = [
        BackoffPolicy::Constant,
        BackoffPolicy::Linear,
        BackoffPolicy::Exponential,
        BackoffPolicy::SimpleExponentialJitter,
        BackoffPolicy::ServerDirected,
        BackoffPolicy::DecorrelatedJitter,
        BackoffPolicy::DecorrelatedJitterV2,
    ];

    /// Stable kebab-case name, used in config, CLI and metric labels.
    pub fn name(&self) -> &'static str {
        match self {
            BackoffPolicy::Constant => "constant",
            BackoffPolicy::Linear => "linear",
            BackoffPolicy::Exponential => "exponential",
            BackoffPolicy::SimpleExponentialJitter => "exponential-jitter",
            BackoffPolicy::ServerDirected => "retry-after",
            BackoffPolicy::DecorrelatedJitter => "decorrelated-jitter",
            BackoffPolicy::DecorrelatedJitterV2 => "decorrelated-jitter-v2",
        }
    }

    /// One-line description with a sample delay sequence.
    pub fn describe(&self) -> &'static str {
        match self {
            BackoffPolicy::Constant => "Constant backoff (e.g. 1s, 1s, 1s)",
            BackoffPolicy::Linear => "Linear backoff (e.g. 1s, 2s, 3s)",
            BackoffPolicy::Exponential => "Exponential backoff (e.g. 1s, 2s, 4s, 8s)",
            BackoffPolicy::SimpleExponentialJitter => {
                "Simple exponential jitter backoff (e.g. 1.123s, 2.456s, 4.768s, 8.125s)"
            }
            BackoffPolicy::ServerDirected => "Retry-After backoff (e.g. 5s, 5s, 5s)",
            BackoffPolicy::DecorrelatedJitter => {
                "AWS decorrelated jitter backoff (e.g. 1s, 2.456s, 2.768s, 4.125s)"
            }
            BackoffPolicy::DecorrelatedJitterV2 => {
                "Decorrelated jitter backoff V2 (e.g. 1.555s, 2.223s, 2.123s, 3.233s)"
            }
        }
    }

    /// Number of retries allowed after the first attempt.
    pub fn retry_limit(&self, config: &RetryConfig) -> u32 {
        match self {
            BackoffPolicy::SimpleExponentialJitter => SIMPLE_JITTER_MAX_RETRIES,
            _ => config.max_attempts,
        }
    }
}

impl fmt::Display for BackoffPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned when a policy name or menu number is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown backoff policy {0:?}, expected 1-7 or one of: constant, linear, exponential, exponential-jitter, retry-after, decorrelated-jitter, decorrelated-jitter-v2")]
pub struct UnknownPolicy(pub String);

impl FromStr for BackoffPolicy {
    type Err = UnknownPolicy;

    /// Accepts the menu number (`"1"`..`"7"`) or the policy name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(index) = s.parse::<usize>() {
            return index
                .checked_sub(1)
                .and_then(|i| Self::ALL.get(i).copied())
                .ok_or_else(|| UnknownPolicy(s.to_string()));
        }
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownPolicy(s.to_string()))
    }
}

/// Per-request backoff state.
///
/// Delays must be requested in attempt order: the decorrelated policies derive
/// each delay from the one before it.
#[derive(Debug)]
pub struct Backoff {
    policy: BackoffPolicy,
    config: Arc<RetryConfig>,
    rng: StdRng,
    previous: Option<Duration>,
    curve: f64,
}

impl Backoff {
    pub fn new(policy: BackoffPolicy, config: Arc<RetryConfig>, seed: u64) -> Self {
        Self {
            policy,
            config,
            rng: StdRng::seed_from_u64(seed),
            previous: None,
            curve: 0.0,
        }
    }

    /// Delay to wait after attempt `attempt` (1-based) before the next one.
    ///
    /// `hint` is the result that triggered the retry, if one was obtained.
    pub fn next_delay(&mut self, attempt: u32, hint: Option<&dyn ServerHint>) -> Duration {
        let attempt = attempt.max(1);
        let min = self.config.min_delay;
        let max = self.config.max_delay;

        let delay = match self.policy {
            BackoffPolicy::Constant => min.min(max),
            BackoffPolicy::Linear => min.saturating_mul(attempt).min(max),
            BackoffPolicy::Exponential => min
                .saturating_mul(2u32.saturating_pow(attempt - 1))
                .min(max),
            BackoffPolicy::SimpleExponentialJitter => {
                let base = Duration::from_secs(1).saturating_mul(2u32.saturating_pow(attempt - 1));
                let (low, high) = self.config.jitter();
                base.saturating_add(uniform(&mut self.rng, low, high))
            }
            BackoffPolicy::ServerDirected => match hint {
                Some(h) if h.status() == Some(TOO_MANY_REQUESTS) => {
                    h.retry_after().unwrap_or(Duration::ZERO)
                }
                _ => Duration::ZERO,
            },
            BackoffPolicy::DecorrelatedJitter => match self.previous {
                None => min.min(max),
                Some(previous) => {
                    let ceiling = previous.saturating_mul(3).min(max);
                    uniform(&mut self.rng, min, ceiling.max(min)).min(max)
                }
            },
            BackoffPolicy::DecorrelatedJitterV2 => {
                let t = f64::from(attempt - 1) + self.rng.gen::<f64>();
                let next = 2f64.powf(t) * (P_FACTOR * t).sqrt().tanh();
                let step = next - self.curve;
                self.curve = next;

                // 2^t overflows past t = 1024; the curve has long passed max_delay by then.
                if step.is_nan() || self.curve.is_infinite() {
                    max
                } else {
                    let secs = (step.max(0.0) * RP_SCALING_FACTOR * min.as_secs_f64())
                        .min(max.as_secs_f64());
                    Duration::from_secs_f64(secs.max(0.0)).min(max)
                }
            }
        };

        self.previous = Some(delay);
        delay
    }
}

/// Uniform sample in `[low, high]` at nanosecond resolution.
fn uniform(rng: &mut StdRng, low: Duration, high: Duration) -> Duration {
    let low_ns = u64::try_from(low.as_nanos()).unwrap_or(u64::MAX);
    let high_ns = u64::try_from(high.as_nanos()).unwrap_or(u64::MAX);
    if high_ns <= low_ns {
        return low;
    }
    Duration::from_nanos(rng.gen_range(low_ns..=high_ns))
}
