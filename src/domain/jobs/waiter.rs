// Copyright 2025 Armada Team.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Bounded polling for an eventually consistent provider.
//!
//! All schedules are a fixed number of attempts at a constant interval. The
//! interval is slept between attempts only, never after the last one.

use crate::infrastructure::constants::{
    INSTANCE_TERMINATION_INTERVAL_SECS, INSTANCE_TERMINATION_MAX_ATTEMPTS,
    LAUNCH_CONFIG_INTERVAL_SECS, LAUNCH_CONFIG_MAX_ATTEMPTS, SECURITY_GROUP_DELETE_INTERVAL_SECS,
    SECURITY_GROUP_DELETE_MAX_ATTEMPTS, VISIBILITY_INTERVAL_SECS, VISIBILITY_MAX_ATTEMPTS,
};
use crate::shared::error::{ProvisionError, Result};
use backon::{ConstantBuilder, Retryable};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSpec {
    max_attempts: u32,
    interval: Duration,
}

impl PollSpec {
    pub fn new(max_attempts: u32, interval: Duration) -> Result<Self> {
        if max_attempts < 1 {
            return Err(ProvisionError::improperly_configured(
                "A poll schedule needs at least one attempt",
            ));
        }
        Ok(Self {
            max_attempts,
            interval,
        })
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Waiting for a create or delete to become visible.
    pub fn visibility() -> Self {
        Self {
            max_attempts: VISIBILITY_MAX_ATTEMPTS,
            interval: Duration::from_secs(VISIBILITY_INTERVAL_SECS),
        }
    }

    /// Retrying a launch configuration whose instance profile is not ready.
    pub fn launch_configuration() -> Self {
        Self {
            max_attempts: LAUNCH_CONFIG_MAX_ATTEMPTS,
            interval: Duration::from_secs(LAUNCH_CONFIG_INTERVAL_SECS),
        }
    }

    pub fn instance_termination() -> Self {
        Self {
            max_attempts: INSTANCE_TERMINATION_MAX_ATTEMPTS,
            interval: Duration::from_secs(INSTANCE_TERMINATION_INTERVAL_SECS),
        }
    }

    pub fn security_group_delete() -> Self {
        Self {
            max_attempts: SECURITY_GROUP_DELETE_MAX_ATTEMPTS,
            interval: Duration::from_secs(SECURITY_GROUP_DELETE_INTERVAL_SECS),
        }
    }

    fn describe(&self, what: &str) -> String {
        format!(
            "{} (gave up after {} attempts at {:?} intervals)",
            what, self.max_attempts, self.interval
        )
    }
}

/// Call `probe` until it yields a value, up to `max_attempts` times.
///
/// A probe error aborts the wait and is returned as is. Exhausting the
/// attempts is [`ProvisionError::WaitTimedOut`].
pub async fn poll_until<T, F, Fut>(spec: PollSpec, what: &str, mut probe: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    for attempt in 1..=spec.max_attempts {
        if let Some(value) = probe().await? {
            return Ok(value);
        }
        debug!(
            "Waiting for {} (attempt {}/{})",
            what, attempt, spec.max_attempts
        );
        if attempt < spec.max_attempts {
            sleep(spec.interval).await;
        }
    }

    Err(ProvisionError::WaitTimedOut(spec.describe(what)))
}

/// [`poll_until`] for a yes/no condition.
pub async fn wait_for<F, Fut>(spec: PollSpec, what: &str, mut condition: F) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    poll_until(spec, what, || {
        let check = condition();
        async move { Ok(check.await?.then_some(())) }
    })
    .await
}

/// Re-issue a mutating call while it fails with a transient error.
///
/// Transient errors are the ones [`ProvisionError::is_retryable`] accepts.
/// When the schedule runs out on a transient error the result is
/// [`ProvisionError::WaitTimedOut`]; any other error is returned at once.
pub async fn retry_transient<T, F, Fut>(spec: PollSpec, what: &str, operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let backoff = ConstantBuilder::default()
        .with_delay(spec.interval)
        .with_max_times(spec.max_attempts.saturating_sub(1) as usize);

    let result = operation
        .retry(backoff)
        .sleep(sleep)
        .when(|err: &ProvisionError| err.is_retryable())
        .notify(|err: &ProvisionError, delay: Duration| {
            warn!("{} failed, retrying in {:?}: {}", what, delay, err);
        })
        .await;

    match result {
        Err(err) if err.is_retryable() => Err(ProvisionError::WaitTimedOut(format!(
            "{}: {}",
            spec.describe(what),
            err
        ))),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::resource::ResourceKind;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn instant(max_attempts: u32) -> PollSpec {
        PollSpec::new(max_attempts, Duration::ZERO).unwrap()
    }

    #[test]
    fn test_poll_spec_requires_an_attempt() {
        assert!(matches!(
            PollSpec::new(0, Duration::from_secs(1)),
            Err(ProvisionError::ImproperlyConfigured(_))
        ));
        assert_eq!(PollSpec::security_group_delete().max_attempts(), 25);
        assert_eq!(
            PollSpec::instance_termination().interval(),
            Duration::from_secs(15)
        );
    }

    #[tokio::test]
    async fn test_poll_until_returns_first_value() {
        let calls = AtomicU32::new(0);
        let value = poll_until(instant(5), "value", || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move { Ok((n == 3).then_some(n)) }
        })
        .await
        .unwrap();
        assert_eq!(value, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_poll_until_times_out_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let err = poll_until(instant(4), "never", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<Option<()>, ProvisionError>(None) }
        })
        .await
        .unwrap_err();
        assert!(matches!(err, ProvisionError::WaitTimedOut(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_poll_error_aborts_the_wait() {
        let calls = AtomicU32::new(0);
        let err = poll_until(instant(10), "broken", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<Option<()>, _>(ProvisionError::PermissionDenied("x".to_string())) }
        })
        .await
        .unwrap_err();
        assert!(matches!(err, ProvisionError::PermissionDenied(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_sleep_after_last_attempt() {
        let spec = PollSpec::new(3, Duration::from_secs(10)).unwrap();
        let started = tokio::time::Instant::now();
        let _ = wait_for(spec, "paused", || async { Ok(false) }).await;
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(20) && elapsed < Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_retry_transient_recovers() {
        let calls = AtomicU32::new(0);
        let value = retry_transient(instant(10), "launch configuration", || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n < 3 {
                    Err(ProvisionError::ResourceNotReady {
                        kind: ResourceKind::LaunchConfiguration,
                        name: "lc".to_string(),
                        message: "Invalid IamInstanceProfile".to_string(),
                    })
                } else {
                    Ok(n)
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(value, 3);
    }

    #[tokio::test]
    async fn test_retry_transient_exhaustion_is_timeout() {
        let calls = AtomicU32::new(0);
        let err = retry_transient(instant(25), "security group", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err::<(), _>(ProvisionError::ResourceHasDependency {
                    kind: ResourceKind::SecurityGroup,
                    name: "sg".to_string(),
                    message: "in use".to_string(),
                })
            }
        })
        .await
        .unwrap_err();
        assert!(matches!(err, ProvisionError::WaitTimedOut(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 25);
    }

    #[tokio::test]
    async fn test_retry_transient_passes_other_errors_through() {
        let calls = AtomicU32::new(0);
        let err = retry_transient(instant(5), "policy", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(ProvisionError::PermissionDenied("x".to_string())) }
        })
        .await
        .unwrap_err();
        assert!(matches!(err, ProvisionError::PermissionDenied(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
