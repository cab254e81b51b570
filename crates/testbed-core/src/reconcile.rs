use crate::lifecycle::{validate_transition, ReconcileState};
use crate::CoreError;
use std::path::Path;
use std::time::Duration;
use testbed_runtime::{ControlPlane, RuntimeError};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileOptions {
    /// Pause before every attempt, including the first.
    pub retry_delay: Duration,
    /// Upper bound for a single apply call. Clamped to what is left of `deadline`.
    pub attempt_timeout: Duration,
    /// Total budget across all waits and attempts.
    pub deadline: Duration,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            retry_delay: Duration::from_secs(5),
            attempt_timeout: Duration::from_secs(15),
            deadline: Duration::from_secs(5 * 60),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    pub attempts: u32,
    pub elapsed: Duration,
    /// Client output from the successful attempt.
    pub output: String,
}

struct Machine {
    state: ReconcileState,
}

impl Machine {
    fn advance(&mut self, next: ReconcileState) -> Result<(), CoreError> {
        validate_transition(self.state, next)?;
        if next.is_terminal() {
            info!("reconcile {} -> {next}", self.state);
        } else {
            debug!("reconcile {} -> {next}", self.state);
        }
        self.state = next;
        Ok(())
    }
}

/// Apply `manifest` through `client` until it succeeds, `opts.deadline`
/// passes, or `cancel` fires.
///
/// `on_failure` sees every failed attempt as it happens. Cancellation wins
/// over everything else and is observed both while waiting and while an
/// attempt is in flight; an in-flight attempt is dropped, not awaited.
pub async fn reconcile<C>(
    client: &C,
    manifest: &Path,
    opts: &ReconcileOptions,
    cancel: &CancellationToken,
    mut on_failure: impl FnMut(u32, &RuntimeError),
) -> Result<ReconcileReport, CoreError>
where
    C: ControlPlane,
{
    let start = Instant::now();
    // None when the deadline lies beyond what `Instant` can represent.
    let deadline_at = start.checked_add(opts.deadline);
    let mut machine = Machine {
        state: ReconcileState::Waiting,
    };
    let mut attempts = 0u32;
    let mut last_error: Option<RuntimeError> = None;

    info!(
        "applying {} via {} (deadline {:?})",
        manifest.display(),
        client.name(),
        opts.deadline
    );

    loop {
        let wake_at = earliest(Instant::now().checked_add(opts.retry_delay), deadline_at);
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                machine.advance(ReconcileState::Aborted)?;
                warn!("reconcile aborted after {attempts} attempts");
                return Err(CoreError::Aborted { attempts });
            }
            () = sleep_until(wake_at) => {}
        }

        let now = Instant::now();
        if deadline_at.is_some_and(|at| now >= at) {
            machine.advance(ReconcileState::TimedOut)?;
            let last_error = last_error.map_or_else(
                || "no attempt completed".to_owned(),
                |e| e.to_string(),
            );
            warn!("reconcile gave up after {attempts} attempts: {last_error}");
            return Err(CoreError::DeadlineExceeded {
                attempts,
                deadline: opts.deadline,
                last_error,
            });
        }

        machine.advance(ReconcileState::Attempting)?;
        attempts += 1;
        let budget = deadline_at.map_or(opts.attempt_timeout, |at| {
            opts.attempt_timeout.min(at - now)
        });

        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                machine.advance(ReconcileState::Aborted)?;
                warn!("reconcile aborted during attempt {attempts}");
                return Err(CoreError::Aborted { attempts });
            }
            r = client.apply(manifest, budget) => r,
        };

        match result {
            Ok(output) => {
                machine.advance(ReconcileState::Succeeded)?;
                let elapsed = start.elapsed();
                info!("applied {} after {attempts} attempts ({elapsed:?})", manifest.display());
                return Ok(ReconcileReport {
                    attempts,
                    elapsed,
                    output,
                });
            }
            Err(e) => {
                warn!("attempt {attempts} failed: {e}");
                on_failure(attempts, &e);
                last_error = Some(e);
                machine.advance(ReconcileState::Waiting)?;
            }
        }
    }
}

fn earliest(a: Option<Instant>, b: Option<Instant>) -> Option<Instant> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

async fn sleep_until(at: Option<Instant>) {
    match at {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}
