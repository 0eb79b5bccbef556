//! Waiting for a deployment to settle.
//!
//! Each status fetch is classified into a [`Poll`], and a [`Watcher`] turns
//! that into the next [`Step`]: sleep and poll again, finish with the active
//! deployment, or give up. Consecutive fetch failures are tolerated up to
//! [`WaitPolicy::max_failures`]; a failed or canceled deployment is final.
//!
//! There is no overall deadline. A deployment that never leaves an
//! in-progress phase is polled until the process is interrupted.

use std::future::Future;
use std::io::Write;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::api_client::ApiClient;
use crate::errors::{ApiError, ApiResult};
use crate::models::{Deployment, DeploymentPhase};

/// Consecutive failed status fetches tolerated before giving up
pub const MAX_API_FAILURES: u32 = 3;

#[derive(Debug, Clone)]
pub struct WaitPolicy {
    pub max_failures: u32,
    /// Delay after a failed fetch or an empty answer
    pub retry_delay: Duration,
    /// Delay while the deployment is building or deploying
    pub in_progress_delay: Duration,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            max_failures: MAX_API_FAILURES,
            retry_delay: Duration::from_secs(1),
            in_progress_delay: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Error)]
pub enum WaitError {
    #[error("{source}")]
    Api {
        #[source]
        source: ApiError,
        last: Option<Box<Deployment>>,
    },
    #[error("phase: [{}]", .0.phase)]
    Failed(Box<Deployment>),
    #[error("Unknown phase: [{}]", .0.phase)]
    UnknownPhase(Box<Deployment>),
}

impl WaitError {
    /// The last deployment state seen before giving up, if any
    pub fn deployment(&self) -> Option<&Deployment> {
        match self {
            WaitError::Api { last, .. } => last.as_deref(),
            WaitError::Failed(d) | WaitError::UnknownPhase(d) => Some(d),
        }
    }
}

/// Outcome of a single status fetch
#[derive(Debug)]
pub enum Poll {
    Found(Deployment),
    Missing,
    Failed(ApiError),
}

impl From<ApiResult<Option<Deployment>>> for Poll {
    fn from(result: ApiResult<Option<Deployment>>) -> Self {
        match result {
            Ok(Some(deployment)) => Poll::Found(deployment),
            Ok(None) => Poll::Missing,
            Err(e) => Poll::Failed(e),
        }
    }
}

#[derive(Debug)]
pub enum Step {
    Retry(Duration),
    Done(Deployment),
    Abort(WaitError),
}

pub struct Watcher {
    policy: WaitPolicy,
    failures: u32,
    /// Latest in-progress state, reported if polling gives up
    last: Option<Deployment>,
}

impl Watcher {
    pub fn new(policy: WaitPolicy) -> Self {
        Self {
            policy,
            failures: 0,
            last: None,
        }
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn advance(&mut self, poll: Poll) -> Step {
        let deployment = match poll {
            Poll::Failed(err) => {
                self.failures += 1;
                if self.failures >= self.policy.max_failures {
                    return Step::Abort(WaitError::Api {
                        source: err,
                        last: self.last.take().map(Box::new),
                    });
                }
                warn!(
                    "Deployment status check failed ({}/{}): {}",
                    self.failures, self.policy.max_failures, err
                );
                return Step::Retry(self.policy.retry_delay);
            }
            Poll::Missing => {
                self.failures = 0;
                return Step::Retry(self.policy.retry_delay);
            }
            Poll::Found(deployment) => {
                self.failures = 0;
                deployment
            }
        };

        if deployment.phase.is_in_progress() {
            self.last = Some(deployment);
            return Step::Retry(self.policy.in_progress_delay);
        }

        match deployment.phase {
            DeploymentPhase::Active => Step::Done(deployment),
            DeploymentPhase::Error | DeploymentPhase::Canceled | DeploymentPhase::Unknown => {
                Step::Abort(WaitError::Failed(Box::new(deployment)))
            }
            _ => Step::Abort(WaitError::UnknownPhase(Box::new(deployment))),
        }
    }
}

/// A line of progress markers. The line is terminated when the guard is
/// dropped, provided at least one marker was written.
pub struct ProgressLine<'a, W: Write> {
    out: &'a mut W,
    marked: bool,
}

impl<'a, W: Write> ProgressLine<'a, W> {
    pub fn new(out: &'a mut W) -> Self {
        Self { out, marked: false }
    }

    pub fn tick(&mut self) {
        let _ = write!(self.out, ".");
        let _ = self.out.flush();
        self.marked = true;
    }
}

impl<W: Write> Drop for ProgressLine<'_, W> {
    fn drop(&mut self) {
        if self.marked {
            let _ = writeln!(self.out);
        }
    }
}

/// Where deployment status comes from
#[allow(async_fn_in_trait)]
pub trait DeploymentSource {
    async fn fetch_deployment(
        &self,
        app_id: &str,
        deployment_id: &str,
    ) -> ApiResult<Option<Deployment>>;
}

impl DeploymentSource for ApiClient {
    async fn fetch_deployment(
        &self,
        app_id: &str,
        deployment_id: &str,
    ) -> ApiResult<Option<Deployment>> {
        self.get_deployment(app_id, deployment_id).await
    }
}

/// Poll a deployment until it is active, writing a `.` to `progress` for
/// every poll after the first
pub async fn wait_for_deployment<D, W, S, F>(
    source: &D,
    app_id: &str,
    deployment_id: &str,
    policy: WaitPolicy,
    progress: &mut W,
    sleep_fn: S,
) -> Result<Deployment, WaitError>
where
    D: DeploymentSource,
    W: Write,
    S: Fn(Duration) -> F,
    F: Future<Output = ()>,
{
    let mut watcher = Watcher::new(policy);
    let mut line = ProgressLine::new(progress);

    loop {
        let poll = Poll::from(source.fetch_deployment(app_id, deployment_id).await);
        if let Poll::Found(d) = &poll {
            debug!("Deployment {} is {}", d.id, d.phase);
        }

        match watcher.advance(poll) {
            Step::Retry(delay) => {
                sleep_fn(delay).await;
                line.tick();
            }
            Step::Done(deployment) => {
                info!("Deployment {} is active", deployment.id);
                return Ok(deployment);
            }
            Step::Abort(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    struct Script {
        polls: RefCell<VecDeque<ApiResult<Option<Deployment>>>>,
        calls: RefCell<usize>,
    }

    impl Script {
        fn new(polls: Vec<ApiResult<Option<Deployment>>>) -> Self {
            Self {
                polls: RefCell::new(polls.into()),
                calls: RefCell::new(0),
            }
        }

        fn calls(&self) -> usize {
            *self.calls.borrow()
        }
    }

    impl DeploymentSource for Script {
        async fn fetch_deployment(
            &self,
            app_id: &str,
            deployment_id: &str,
        ) -> ApiResult<Option<Deployment>> {
            assert_eq!(app_id, "app-1");
            assert_eq!(deployment_id, "dep-1");
            *self.calls.borrow_mut() += 1;
            self.polls
                .borrow_mut()
                .pop_front()
                .expect("fetched after the script ended")
        }
    }

    fn deployment(phase: &str) -> ApiResult<Option<Deployment>> {
        Ok(Some(Deployment {
            id: "dep-1".to_string(),
            spec: None,
            phase: DeploymentPhase::from(phase.to_string()),
            cause: "manual".to_string(),
            progress: None,
            created_at: None,
            updated_at: None,
        }))
    }

    fn api_error() -> ApiResult<Option<Deployment>> {
        Err(ApiError::Status {
            method: "GET".to_string(),
            url: "http://api/v2/apps/app-1/deployments/dep-1".to_string(),
            status: 503,
            message: "service unavailable".to_string(),
        })
    }

    async fn run(script: &Script) -> (Result<Deployment, WaitError>, Vec<Duration>, String) {
        let sleeps = RefCell::new(Vec::new());
        let mut progress = Vec::new();
        let result = wait_for_deployment(
            script,
            "app-1",
            "dep-1",
            WaitPolicy::default(),
            &mut progress,
            |d| {
                sleeps.borrow_mut().push(d);
                std::future::ready(())
            },
        )
        .await;
        (result, sleeps.into_inner(), String::from_utf8(progress).unwrap())
    }

    #[tokio::test]
    async fn test_waits_until_active() {
        let script = Script::new(vec![
            deployment("PENDING_BUILD"),
            deployment("BUILDING"),
            deployment("DEPLOYING"),
            deployment("ACTIVE"),
        ]);

        let (result, sleeps, progress) = run(&script).await;

        let deployment = result.unwrap();
        assert_eq!(deployment.phase, DeploymentPhase::Active);
        assert_eq!(sleeps, vec![Duration::from_secs(5); 3]);
        assert_eq!(script.calls(), 4);
        assert_eq!(progress, "...\n");
    }

    #[tokio::test]
    async fn test_active_on_first_poll_prints_nothing() {
        let script = Script::new(vec![deployment("ACTIVE")]);

        let (result, sleeps, progress) = run(&script).await;

        assert!(result.is_ok());
        assert!(sleeps.is_empty());
        assert_eq!(progress, "");
    }

    #[tokio::test]
    async fn test_terminal_failure_phases_are_not_retried() {
        for phase in ["ERROR", "CANCELED", "UNKNOWN"] {
            let script = Script::new(vec![deployment("DEPLOYING"), deployment(phase)]);

            let (result, sleeps, progress) = run(&script).await;

            let err = result.unwrap_err();
            assert!(matches!(err, WaitError::Failed(_)), "{}", phase);
            assert_eq!(err.to_string(), format!("phase: [{}]", phase));
            assert_eq!(err.deployment().unwrap().phase.as_str(), phase);
            assert_eq!(script.calls(), 2);
            assert_eq!(sleeps.len(), 1);
            assert_eq!(progress, ".\n");
        }
    }

    #[tokio::test]
    async fn test_unrecognized_phase_is_an_error() {
        let script = Script::new(vec![deployment("SUPERSEDED")]);

        let (result, _, _) = run(&script).await;

        let err = result.unwrap_err();
        assert!(matches!(err, WaitError::UnknownPhase(_)));
        assert_eq!(err.to_string(), "Unknown phase: [SUPERSEDED]");

        let script = Script::new(vec![deployment("")]);
        let (result, _, _) = run(&script).await;
        assert_eq!(result.unwrap_err().to_string(), "Unknown phase: []");
    }

    #[tokio::test]
    async fn test_transient_failures_below_budget_are_tolerated() {
        let script = Script::new(vec![
            api_error(),
            api_error(),
            deployment("BUILDING"),
            api_error(),
            api_error(),
            deployment("ACTIVE"),
        ]);

        let (result, sleeps, progress) = run(&script).await;

        assert!(result.is_ok());
        assert_eq!(
            sleeps,
            vec![
                Duration::from_secs(1),
                Duration::from_secs(1),
                Duration::from_secs(5),
                Duration::from_secs(1),
                Duration::from_secs(1),
            ]
        );
        assert_eq!(script.calls(), 6);
        assert_eq!(progress, ".....\n");
    }

    #[tokio::test]
    async fn test_gives_up_after_max_consecutive_failures() {
        let script = Script::new(vec![deployment("BUILDING"), api_error(), api_error(), api_error()]);

        let (result, _, progress) = run(&script).await;

        let err = result.unwrap_err();
        assert!(matches!(err, WaitError::Api { .. }));
        assert_eq!(err.deployment().unwrap().phase, DeploymentPhase::Building);
        assert!(err.to_string().contains("service unavailable"));
        assert_eq!(script.calls(), 4);
        assert_eq!(progress, "...\n");
    }

    #[tokio::test]
    async fn test_gives_up_without_any_known_state() {
        let script = Script::new(vec![api_error(), api_error(), api_error()]);

        let (result, _, _) = run(&script).await;

        let err = result.unwrap_err();
        assert!(matches!(err, WaitError::Api { .. }));
        assert!(err.deployment().is_none());
        assert_eq!(script.calls(), 3);
    }

    #[tokio::test]
    async fn test_missing_deployment_retries_quickly() {
        let script = Script::new(vec![Ok(None), Ok(None), deployment("ACTIVE")]);

        let (result, sleeps, _) = run(&script).await;

        assert!(result.is_ok());
        assert_eq!(sleeps, vec![Duration::from_secs(1); 2]);
    }

    #[test]
    fn test_success_resets_failure_count() {
        let mut watcher = Watcher::new(WaitPolicy::default());

        assert!(matches!(watcher.advance(Poll::from(api_error())), Step::Retry(_)));
        assert!(matches!(watcher.advance(Poll::from(api_error())), Step::Retry(_)));
        assert_eq!(watcher.failures(), 2);

        assert!(matches!(
            watcher.advance(Poll::from(deployment("PENDING_DEPLOY"))),
            Step::Retry(d) if d == Duration::from_secs(5)
        ));
        assert_eq!(watcher.failures(), 0);
    }

    #[test]
    fn test_missing_does_not_consume_failure_budget() {
        let mut watcher = Watcher::new(WaitPolicy::default());

        for _ in 0..10 {
            assert!(matches!(
                watcher.advance(Poll::Missing),
                Step::Retry(d) if d == Duration::from_secs(1)
            ));
        }
        assert_eq!(watcher.failures(), 0);
    }

    #[test]
    fn test_progress_line_terminates_once() {
        let mut out = Vec::new();
        {
            let mut line = ProgressLine::new(&mut out);
            line.tick();
            line.tick();
        }
        assert_eq!(out, b"..\n");

        let mut out = Vec::new();
        drop(ProgressLine::new(&mut out));
        assert!(out.is_empty());
    }
}
