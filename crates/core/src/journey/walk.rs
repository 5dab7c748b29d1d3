//! One authentication walk with single-submission discipline.

use std::sync::Arc;

use authtree_common::sync::PendingResult;
use authtree_domain::{AuthError, NextStep, Node, PolicyAdvice, Recovery, Result};
use parking_lot::Mutex;
use tracing::debug;
use url::Url;

use super::service::AuthTreeEngine;

/// Pending outcome of one submission.
pub type PendingStep = PendingResult<NextStep, AuthError>;

#[derive(Debug, Default)]
struct WalkState {
    in_flight: bool,
    terminal: bool,
    /// Node of the submission currently outstanding.
    submitted: Option<Node>,
    /// Node whose submission failed recoverably; cleared once retried.
    retryable: Option<Node>,
    /// The outstanding submission is the one allowed retry.
    retrying: bool,
}

impl WalkState {
    fn begin(&mut self, node: Option<Node>, retrying: bool) -> Result<()> {
        if self.in_flight {
            return Err(AuthError::illegal_state("submission already in flight"));
        }
        if self.terminal {
            return Err(AuthError::illegal_state("authentication walk already finished"));
        }
        self.in_flight = true;
        self.submitted = node;
        self.retrying = retrying;
        Ok(())
    }

    fn finish(&mut self, outcome: &Result<NextStep>) {
        self.in_flight = false;
        let submitted = self.submitted.take();
        let retried = std::mem::take(&mut self.retrying);
        match outcome {
            Ok(NextStep::Continue(_)) => self.retryable = None,
            Ok(NextStep::Success(_)) => {
                self.retryable = None;
                self.terminal = true;
            }
            Err(err) => match err.recovery() {
                Recovery::ResubmitNode | Recovery::Retry if !retried => self.retryable = submitted,
                Recovery::ResubmitNode | Recovery::Retry => self.retryable = None,
                Recovery::RestartTree | Recovery::SignIn | Recovery::Fatal => {
                    self.retryable = None;
                    self.terminal = true;
                }
            },
        }
    }
}

/// Sequences the round trips of one walk.
///
/// Each submission returns a fresh [`PendingStep`]. Submitting while one is
/// outstanding, or after the walk succeeded or failed terminally, is an
/// [`AuthError::IllegalState`]. After a recoverable failure the Node that
/// failed can be sent again, unchanged, once through [`TreeWalk::retry_last`].
/// Start a new `TreeWalk` to begin again.
pub struct TreeWalk {
    engine: Arc<AuthTreeEngine>,
    state: Arc<Mutex<WalkState>>,
}

impl TreeWalk {
    pub fn new(engine: Arc<AuthTreeEngine>) -> Self {
        Self { engine, state: Arc::new(Mutex::new(WalkState::default())) }
    }

    pub fn start(&self, tree: impl Into<String>) -> Result<PendingStep> {
        let tree = tree.into();
        self.submit(None, false, move |engine| async move { engine.start(&tree).await })
    }

    pub fn start_with_advice(&self, advice: PolicyAdvice) -> Result<PendingStep> {
        self.submit(None, false, move |engine| async move {
            engine.start_with_advice(&advice).await
        })
    }

    pub fn resume(&self, resume_uri: Url) -> Result<PendingStep> {
        self.submit(None, false, move |engine| async move { engine.resume(&resume_uri).await })
    }

    /// Submit `node` with whatever the caller filled in.
    pub fn next(&self, node: Node) -> Result<PendingStep> {
        let submitted = node.clone();
        self.submit(Some(submitted), false, move |engine| async move { engine.next(&node).await })
    }

    /// Send the last failed Node again, exactly as it was sent.
    pub fn retry_last(&self) -> Result<PendingStep> {
        let node = {
            let mut state = self.state.lock();
            if state.in_flight {
                return Err(AuthError::illegal_state("submission already in flight"));
            }
            state
                .retryable
                .take()
                .ok_or_else(|| AuthError::illegal_state("no failed node to retry"))?
        };
        debug!(stage = ?node.stage, "retrying last node");
        let submitted = node.clone();
        self.submit(Some(submitted), true, move |engine| async move { engine.next(&node).await })
    }

    pub fn is_in_flight(&self) -> bool {
        self.state.lock().in_flight
    }

    /// True once the walk succeeded or failed in a way that needs a new walk.
    pub fn is_terminal(&self) -> bool {
        self.state.lock().terminal
    }

    pub fn can_retry(&self) -> bool {
        self.state.lock().retryable.is_some()
    }

    fn submit<F, Fut>(&self, node: Option<Node>, retrying: bool, call: F) -> Result<PendingStep>
    where
        F: FnOnce(Arc<AuthTreeEngine>) -> Fut,
        Fut: std::future::Future<Output = Result<NextStep>> + Send + 'static,
    {
        self.state.lock().begin(node, retrying)?;
        let future = call(Arc::clone(&self.engine));
        let state = Arc::clone(&self.state);
        Ok(PendingResult::spawn(
            async move {
                let outcome = future.await;
                state.lock().finish(&outcome);
                outcome
            },
            || AuthError::Cancelled,
        ))
    }
}
