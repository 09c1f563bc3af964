// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Staged execution of configuration changes.
//!
//! A [`Transaction`] owns one ordered queue of [`Step`]s per [`Stage`].
//! Steps are queued up front by the operations taking part in the
//! transaction and drained stage by stage when it runs:
//!
//! ```text
//! Model   -> configuration-only work
//! Runtime -> child resources (never see services installed by parents)
//! Install -> deferred installs, after every Runtime step
//! ```
//!
//! Steps never queue further steps. A failing step rolls the whole
//! transaction back: pending steps are discarded and compensations
//! registered by already-executed steps run in reverse order.

use crate::error::{ProfileError, Result};
use crate::registry::ServiceRegistry;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

/// Execution stage, in run order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Model,
    Runtime,
    Install,
}

impl Stage {
    /// All stages in execution order.
    pub const ALL: [Stage; 3] = [Stage::Model, Stage::Runtime, Stage::Install];

    fn index(self) -> usize {
        match self {
            Stage::Model => 0,
            Stage::Runtime => 1,
            Stage::Install => 2,
        }
    }
}

/// One unit of staged work.
pub trait Step: Send {
    /// Short description for logs.
    fn describe(&self) -> String;

    /// Run the step.
    fn execute(self: Box<Self>, ctx: &mut StepContext<'_>) -> Result<()>;

    /// Called instead of `execute` when the transaction is rolled back
    /// before the step ran.
    fn discard(self: Box<Self>) {}
}

/// Closure-backed [`Step`].
pub struct FnStep<F> {
    description: String,
    action: F,
}

impl<F> Step for FnStep<F>
where
    F: FnOnce(&mut StepContext<'_>) -> Result<()> + Send,
{
    fn describe(&self) -> String {
        self.description.clone()
    }

    fn execute(self: Box<Self>, ctx: &mut StepContext<'_>) -> Result<()> {
        (self.action)(ctx)
    }
}

/// Wrap a closure as a boxed step.
pub fn step<F>(description: impl Into<String>, action: F) -> Box<dyn Step>
where
    F: FnOnce(&mut StepContext<'_>) -> Result<()> + Send + 'static,
{
    Box::new(FnStep {
        description: description.into(),
        action,
    })
}

type Compensation = Box<dyn FnOnce(&ServiceRegistry) + Send>;

/// What a running step can see.
pub struct StepContext<'a> {
    registry: &'a ServiceRegistry,
    stage: Stage,
    compensations: &'a mut Vec<Compensation>,
}

impl StepContext<'_> {
    /// Registry the transaction installs into.
    pub fn registry(&self) -> &ServiceRegistry {
        self.registry
    }

    /// Stage currently executing.
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Register an undo action, run if the transaction is rolled back after
    /// this step completed.
    pub fn on_rollback<F>(&mut self, compensation: F)
    where
        F: FnOnce(&ServiceRegistry) + Send + 'static,
    {
        self.compensations.push(Box::new(compensation));
    }
}

/// Transaction lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// Accepting steps.
    Open,
    /// Every step ran; awaiting commit or rollback.
    Settled,
    Committed,
    RolledBack,
}

/// A single configuration transaction.
pub struct Transaction {
    registry: Arc<ServiceRegistry>,
    queues: [VecDeque<Box<dyn Step>>; 3],
    compensations: Vec<Compensation>,
    reserved: HashSet<String>,
    state: TransactionState,
}

impl Transaction {
    /// Open a transaction against `registry`.
    pub fn new(registry: Arc<ServiceRegistry>) -> Self {
        Self {
            registry,
            queues: Default::default(),
            compensations: Vec::new(),
            reserved: HashSet::new(),
            state: TransactionState::Open,
        }
    }

    /// Current state.
    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Registry this transaction installs into.
    pub fn registry(&self) -> &Arc<ServiceRegistry> {
        &self.registry
    }

    /// Number of steps still queued.
    pub fn pending(&self) -> usize {
        self.queues.iter().map(VecDeque::len).sum()
    }

    /// Queue a step at the end of `stage`.
    pub fn add_step(&mut self, stage: Stage, step: Box<dyn Step>) -> Result<()> {
        if self.state != TransactionState::Open {
            return Err(ProfileError::TransactionClosed);
        }
        tracing::debug!("Queued {:?} step: {}", stage, step.describe());
        self.queues[stage.index()].push_back(step);
        Ok(())
    }

    /// Claim a key for the lifetime of the transaction.
    ///
    /// Returns false if it was already claimed. Used to reject two
    /// operations on the same resource inside one transaction.
    pub fn reserve(&mut self, key: impl Into<String>) -> bool {
        self.reserved.insert(key.into())
    }

    /// Run every queued step, stage by stage.
    ///
    /// On failure the transaction is rolled back and the step error returned.
    pub fn run(&mut self) -> Result<()> {
        if self.state != TransactionState::Open {
            return Err(ProfileError::TransactionClosed);
        }

        for stage in Stage::ALL {
            while let Some(step) = self.queues[stage.index()].pop_front() {
                let description = step.describe();
                let mut ctx = StepContext {
                    registry: &self.registry,
                    stage,
                    compensations: &mut self.compensations,
                };
                if let Err(err) = step.execute(&mut ctx) {
                    tracing::warn!("{:?} step '{}' failed: {}", stage, description, err);
                    self.roll_back();
                    return Err(err);
                }
                tracing::debug!("{:?} step '{}' completed", stage, description);
            }
        }

        self.state = TransactionState::Settled;
        Ok(())
    }

    /// Run remaining steps (if any) and commit.
    pub fn commit(mut self) -> Result<()> {
        if self.state == TransactionState::Open {
            self.run()?;
        }
        if self.state != TransactionState::Settled {
            return Err(ProfileError::TransactionClosed);
        }
        self.compensations.clear();
        self.state = TransactionState::Committed;
        Ok(())
    }

    /// Abandon the transaction.
    ///
    /// Queued steps never run; completed steps are compensated.
    pub fn rollback(mut self) {
        self.roll_back();
    }

    fn roll_back(&mut self) {
        if matches!(
            self.state,
            TransactionState::Committed | TransactionState::RolledBack
        ) {
            return;
        }

        let discarded = self.pending();
        for queue in &mut self.queues {
            for step in queue.drain(..) {
                step.discard();
            }
        }
        while let Some(compensate) = self.compensations.pop() {
            compensate(&self.registry);
        }
        self.state = TransactionState::RolledBack;
        tracing::warn!("Transaction rolled back ({} pending steps discarded)", discarded);
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        // Dropping an unfinished transaction is a rollback.
        self.roll_back();
    }
}
