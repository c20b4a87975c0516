//! Transactional step runner.
//!
//! Steps execute in insertion order. A failing action rolls back its own
//! step's undo first (a partial failure may already have side effects),
//! then every completed step's undo in reverse order. Undo failures never
//! mask the primary cause; they are joined onto it line by line.

use crate::error::{BrainError, PipelineFailure, Result, UndoError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

// ---------------------------------------------------------------------------
// CancelToken
// ---------------------------------------------------------------------------

/// Cooperative cancellation flag, checked at the top of each step.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// Step / Pipeline
// ---------------------------------------------------------------------------

type Condition<'a, C> = Box<dyn Fn(&C) -> bool + 'a>;
type Action<'a, C> = Box<dyn FnMut(&mut C) -> Result<()> + 'a>;

pub struct Step<'a, C> {
    name: &'static str,
    condition: Option<Condition<'a, C>>,
    action: Action<'a, C>,
    undo: Option<Action<'a, C>>,
}

impl<'a, C> Step<'a, C> {
    pub fn new(
        name: &'static str,
        action: impl FnMut(&mut C) -> Result<()> + 'a,
    ) -> Self {
        Self {
            name,
            condition: None,
            action: Box::new(action),
            undo: None,
        }
    }

    /// Skip this step (and its undo) when the predicate is false.
    pub fn condition(mut self, condition: impl Fn(&C) -> bool + 'a) -> Self {
        self.condition = Some(Box::new(condition));
        self
    }

    pub fn undo(mut self, undo: impl FnMut(&mut C) -> Result<()> + 'a) -> Self {
        self.undo = Some(Box::new(undo));
        self
    }
}

#[derive(Default)]
pub struct Pipeline<'a, C> {
    steps: Vec<Step<'a, C>>,
}

impl<'a, C> Pipeline<'a, C> {
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    pub fn step(mut self, step: Step<'a, C>) -> Self {
        self.steps.push(step);
        self
    }

    /// Run all steps. On failure the failing step's undo and the completed
    /// steps' undos run in reverse order and the aggregate error is
    /// returned. A cancelled step never ran, so only completed steps roll
    /// back in that case.
    pub fn run(mut self, cancel: &CancelToken, ctx: &mut C) -> Result<()> {
        let mut completed: Vec<usize> = Vec::new();
        for index in 0..self.steps.len() {
            let name = self.steps[index].name;
            if cancel.is_cancelled() {
                return Err(self.rollback(name, BrainError::Cancelled, &completed, ctx));
            }
            if let Some(condition) = &self.steps[index].condition {
                if !condition(ctx) {
                    continue;
                }
            }
            match (self.steps[index].action)(ctx) {
                Ok(()) => completed.push(index),
                Err(cause) => {
                    // The action may have failed halfway through its own
                    // writes; its undo participates in the rollback.
                    completed.push(index);
                    return Err(self.rollback(name, cause, &completed, ctx));
                }
            }
        }
        Ok(())
    }

    fn rollback(
        &mut self,
        failed_step: &'static str,
        cause: BrainError,
        completed: &[usize],
        ctx: &mut C,
    ) -> BrainError {
        let mut undo_errors = Vec::new();
        for &index in completed.iter().rev() {
            let step = &mut self.steps[index];
            let Some(undo) = &mut step.undo else {
                continue;
            };
            if let Err(error) = undo(ctx) {
                undo_errors.push(UndoError {
                    step: step.name.to_string(),
                    error,
                });
            }
        }
        BrainError::Pipeline(PipelineFailure {
            step: failed_step.to_string(),
            cause: Box::new(cause),
            undo_errors,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
