//! The reordering engine: one entry point wiring gestures to persistence.

use crate::command::{CommandBuilder, ReorderCommand, ReorderPolicy};
use crate::config::ReorderConfig;
use crate::error::{ReorderError, Result};
use crate::geometry::{Axis, Point};
use crate::keyboard::{resolve_move, MoveTarget};
use crate::reconcile::{
    self, Reconciler, Reconciliation, ReorderStore, Submission, SubmissionResult,
};
use crate::resolver::{BoardLayout, DropPosition};
use crate::session::{
    CancelReason, DragController, DragListener, DragOutcome, DragPhase, DragSession,
};
use crate::types::{Board, Item, ItemId};
use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

/// Result of releasing a drag
#[derive(Debug)]
pub struct DropReport {
    pub outcome: DragOutcome,
    /// Commands applied to the board, empty for no-ops and cancellations
    pub commands: Vec<ReorderCommand>,
    /// Why a resolved drop was turned into a cancellation
    pub error: Option<ReorderError>,
}

impl DropReport {
    fn unchanged(outcome: DragOutcome) -> Self {
        Self {
            outcome,
            commands: Vec::new(),
            error: None,
        }
    }
}

/// Drag controller, command builder and reconciler behind one API.
///
/// All state changes are synchronous. Submissions queue up as commands are
/// applied; callers drain them with [`take_submissions`](Self::take_submissions)
/// and feed each store response back through [`reconcile`](Self::reconcile),
/// or let [`flush`](Self::flush) do both.
pub struct ReorderEngine {
    store: Arc<dyn ReorderStore>,
    builder: CommandBuilder,
    controller: DragController,
    reconciler: Reconciler,
    axis: Axis,
    queue: VecDeque<Submission>,
}

impl fmt::Debug for ReorderEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReorderEngine")
            .field("builder", &self.builder)
            .field("controller", &self.controller)
            .field("axis", &self.axis)
            .field("queued", &self.queue.len())
            .finish_non_exhaustive()
    }
}

impl ReorderEngine {
    /// Engine with default configuration
    pub fn new(board: Board, store: Arc<dyn ReorderStore>) -> Self {
        Self::with_config(board, store, &ReorderConfig::default())
    }

    pub fn with_config(
        board: Board,
        store: Arc<dyn ReorderStore>,
        config: &ReorderConfig,
    ) -> Self {
        let key_space = config.key_space();
        Self {
            store,
            builder: CommandBuilder::new(key_space),
            controller: DragController::new(),
            reconciler: Reconciler::new(board, key_space),
            axis: config.axis,
            queue: VecDeque::new(),
        }
    }

    pub fn with_policy(mut self, policy: Arc<dyn ReorderPolicy>) -> Self {
        self.builder = self.builder.with_policy(policy);
        self
    }

    pub fn add_listener(&mut self, listener: Arc<dyn DragListener>) {
        self.controller.add_listener(listener);
    }

    /// Empty layout using the configured axis, for the UI to fill in
    pub fn layout(&self) -> BoardLayout {
        BoardLayout::new(self.axis)
    }

    pub fn drag_start(&mut self, item_id: &ItemId, pointer: Point) -> Result<&DragSession> {
        self.controller
            .start(self.reconciler.board(), item_id, pointer)
    }

    pub fn drag_move(
        &mut self,
        layout: &BoardLayout,
        pointer: Point,
    ) -> Result<Option<&DropPosition>> {
        self.controller.update(layout, pointer)
    }

    /// Release the pointer.
    ///
    /// The session always ends here. A resolved drop that the builder
    /// refuses becomes a cancellation and leaves the board untouched.
    pub fn drop(&mut self, layout: &BoardLayout, pointer: Point) -> Result<DropReport> {
        let outcome = self.controller.release(layout, pointer)?;
        let DragOutcome::Dropped { session, drop } = &outcome else {
            return Ok(DropReport::unchanged(outcome));
        };

        let applied = self
            .builder
            .build(self.reconciler.board(), &session.dragged_item_id, drop)
            .and_then(|commands| {
                let submissions = self.reconciler.apply(commands.clone())?;
                Ok((commands, submissions))
            });
        match applied {
            Ok((commands, submissions)) => {
                debug!(commands = commands.len(), "drop applied");
                self.queue.extend(submissions);
                Ok(DropReport {
                    outcome,
                    commands,
                    error: None,
                })
            }
            Err(error) => {
                let reason = match error {
                    ReorderError::PermissionDenied { .. } => CancelReason::PermissionDenied,
                    _ => CancelReason::Rejected,
                };
                warn!(item_id = %session.dragged_item_id, %error, "drop cancelled");
                Ok(DropReport {
                    outcome: outcome.into_cancelled(reason),
                    commands: Vec::new(),
                    error: Some(error),
                })
            }
        }
    }

    pub fn cancel(&mut self) -> Result<DragOutcome> {
        self.controller.cancel()
    }

    /// Move an item without a pointer. Boundary moves and moves to the
    /// current slot return no commands.
    pub fn move_item(
        &mut self,
        item_id: &ItemId,
        target: &MoveTarget,
    ) -> Result<Vec<ReorderCommand>> {
        let phase = self.controller.phase();
        if phase == DragPhase::Dragging {
            warn!(item_id = %item_id, %phase, "ignoring move while dragging");
            return Err(ReorderError::invalid_state("move an item", phase));
        }

        let board = self.reconciler.board();
        let Some(drop) = resolve_move(board, item_id, target)? else {
            debug!(item_id = %item_id, ?target, "move leaves the board");
            return Ok(Vec::new());
        };
        let commands = self.builder.build(board, item_id, &drop)?;
        let submissions = self.reconciler.apply(commands.clone())?;
        self.queue.extend(submissions);
        Ok(commands)
    }

    /// Drain every submission issued so far, in issuance order
    pub fn take_submissions(&mut self) -> Vec<Submission> {
        self.queue.drain(..).collect()
    }

    /// Future persisting one submission. It holds no borrow of the engine.
    pub fn submit(
        &self,
        submission: Submission,
    ) -> impl Future<Output = SubmissionResult> + Send + 'static {
        reconcile::submit(Arc::clone(&self.store), submission)
    }

    /// Apply a store response. Repair submissions it issues are queued.
    pub fn reconcile(&mut self, result: SubmissionResult) -> Result<Reconciliation> {
        let reconciliation = self.reconciler.reconcile(result)?;
        self.queue.extend(reconciliation.follow_up().iter().cloned());
        Ok(reconciliation)
    }

    /// Submit and reconcile everything queued when called, in issuance
    /// order. Repairs issued along the way stay queued for the next flush.
    ///
    /// A result that fails to reconcile does not stop the batch; the first
    /// such error is returned once every submission has been handled.
    pub async fn flush(&mut self) -> Result<Vec<Reconciliation>> {
        let batch = self.take_submissions();
        let mut results = Vec::with_capacity(batch.len());
        let mut first_error = None;
        for submission in batch {
            let result = self.submit(submission).await;
            match self.reconcile(result) {
                Ok(reconciliation) => results.push(reconciliation),
                Err(error) => {
                    warn!(%error, "reconcile failed during flush");
                    first_error.get_or_insert(error);
                }
            }
        }
        match first_error {
            Some(error) => Err(error),
            None => Ok(results),
        }
    }

    /// Merge remote state; collision repairs are queued
    pub fn refresh<I>(&mut self, items: I) -> Result<()>
    where
        I: IntoIterator<Item = Item>,
    {
        let follow_up = self.reconciler.refresh(items)?;
        self.queue.extend(follow_up);
        Ok(())
    }

    pub fn phase(&self) -> DragPhase {
        self.controller.phase()
    }

    pub fn session(&self) -> Option<&DragSession> {
        self.controller.session()
    }

    pub fn resolved_drop(&self) -> Option<&DropPosition> {
        self.controller.resolved_drop()
    }

    pub fn board(&self) -> &Board {
        self.reconciler.board()
    }

    pub fn is_pending(&self, item_id: &ItemId) -> bool {
        self.reconciler.is_pending(item_id)
    }

    /// Submissions issued but not yet taken
    pub fn queued(&self) -> usize {
        self.queue.len()
    }
}
