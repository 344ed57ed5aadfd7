//! Optimistic apply and reconciliation against the persistence store.
//!
//! Commands are applied to the local board immediately and handed out as
//! [`Submission`]s. Each submission carries a [`Ticket`]; tickets grow in
//! issuance order, so for any item the highest outstanding ticket is the
//! placement on screen. Every item that has submissions in flight keeps its
//! own committed placement, which is where it goes back to when the latest
//! submission fails and nothing older is still pending.

use crate::command::{plan_insertion, ReorderCommand};
use crate::error::{ReorderError, Result};
use crate::types::{Board, Item, ItemId, ListId, OrderKeySpace, Placement};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Why the store refused a command
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct SubmitFailure {
    pub reason: String,
}

impl SubmitFailure {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Remote authority for item placements.
///
/// Commands carry the full target state, so submitting the same command
/// twice must be harmless.
#[async_trait]
pub trait ReorderStore: Send + Sync {
    async fn submit_reorder(
        &self,
        command: &ReorderCommand,
    ) -> std::result::Result<(), SubmitFailure>;
}

/// Issuance sequence number of a submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ticket(u64);

impl fmt::Display for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A command applied locally and waiting to be persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub ticket: Ticket,
    pub command: ReorderCommand,
}

/// What the store said about one submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionResult {
    pub ticket: Ticket,
    pub item_id: ItemId,
    pub outcome: std::result::Result<(), SubmitFailure>,
}

impl SubmissionResult {
    pub fn confirmed(submission: &Submission) -> Self {
        Self {
            ticket: submission.ticket,
            item_id: submission.command.item_id.clone(),
            outcome: Ok(()),
        }
    }

    pub fn failed(submission: &Submission, reason: impl Into<String>) -> Self {
        Self {
            ticket: submission.ticket,
            item_id: submission.command.item_id.clone(),
            outcome: Err(SubmitFailure::new(reason)),
        }
    }
}

/// Send one submission to the store.
///
/// Owns everything it touches, so the caller may keep mutating the engine
/// while the round trip is outstanding.
pub async fn submit(store: Arc<dyn ReorderStore>, submission: Submission) -> SubmissionResult {
    debug!(
        ticket = %submission.ticket,
        item_id = %submission.command.item_id,
        "submitting reorder"
    );
    let outcome = store.submit_reorder(&submission.command).await;
    SubmissionResult {
        ticket: submission.ticket,
        item_id: submission.command.item_id,
        outcome,
    }
}

/// How a submission result changed local state
#[derive(Debug)]
pub enum Reconciliation {
    /// The store accepted the placement
    Confirmed { ticket: Ticket, item_id: ItemId },
    /// A newer submission governs the item; nothing visible changed
    Superseded {
        ticket: Ticket,
        item_id: ItemId,
        error: ReorderError,
    },
    /// The item went back to its previous placement
    RolledBack {
        ticket: Ticket,
        item_id: ItemId,
        restored: Placement,
        error: ReorderError,
        /// Submissions issued to repair a key collision on restore
        follow_up: Vec<Submission>,
    },
    /// The ticket is not outstanding (already reconciled or never issued)
    Stale { ticket: Ticket, item_id: ItemId },
}

impl Reconciliation {
    pub fn item_id(&self) -> &ItemId {
        match self {
            Self::Confirmed { item_id, .. }
            | Self::Superseded { item_id, .. }
            | Self::RolledBack { item_id, .. }
            | Self::Stale { item_id, .. } => item_id,
        }
    }

    pub fn is_rolled_back(&self) -> bool {
        matches!(self, Self::RolledBack { .. })
    }

    /// Error to surface to the user, if any
    pub fn error(&self) -> Option<&ReorderError> {
        match self {
            Self::RolledBack { error, .. } => Some(error),
            _ => None,
        }
    }

    /// Submissions this reconciliation issued
    pub fn follow_up(&self) -> &[Submission] {
        match self {
            Self::RolledBack { follow_up, .. } => follow_up,
            _ => &[],
        }
    }
}

/// Per-item bookkeeping while submissions are in flight
#[derive(Debug, Clone)]
struct Tracked {
    committed: Placement,
    committed_ticket: Option<Ticket>,
    pending: BTreeMap<Ticket, Placement>,
}

impl Tracked {
    fn new(committed: Placement) -> Self {
        Self {
            committed,
            committed_ticket: None,
            pending: BTreeMap::new(),
        }
    }

    /// Placement the item should show right now
    fn display(&self) -> &Placement {
        self.pending
            .values()
            .next_back()
            .unwrap_or(&self.committed)
    }
}

/// Owns the local board and every outstanding submission
#[derive(Debug, Clone)]
pub struct Reconciler {
    board: Board,
    key_space: OrderKeySpace,
    next_ticket: u64,
    tracked: HashMap<ItemId, Tracked>,
}

impl Reconciler {
    pub fn new(board: Board, key_space: OrderKeySpace) -> Self {
        Self {
            board,
            key_space,
            next_ticket: 1,
            tracked: HashMap::new(),
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn key_space(&self) -> &OrderKeySpace {
        &self.key_space
    }

    /// Whether `item_id` has submissions in flight
    pub fn is_pending(&self, item_id: &ItemId) -> bool {
        self.tracked.contains_key(item_id)
    }

    /// Number of submissions in flight across all items
    pub fn pending_count(&self) -> usize {
        self.tracked.values().map(|t| t.pending.len()).sum()
    }

    /// Last placement the store is known to hold for `item_id`
    pub fn committed(&self, item_id: &ItemId) -> Option<Placement> {
        match self.tracked.get(item_id) {
            Some(tracked) => Some(tracked.committed.clone()),
            None => self.board.item(item_id).map(Item::placement),
        }
    }

    /// Apply `commands` to the board as one atomic step and issue a
    /// submission per command.
    pub fn apply(&mut self, commands: Vec<ReorderCommand>) -> Result<Vec<Submission>> {
        if commands.is_empty() {
            return Ok(Vec::new());
        }
        let batch: Vec<(ItemId, Placement)> = commands
            .iter()
            .map(|c| (c.item_id.clone(), c.placement()))
            .collect();
        let previous = self.board.apply_batch(&batch)?;

        let before: HashMap<ItemId, Placement> = previous
            .into_iter()
            .map(|item| (item.id.clone(), item.placement()))
            .collect();
        let submissions = commands
            .into_iter()
            .map(|command| {
                let committed = before
                    .get(&command.item_id)
                    .cloned()
                    .unwrap_or_else(|| command.placement());
                self.issue(command, committed)
            })
            .collect();
        Ok(submissions)
    }

    /// Fold a store response into local state
    pub fn reconcile(&mut self, result: SubmissionResult) -> Result<Reconciliation> {
        let SubmissionResult {
            ticket,
            item_id,
            outcome,
        } = result;

        let Some(tracked) = self.tracked.get_mut(&item_id) else {
            debug!(%ticket, item_id = %item_id, "result for an item with nothing pending");
            return Ok(Reconciliation::Stale { ticket, item_id });
        };
        let Some(placement) = tracked.pending.remove(&ticket) else {
            debug!(%ticket, item_id = %item_id, "result for a ticket that is not pending");
            return Ok(Reconciliation::Stale { ticket, item_id });
        };

        let reconciliation = match outcome {
            Ok(()) => {
                if tracked.committed_ticket.is_none_or(|t| t < ticket) {
                    tracked.committed = placement;
                    tracked.committed_ticket = Some(ticket);
                }
                info!(%ticket, item_id = %item_id, "reorder confirmed");
                Reconciliation::Confirmed {
                    ticket,
                    item_id: item_id.clone(),
                }
            }
            Err(failure) => {
                let error = ReorderError::submission_failure(&item_id, failure.reason);
                let governing = tracked
                    .pending
                    .keys()
                    .next_back()
                    .is_none_or(|latest| *latest < ticket);
                if governing {
                    let target = tracked.display().clone();
                    let committed = tracked.committed.clone();
                    warn!(
                        %ticket,
                        item_id = %item_id,
                        list_id = %target.list_id,
                        %error,
                        "rolling back reorder"
                    );
                    let follow_up = self.restore(&item_id, target, committed)?;
                    let restored = self
                        .board
                        .item(&item_id)
                        .map(Item::placement)
                        .ok_or_else(|| ReorderError::item_not_found(&item_id))?;
                    Reconciliation::RolledBack {
                        ticket,
                        item_id: item_id.clone(),
                        restored,
                        error,
                        follow_up,
                    }
                } else {
                    debug!(%ticket, item_id = %item_id, "superseded submission failed");
                    Reconciliation::Superseded {
                        ticket,
                        item_id: item_id.clone(),
                        error,
                    }
                }
            }
        };

        self.forget_if_settled(&item_id);
        Ok(reconciliation)
    }

    /// Merge remote state by item identity.
    ///
    /// Items with submissions in flight keep their optimistic placement and
    /// only their committed snapshot moves. Everything else takes the remote
    /// placement; items unknown locally are added. Returns the submissions
    /// issued to repair key collisions.
    pub fn refresh<I>(&mut self, items: I) -> Result<Vec<Submission>>
    where
        I: IntoIterator<Item = Item>,
    {
        let items: Vec<Item> = items.into_iter().collect();
        let mut seen = HashSet::with_capacity(items.len());
        for item in &items {
            if self.board.list(&item.list_id).is_none() {
                return Err(ReorderError::list_not_found(&item.list_id));
            }
            if !seen.insert(&item.id) {
                return Err(ReorderError::DuplicateItem {
                    id: item.id.to_string(),
                });
            }
        }

        let mut settled = Vec::new();
        for item in items {
            match self.tracked.get_mut(&item.id) {
                Some(tracked) => tracked.committed = item.placement(),
                None if self.board.item(&item.id) != Some(&item) => settled.push(item),
                None => {}
            }
        }
        debug!(changed = settled.len(), "merging refreshed items");

        for item in &settled {
            self.board.remove_item(&item.id);
        }
        let mut follow_up = Vec::new();
        for item in settled {
            let placement = item.placement();
            follow_up.extend(self.insert_or_repair(&item.id, placement.clone(), placement)?);
        }
        Ok(follow_up)
    }

    fn issue(&mut self, command: ReorderCommand, committed: Placement) -> Submission {
        let ticket = Ticket(self.next_ticket);
        self.next_ticket += 1;
        self.tracked
            .entry(command.item_id.clone())
            .or_insert_with(|| Tracked::new(committed))
            .pending
            .insert(ticket, command.placement());
        Submission { ticket, command }
    }

    fn forget_if_settled(&mut self, item_id: &ItemId) {
        if self
            .tracked
            .get(item_id)
            .is_some_and(|t| t.pending.is_empty())
        {
            self.tracked.remove(item_id);
        }
    }

    /// Put an item back at `target`, repairing a key collision if one
    /// appeared while the item was elsewhere.
    fn restore(
        &mut self,
        item_id: &ItemId,
        target: Placement,
        committed: Placement,
    ) -> Result<Vec<Submission>> {
        let current = self
            .board
            .remove_item(item_id)
            .ok_or_else(|| ReorderError::item_not_found(item_id))?;
        match self.insert_or_repair(item_id, target, committed) {
            Ok(follow_up) => Ok(follow_up),
            Err(e) => {
                // The slot it came from is still free
                self.board.insert_item(current)?;
                Err(e)
            }
        }
    }

    /// Insert an item that is currently off the board. When `placement`
    /// collides with another item, the item goes right after that holder and
    /// the new placement is issued as a submission.
    fn insert_or_repair(
        &mut self,
        item_id: &ItemId,
        placement: Placement,
        committed: Placement,
    ) -> Result<Vec<Submission>> {
        let item = Item {
            id: item_id.clone(),
            list_id: placement.list_id.clone(),
            order_key: placement.order_key.clone(),
        };
        match self.board.insert_item(item) {
            Ok(()) => Ok(Vec::new()),
            Err(ReorderError::DuplicateOrderKey { holder, .. }) => {
                let holder = ItemId::from(holder);
                warn!(
                    item_id = %item_id,
                    holder = %holder,
                    key = %placement.order_key,
                    "order key collision, reinserting"
                );
                self.reinsert_after(item_id, &placement.list_id, &holder, committed)
            }
            Err(e) => Err(e),
        }
    }

    fn reinsert_after(
        &mut self,
        item_id: &ItemId,
        list_id: &ListId,
        holder: &ItemId,
        committed: Placement,
    ) -> Result<Vec<Submission>> {
        let list = self
            .board
            .list(list_id)
            .ok_or_else(|| ReorderError::list_not_found(list_id))?;
        let slot = list
            .without(item_id)
            .position(|i| &i.id == holder)
            .map_or(list.len(), |idx| idx + 1);

        let (own, others): (Vec<_>, Vec<_>) =
            plan_insertion(&self.board, &self.key_space, item_id, list_id, slot)?
                .into_iter()
                .partition(|c| &c.item_id == item_id);

        // Renumber the rest of the list first so the item's key is free
        let mut submissions = self.apply(others)?;
        for command in own {
            self.board.insert_item(Item {
                id: command.item_id.clone(),
                list_id: command.new_list_id.clone(),
                order_key: command.new_order_key.clone(),
            })?;
            submissions.push(self.issue(command, committed.clone()));
        }
        Ok(submissions)
    }
}
