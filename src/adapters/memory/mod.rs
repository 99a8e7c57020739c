//! In-memory storage adapter.
//!
//! One [`InMemoryStore`] implements both `TeamStore` and `BillingStore` over a
//! shared set of tables. Every statement runs atomically under a mutex, which
//! gives the same row-level guarantees the conditional-write guard relies on in
//! Postgres. Transactions record an undo entry per write and replay them in
//! reverse when dropped without `commit`.
//!
//! Reads are not isolated from other open transactions. That is weaker than
//! read-committed but is enough for tests and local development, where the
//! interesting races are all decided by the conditional writes.

mod billing;
mod team;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use uuid::Uuid;

use crate::domain::billing::{Plan, Subscription, SubscriptionItem};
use crate::domain::foundation::{
    Email, InvitationId, MembershipId, SubscriptionId, SubscriptionItemId, TeamId, UserId,
};
use crate::domain::team::{Invitation, Membership, Team};

pub use billing::InMemoryBillingTransaction;
pub use team::InMemoryTeamTransaction;

#[derive(Debug, Clone)]
struct UserRow {
    email: Email,
    customer_id: Option<String>,
}

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<UserId, UserRow>,
    teams: HashMap<TeamId, Team>,
    memberships: HashMap<MembershipId, Membership>,
    invitations: HashMap<InvitationId, Invitation>,
    plans: Vec<Plan>,
    subscriptions: HashMap<SubscriptionId, Subscription>,
    items: HashMap<SubscriptionItemId, SubscriptionItem>,
}

type Undo = Box<dyn FnOnce(&mut Tables) + Send>;

/// Shared in-memory tables. Cloning shares the same data.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        lock_tables(&self.tables)
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Seeding and inspection
    // ════════════════════════════════════════════════════════════════════════════

    /// Registers a user row. Accounts are created by the sign-up flow, which
    /// lives outside this crate.
    pub fn register_user(&self, id: UserId, email: Email) {
        self.lock().users.insert(
            id,
            UserRow {
                email,
                customer_id: None,
            },
        );
    }

    pub fn add_plan(&self, plan: Plan) {
        self.lock().plans.push(plan);
    }

    /// Stores an invitation as-is, bypassing the create flow.
    pub fn put_invitation(&self, invitation: Invitation) {
        self.lock().invitations.insert(invitation.id, invitation);
    }

    pub fn put_subscription(&self, subscription: Subscription) {
        self.lock().subscriptions.insert(subscription.id, subscription);
    }

    pub fn customer_id(&self, user_id: &UserId) -> Option<String> {
        self.lock().users.get(user_id).and_then(|u| u.customer_id.clone())
    }

    pub fn invitation(&self, id: &InvitationId) -> Option<Invitation> {
        self.lock().invitations.get(id).cloned()
    }

    pub fn memberships_of(&self, team_id: &TeamId) -> Vec<Membership> {
        let mut rows: Vec<_> = self
            .lock()
            .memberships
            .values()
            .filter(|m| m.team_id == *team_id)
            .cloned()
            .collect();
        rows.sort_by_key(|m| m.created_at);
        rows
    }

    pub fn subscriptions_by_external_id(&self, external_id: &str) -> Vec<Subscription> {
        self.lock()
            .subscriptions
            .values()
            .filter(|s| s.external_id == external_id)
            .cloned()
            .collect()
    }

    pub fn items_of(&self, subscription_id: &SubscriptionId) -> Vec<SubscriptionItem> {
        items_of(&self.lock(), subscription_id)
    }
}

fn lock_tables(tables: &Mutex<Tables>) -> MutexGuard<'_, Tables> {
    // A panic while holding the lock leaves whole rows behind, never half-written ones.
    tables.lock().unwrap_or_else(PoisonError::into_inner)
}

fn items_of(tables: &Tables, subscription_id: &SubscriptionId) -> Vec<SubscriptionItem> {
    let mut rows: Vec<_> = tables
        .items
        .values()
        .filter(|i| i.subscription_id == *subscription_id)
        .cloned()
        .collect();
    rows.sort_by_key(|i| i.created_at);
    rows
}

fn find_item(
    tables: &Tables,
    subscription_id: &SubscriptionId,
    item_type: crate::domain::billing::AddonType,
    related_resource_id: Option<Uuid>,
) -> Option<SubscriptionItem> {
    tables
        .items
        .values()
        .find(|i| {
            i.subscription_id == *subscription_id
                && i.item_type == item_type
                && i.related_resource_id == related_resource_id
        })
        .cloned()
}

/// Write log shared by both transaction types.
struct UndoLog {
    tables: Arc<Mutex<Tables>>,
    undo: Vec<Undo>,
    committed: bool,
}

impl UndoLog {
    fn new(tables: Arc<Mutex<Tables>>) -> Self {
        Self {
            tables,
            undo: Vec::new(),
            committed: false,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        lock_tables(&self.tables)
    }

    fn push(&mut self, undo: Undo) {
        self.undo.push(undo);
    }

    fn commit(&mut self) {
        self.committed = true;
        self.undo.clear();
    }
}

impl Drop for UndoLog {
    fn drop(&mut self) {
        if self.committed || self.undo.is_empty() {
            return;
        }
        tracing::debug!(writes = self.undo.len(), "rolling back in-memory transaction");
        let mut tables = lock_tables(&self.tables);
        while let Some(undo) = self.undo.pop() {
            undo(&mut tables);
        }
    }
}
