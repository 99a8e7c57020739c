//! Subscriptions and their add-on items as mirrored from the billing provider.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::foundation::{
    GuardedEntity, PlanId, StateMachine, SubscriptionId, SubscriptionItemId, Timestamp, UserId,
    ValidationError,
};

/// Subscription status in the provider's own vocabulary.
///
/// The provider owns this lifecycle; we record what it reports. Strings we
/// do not recognise are kept verbatim in `Other` so a new provider status
/// never blocks reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SubscriptionStatus {
    Active,
    PastDue,
    Canceled,
    Trialing,
    Incomplete,
    IncompleteExpired,
    Unpaid,
    Paused,
    Other(String),
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::PastDue => "past_due",
            SubscriptionStatus::Canceled => "canceled",
            SubscriptionStatus::Trialing => "trialing",
            SubscriptionStatus::Incomplete => "incomplete",
            SubscriptionStatus::IncompleteExpired => "incomplete_expired",
            SubscriptionStatus::Unpaid => "unpaid",
            SubscriptionStatus::Paused => "paused",
            SubscriptionStatus::Other(raw) => raw,
        }
    }

    /// Statuses the provider never leaves.
    pub const FINAL: [SubscriptionStatus; 2] = [SubscriptionStatus::Canceled, SubscriptionStatus::IncompleteExpired];

    /// Whether the subscriber currently gets paid features.
    pub fn has_access(&self) -> bool {
        matches!(
            self,
            SubscriptionStatus::Active | SubscriptionStatus::Trialing | SubscriptionStatus::PastDue
        )
    }
}

/// The provider may move a live subscription between any of its statuses, in
/// any order. `canceled` and `incomplete_expired` are final: nothing the
/// provider sends afterwards brings the row back.
impl StateMachine for SubscriptionStatus {
    fn valid_transitions(&self) -> Vec<Self> {
        use SubscriptionStatus::*;
        if Self::FINAL.contains(self) {
            return vec![];
        }
        [Active, PastDue, Canceled, Trialing, Incomplete, IncompleteExpired, Unpaid, Paused]
            .into_iter()
            .filter(|s| s != self)
            .collect()
    }

    /// Also admits statuses we have no variant for yet.
    fn can_transition_to(&self, target: &Self) -> bool {
        !self.is_terminal() && self != target
    }
}

impl From<&str> for SubscriptionStatus {
    fn from(raw: &str) -> Self {
        match raw {
            "active" => SubscriptionStatus::Active,
            "past_due" => SubscriptionStatus::PastDue,
            "canceled" => SubscriptionStatus::Canceled,
            "trialing" => SubscriptionStatus::Trialing,
            "incomplete" => SubscriptionStatus::Incomplete,
            "incomplete_expired" => SubscriptionStatus::IncompleteExpired,
            "unpaid" => SubscriptionStatus::Unpaid,
            "paused" => SubscriptionStatus::Paused,
            other => SubscriptionStatus::Other(other.to_string()),
        }
    }
}

impl From<String> for SubscriptionStatus {
    fn from(raw: String) -> Self {
        SubscriptionStatus::from(raw.as_str())
    }
}

impl From<SubscriptionStatus> for String {
    fn from(status: SubscriptionStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Local mirror of one provider subscription.
///
/// # Invariants
///
/// - `external_id` is unique; writers upsert on it
/// - a user may own several rows over time; "the" subscription is the most
///   recently created `active` one
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub user_id: UserId,
    pub plan_id: PlanId,
    pub external_id: String,
    pub status: SubscriptionStatus,
    pub current_period_start: Timestamp,
    pub current_period_end: Timestamp,
    pub cancel_at_period_end: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Status changes are guarded by the provider's subscription id, which is
/// the key every webhook carries.
impl GuardedEntity for Subscription {
    type Key = String;
    type Status = SubscriptionStatus;
    const NAME: &'static str = "subscription";
}

/// Mutable provider-owned fields, applied together on every update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionState {
    pub plan_id: PlanId,
    pub status: SubscriptionStatus,
    pub current_period_start: Timestamp,
    pub current_period_end: Timestamp,
    pub cancel_at_period_end: bool,
}

impl Subscription {
    /// A new local row for a provider subscription seen for the first time.
    pub fn from_provider(
        user_id: UserId,
        external_id: impl Into<String>,
        state: SubscriptionState,
        now: Timestamp,
    ) -> Self {
        Self {
            id: SubscriptionId::new(),
            user_id,
            plan_id: state.plan_id,
            external_id: external_id.into(),
            status: state.status,
            current_period_start: state.current_period_start,
            current_period_end: state.current_period_end,
            cancel_at_period_end: state.cancel_at_period_end,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn state(&self) -> SubscriptionState {
        SubscriptionState {
            plan_id: self.plan_id.clone(),
            status: self.status.clone(),
            current_period_start: self.current_period_start,
            current_period_end: self.current_period_end,
            cancel_at_period_end: self.cancel_at_period_end,
        }
    }

    pub fn apply(&mut self, state: SubscriptionState, now: Timestamp) {
        self.plan_id = state.plan_id;
        self.status = state.status;
        self.current_period_start = state.current_period_start;
        self.current_period_end = state.current_period_end;
        self.cancel_at_period_end = state.cancel_at_period_end;
        self.updated_at = now;
    }
}

/// Kinds of billable add-ons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddonType {
    ReservedDomain,
    CustomDomain,
}

impl AddonType {
    pub const ALL: [AddonType; 2] = [AddonType::ReservedDomain, AddonType::CustomDomain];

    pub fn as_str(&self) -> &'static str {
        match self {
            AddonType::ReservedDomain => "reserved_domain",
            AddonType::CustomDomain => "custom_domain",
        }
    }
}

impl fmt::Display for AddonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AddonType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reserved_domain" => Ok(AddonType::ReservedDomain),
            "custom_domain" => Ok(AddonType::CustomDomain),
            other => Err(ValidationError::invalid_format(
                "item_type",
                format!("unknown add-on type '{}'", other),
            )),
        }
    }
}

/// One billable add-on attached to a subscription.
///
/// No two items may share `(subscription_id, item_type, related_resource_id)`;
/// writers look up before inserting and storage backs it with a unique index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionItem {
    pub id: SubscriptionItemId,
    pub subscription_id: SubscriptionId,
    pub external_item_id: String,
    pub external_price_id: String,
    pub item_type: AddonType,
    pub related_resource_id: Option<Uuid>,
    pub quantity: i64,
    pub created_at: Timestamp,
}

impl SubscriptionItem {
    pub fn new(
        subscription_id: SubscriptionId,
        external_item_id: impl Into<String>,
        external_price_id: impl Into<String>,
        item_type: AddonType,
        related_resource_id: Option<Uuid>,
        quantity: i64,
        now: Timestamp,
    ) -> Result<Self, ValidationError> {
        if quantity < 1 {
            return Err(ValidationError::out_of_range("quantity", 1, i64::MAX, quantity));
        }
        Ok(Self {
            id: SubscriptionItemId::new(),
            subscription_id,
            external_item_id: external_item_id.into(),
            external_price_id: external_price_id.into(),
            item_type,
            related_resource_id,
            quantity,
            created_at: now,
        })
    }
}
