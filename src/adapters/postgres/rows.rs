//! Row types and conversions shared by the PostgreSQL stores.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::billing::{AddonType, Plan, Subscription, SubscriptionItem, SubscriptionStatus};
use crate::domain::foundation::{
    DomainError, Email, ErrorCode, InvitationId, MembershipId, PlanId, SubscriptionId,
    SubscriptionItemId, TeamId, Timestamp, UserId,
};
use crate::domain::team::{Invitation, InvitationStatus, InvitationToken, Membership, Team};

// ════════════════════════════════════════════════════════════════════════════════
// Column lists
// ════════════════════════════════════════════════════════════════════════════════

pub(super) const MEMBERSHIP_COLUMNS: &str = "id, user_id, team_id, role, created_at";

pub(super) const INVITATION_COLUMNS: &str =
    "id, team_id, inviter_id, email, role, token, status, expires_at, created_at, updated_at";

pub(super) const SUBSCRIPTION_COLUMNS: &str = "id, user_id, plan_id, external_id, status, \
     current_period_start, current_period_end, cancel_at_period_end, created_at, updated_at";

pub(super) const ITEM_COLUMNS: &str = "id, subscription_id, external_item_id, external_price_id, \
     item_type, related_resource_id, quantity, created_at";

// ════════════════════════════════════════════════════════════════════════════════
// Rows
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, sqlx::FromRow)]
pub(super) struct TeamRow {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl From<TeamRow> for Team {
    fn from(row: TeamRow) -> Self {
        Team {
            id: TeamId::from_uuid(row.id),
            name: row.name,
            created_at: Timestamp::from_datetime(row.created_at),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct MembershipRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub team_id: Uuid,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<MembershipRow> for Membership {
    type Error = DomainError;

    fn try_from(row: MembershipRow) -> Result<Self, Self::Error> {
        Ok(Membership {
            id: MembershipId::from_uuid(row.id),
            user_id: UserId::from_uuid(row.user_id),
            team_id: TeamId::from_uuid(row.team_id),
            role: parse_column("role", &row.role)?,
            created_at: Timestamp::from_datetime(row.created_at),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct InvitationRow {
    pub id: Uuid,
    pub team_id: Uuid,
    pub inviter_id: Uuid,
    pub email: String,
    pub role: String,
    pub token: String,
    pub status: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<InvitationRow> for Invitation {
    type Error = DomainError;

    fn try_from(row: InvitationRow) -> Result<Self, Self::Error> {
        Ok(Invitation {
            id: InvitationId::from_uuid(row.id),
            team_id: TeamId::from_uuid(row.team_id),
            inviter_id: UserId::from_uuid(row.inviter_id),
            email: Email::new(&row.email).map_err(corrupt("email"))?,
            role: parse_column("role", &row.role)?,
            token: InvitationToken::parse(&row.token).map_err(corrupt("token"))?,
            status: parse_column::<InvitationStatus>("status", &row.status)?,
            expires_at: Timestamp::from_datetime(row.expires_at),
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct PlanRow {
    pub id: String,
    pub name: String,
    pub monthly_price_id: String,
    pub yearly_price_id: Option<String>,
    pub active: bool,
}

impl TryFrom<PlanRow> for Plan {
    type Error = DomainError;

    fn try_from(row: PlanRow) -> Result<Self, Self::Error> {
        Ok(Plan {
            id: PlanId::new(row.id).map_err(corrupt("plan_id"))?,
            name: row.name,
            monthly_price_id: row.monthly_price_id,
            yearly_price_id: row.yearly_price_id,
            active: row.active,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct SubscriptionRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plan_id: String,
    pub external_id: String,
    pub status: String,
    pub current_period_start: DateTime<Utc>,
    pub current_period_end: DateTime<Utc>,
    pub cancel_at_period_end: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<SubscriptionRow> for Subscription {
    type Error = DomainError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        Ok(Subscription {
            id: SubscriptionId::from_uuid(row.id),
            user_id: UserId::from_uuid(row.user_id),
            plan_id: PlanId::new(row.plan_id).map_err(corrupt("plan_id"))?,
            external_id: row.external_id,
            // Unknown provider statuses are kept verbatim.
            status: SubscriptionStatus::from(row.status),
            current_period_start: Timestamp::from_datetime(row.current_period_start),
            current_period_end: Timestamp::from_datetime(row.current_period_end),
            cancel_at_period_end: row.cancel_at_period_end,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct ItemRow {
    pub id: Uuid,
    pub subscription_id: Uuid,
    pub external_item_id: String,
    pub external_price_id: String,
    pub item_type: String,
    pub related_resource_id: Option<Uuid>,
    pub quantity: i64,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<ItemRow> for SubscriptionItem {
    type Error = DomainError;

    fn try_from(row: ItemRow) -> Result<Self, Self::Error> {
        Ok(SubscriptionItem {
            id: SubscriptionItemId::from_uuid(row.id),
            subscription_id: SubscriptionId::from_uuid(row.subscription_id),
            external_item_id: row.external_item_id,
            external_price_id: row.external_price_id,
            item_type: parse_column::<AddonType>("item_type", &row.item_type)?,
            related_resource_id: row.related_resource_id,
            quantity: row.quantity,
            created_at: Timestamp::from_datetime(row.created_at),
        })
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Helpers
// ════════════════════════════════════════════════════════════════════════════════

fn parse_column<T: FromStr>(column: &'static str, raw: &str) -> Result<T, DomainError> {
    T::from_str(raw).map_err(|_| {
        DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid {} value: {}", column, raw),
        )
    })
}

fn corrupt<E: std::fmt::Display>(column: &'static str) -> impl Fn(E) -> DomainError {
    move |e| DomainError::new(ErrorCode::DatabaseError, format!("Invalid {} value: {}", column, e))
}

/// Unique constraints whose violation is a business conflict, not a fault.
const CONFLICT_CONSTRAINTS: &[(&str, ErrorCode)] = &[
    ("team_memberships_user_team_key", ErrorCode::DuplicateMembership),
    ("team_invitations_pending_email_key", ErrorCode::DuplicateInvitation),
    ("subscription_items_external_item_id_key", ErrorCode::DuplicateSubscriptionItem),
    ("subscription_items_resource_key", ErrorCode::DuplicateSubscriptionItem),
];

pub(super) fn conflict_code(constraint: Option<&str>) -> Option<ErrorCode> {
    let constraint = constraint?;
    CONFLICT_CONSTRAINTS
        .iter()
        .find(|(name, _)| *name == constraint)
        .map(|(_, code)| *code)
}

/// Maps a sqlx error, turning known unique violations into conflict codes.
pub(super) fn db_error(context: &'static str) -> impl Fn(sqlx::Error) -> DomainError {
    move |e| {
        if let sqlx::Error::Database(db_err) = &e {
            if let Some(code) = conflict_code(db_err.constraint()) {
                return DomainError::new(code, format!("{}: {}", context, db_err.message()));
            }
        }
        DomainError::database(format!("Failed to {}: {}", context, e))
    }
}
