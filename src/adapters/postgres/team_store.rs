//! PostgreSQL implementation of the team storage port.
//!
//! Each handler call runs inside one `sqlx::Transaction`. Invitation status
//! changes are single conditional `UPDATE` statements; the row lock taken by
//! the first writer makes a concurrent writer re-evaluate its `WHERE` clause
//! after the first commits, so exactly one of them changes the row.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};

use crate::domain::foundation::{
    ConditionalWrite, DomainError, Email, InvitationId, TeamId, Timestamp, UserId,
};
use crate::domain::team::{Invitation, InvitationStatus, InvitationToken, Membership, Role, Team};
use crate::ports::{FindOrCreate, TeamStore, TeamTransaction};

use super::rows::{db_error, InvitationRow, MembershipRow, TeamRow, INVITATION_COLUMNS, MEMBERSHIP_COLUMNS};

#[derive(Clone)]
pub struct PostgresTeamStore {
    pool: PgPool,
}

impl PostgresTeamStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TeamStore for PostgresTeamStore {
    async fn begin(&self) -> Result<Box<dyn TeamTransaction>, DomainError> {
        let tx = self.pool.begin().await.map_err(db_error("begin transaction"))?;
        Ok(Box::new(PostgresTeamTransaction { tx }))
    }

    async fn find_team(&self, id: &TeamId) -> Result<Option<Team>, DomainError> {
        let row: Option<TeamRow> = sqlx::query_as("SELECT id, name, created_at FROM teams WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("find team"))?;

        Ok(row.map(Team::from))
    }

    async fn find_membership(
        &self,
        team_id: &TeamId,
        user_id: &UserId,
    ) -> Result<Option<Membership>, DomainError> {
        let row: Option<MembershipRow> = sqlx::query_as(&format!(
            "SELECT {} FROM team_memberships WHERE team_id = $1 AND user_id = $2",
            MEMBERSHIP_COLUMNS
        ))
        .bind(team_id.as_uuid())
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("find membership"))?;

        row.map(Membership::try_from).transpose()
    }

    async fn list_pending_invitations(&self, team_id: &TeamId) -> Result<Vec<Invitation>, DomainError> {
        let rows: Vec<InvitationRow> = sqlx::query_as(&format!(
            "SELECT {} FROM team_invitations WHERE team_id = $1 AND status = 'pending' \
             ORDER BY created_at DESC",
            INVITATION_COLUMNS
        ))
        .bind(team_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list invitations"))?;

        rows.into_iter().map(Invitation::try_from).collect()
    }

    async fn find_invitation_by_token(
        &self,
        token: &InvitationToken,
    ) -> Result<Option<Invitation>, DomainError> {
        let row: Option<InvitationRow> = sqlx::query_as(&select_invitations("token = $1"))
            .bind(token.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("find invitation"))?;

        row.map(Invitation::try_from).transpose()
    }
}

/// A team transaction. Dropping it without `commit` rolls back.
pub struct PostgresTeamTransaction {
    tx: Transaction<'static, Postgres>,
}

fn select_invitations(filter: &str) -> String {
    format!("SELECT {} FROM team_invitations WHERE {}", INVITATION_COLUMNS, filter)
}

#[async_trait]
impl ConditionalWrite<Invitation> for PostgresTeamTransaction {
    async fn compare_and_set(
        &mut self,
        key: &InvitationId,
        expected: InvitationStatus,
        target: InvitationStatus,
    ) -> Result<u64, DomainError> {
        let result = sqlx::query(
            "UPDATE team_invitations SET status = $3, updated_at = $4 WHERE id = $1 AND status = $2",
        )
        .bind(key.as_uuid())
        .bind(expected.as_str())
        .bind(target.as_str())
        .bind(Timestamp::now().as_datetime())
        .execute(&mut *self.tx)
        .await
        .map_err(db_error("update invitation status"))?;

        Ok(result.rows_affected())
    }

    async fn read_status(&mut self, key: &InvitationId) -> Result<Option<InvitationStatus>, DomainError> {
        let status: Option<String> = sqlx::query_scalar("SELECT status FROM team_invitations WHERE id = $1")
            .bind(key.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(db_error("read invitation status"))?;

        status
            .map(|s| s.parse::<InvitationStatus>().map_err(DomainError::from))
            .transpose()
    }
}

#[async_trait]
impl TeamTransaction for PostgresTeamTransaction {
    async fn insert_team(&mut self, team: &Team) -> Result<(), DomainError> {
        sqlx::query("INSERT INTO teams (id, name, created_at) VALUES ($1, $2, $3)")
            .bind(team.id.as_uuid())
            .bind(&team.name)
            .bind(team.created_at.as_datetime())
            .execute(&mut *self.tx)
            .await
            .map_err(db_error("insert team"))?;

        Ok(())
    }

    async fn insert_membership(&mut self, membership: &Membership) -> Result<(), DomainError> {
        sqlx::query(
            "INSERT INTO team_memberships (id, user_id, team_id, role, created_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(membership.id.as_uuid())
        .bind(membership.user_id.as_uuid())
        .bind(membership.team_id.as_uuid())
        .bind(membership.role.as_str())
        .bind(membership.created_at.as_datetime())
        .execute(&mut *self.tx)
        .await
        .map_err(db_error("insert membership"))?;

        Ok(())
    }

    async fn find_or_create_membership(
        &mut self,
        membership: &Membership,
    ) -> Result<FindOrCreate<Membership>, DomainError> {
        // A concurrent insert of the same key blocks here until it commits,
        // then DO NOTHING applies and the existing row is read below.
        let inserted: Option<MembershipRow> = sqlx::query_as(&format!(
            "INSERT INTO team_memberships (id, user_id, team_id, role, created_at) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT ON CONSTRAINT team_memberships_user_team_key DO NOTHING \
             RETURNING {}",
            MEMBERSHIP_COLUMNS
        ))
        .bind(membership.id.as_uuid())
        .bind(membership.user_id.as_uuid())
        .bind(membership.team_id.as_uuid())
        .bind(membership.role.as_str())
        .bind(membership.created_at.as_datetime())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_error("insert membership"))?;

        if let Some(row) = inserted {
            return Ok(FindOrCreate::Created(Membership::try_from(row)?));
        }

        let existing = TeamTransaction::find_membership(self, &membership.team_id, &membership.user_id)
            .await?
            .ok_or_else(|| DomainError::database("membership vanished after insert conflict"))?;
        Ok(FindOrCreate::Found(existing))
    }

    async fn find_membership(
        &mut self,
        team_id: &TeamId,
        user_id: &UserId,
    ) -> Result<Option<Membership>, DomainError> {
        let row: Option<MembershipRow> = sqlx::query_as(&format!(
            "SELECT {} FROM team_memberships WHERE team_id = $1 AND user_id = $2",
            MEMBERSHIP_COLUMNS
        ))
        .bind(team_id.as_uuid())
        .bind(user_id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_error("find membership"))?;

        row.map(Membership::try_from).transpose()
    }

    async fn update_member_role(
        &mut self,
        team_id: &TeamId,
        user_id: &UserId,
        role: Role,
    ) -> Result<u64, DomainError> {
        let result = sqlx::query(
            "UPDATE team_memberships SET role = $3 \
             WHERE team_id = $1 AND user_id = $2 AND role <> 'owner'",
        )
        .bind(team_id.as_uuid())
        .bind(user_id.as_uuid())
        .bind(role.as_str())
        .execute(&mut *self.tx)
        .await
        .map_err(db_error("update member role"))?;

        Ok(result.rows_affected())
    }

    async fn remove_member(&mut self, team_id: &TeamId, user_id: &UserId) -> Result<u64, DomainError> {
        let result = sqlx::query(
            "DELETE FROM team_memberships WHERE team_id = $1 AND user_id = $2 AND role <> 'owner'",
        )
        .bind(team_id.as_uuid())
        .bind(user_id.as_uuid())
        .execute(&mut *self.tx)
        .await
        .map_err(db_error("remove member"))?;

        Ok(result.rows_affected())
    }

    async fn has_member_with_email(&mut self, team_id: &TeamId, email: &Email) -> Result<bool, DomainError> {
        sqlx::query_scalar(
            "SELECT EXISTS ( \
                SELECT 1 FROM team_memberships m JOIN users u ON u.id = m.user_id \
                WHERE m.team_id = $1 AND lower(u.email) = $2)",
        )
        .bind(team_id.as_uuid())
        .bind(email.as_str())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(db_error("check existing member"))
    }

    async fn find_invitation_by_token(
        &mut self,
        token: &InvitationToken,
    ) -> Result<Option<Invitation>, DomainError> {
        let row: Option<InvitationRow> = sqlx::query_as(&select_invitations("token = $1"))
            .bind(token.as_str())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(db_error("find invitation"))?;

        row.map(Invitation::try_from).transpose()
    }

    async fn find_invitation(
        &mut self,
        team_id: &TeamId,
        id: &InvitationId,
    ) -> Result<Option<Invitation>, DomainError> {
        let row: Option<InvitationRow> = sqlx::query_as(&select_invitations("team_id = $1 AND id = $2"))
            .bind(team_id.as_uuid())
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(db_error("find invitation"))?;

        row.map(Invitation::try_from).transpose()
    }

    async fn find_pending_invitation(
        &mut self,
        team_id: &TeamId,
        email: &Email,
    ) -> Result<Option<Invitation>, DomainError> {
        let row: Option<InvitationRow> = sqlx::query_as(&select_invitations(
            "team_id = $1 AND email = $2 AND status = 'pending'",
        ))
        .bind(team_id.as_uuid())
        .bind(email.as_str())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_error("find pending invitation"))?;

        row.map(Invitation::try_from).transpose()
    }

    async fn insert_invitation(&mut self, invitation: &Invitation) -> Result<(), DomainError> {
        sqlx::query(
            "INSERT INTO team_invitations \
                (id, team_id, inviter_id, email, role, token, status, expires_at, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(invitation.id.as_uuid())
        .bind(invitation.team_id.as_uuid())
        .bind(invitation.inviter_id.as_uuid())
        .bind(invitation.email.as_str())
        .bind(invitation.role.as_str())
        .bind(invitation.token.as_str())
        .bind(invitation.status.as_str())
        .bind(invitation.expires_at.as_datetime())
        .bind(invitation.created_at.as_datetime())
        .bind(invitation.updated_at.as_datetime())
        .execute(&mut *self.tx)
        .await
        .map_err(db_error("insert invitation"))?;

        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), DomainError> {
        self.tx.commit().await.map_err(db_error("commit transaction"))
    }
}
