//! RemoveMemberHandler - A team owner or admin removes someone from the team.

use std::sync::Arc;

use crate::domain::foundation::{TeamId, UserId};
use crate::domain::team::{InvitationError, Membership};
use crate::ports::{TeamStore, TeamTransaction};

#[derive(Debug, Clone)]
pub struct RemoveMemberCommand {
    pub requestor_id: UserId,
    pub team_id: TeamId,
    pub user_id: UserId,
}

/// Deletes a non-owner membership.
///
/// The owner row is protected twice: by the check on the loaded target and by
/// the storage write itself, which never deletes an owner row.
pub struct RemoveMemberHandler {
    store: Arc<dyn TeamStore>,
}

impl RemoveMemberHandler {
    pub fn new(store: Arc<dyn TeamStore>) -> Self {
        Self { store }
    }

    pub async fn handle(&self, cmd: RemoveMemberCommand) -> Result<(), InvitationError> {
        let mut tx = self.store.begin().await?;

        let target = load_managed_target(
            tx.as_mut(),
            &cmd.team_id,
            &cmd.requestor_id,
            &cmd.user_id,
            "remove yourself from the team",
        )
        .await?;
        if target.is_owner() {
            return Err(InvitationError::OwnerProtected("removed"));
        }

        if tx.remove_member(&cmd.team_id, &cmd.user_id).await? == 0 {
            return Err(InvitationError::MemberNotFound);
        }
        tx.commit().await?;

        tracing::info!(team_id = %cmd.team_id, user_id = %cmd.user_id, removed_by = %cmd.requestor_id, "member removed");
        Ok(())
    }
}

/// Shared checks for member management: the requestor is an owner or admin,
/// is not acting on themselves, and the target belongs to the team.
pub(super) async fn load_managed_target(
    tx: &mut dyn TeamTransaction,
    team_id: &TeamId,
    requestor_id: &UserId,
    user_id: &UserId,
    self_action: &str,
) -> Result<Membership, InvitationError> {
    let requestor = tx
        .find_membership(team_id, requestor_id)
        .await?
        .ok_or_else(|| InvitationError::forbidden("not a member of this team"))?;
    if !requestor.can_manage_members() {
        tracing::warn!(team_id = %team_id, requestor_id = %requestor_id, "member change rejected: requestor lacks permission");
        return Err(InvitationError::forbidden("only team owners and admins can manage members"));
    }

    if requestor_id == user_id {
        return Err(InvitationError::Validation(format!("you cannot {}", self_action)));
    }

    tx.find_membership(team_id, user_id)
        .await?
        .ok_or(InvitationError::MemberNotFound)
}
