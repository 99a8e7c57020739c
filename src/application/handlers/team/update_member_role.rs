//! UpdateMemberRoleHandler - A team owner or admin changes a member's role.

use std::sync::Arc;

use crate::domain::foundation::{TeamId, UserId};
use crate::domain::team::{InvitationError, Membership, Role};
use crate::ports::TeamStore;

use super::remove_member::load_managed_target;

#[derive(Debug, Clone)]
pub struct UpdateMemberRoleCommand {
    pub requestor_id: UserId,
    pub team_id: TeamId,
    pub user_id: UserId,
    pub role: Role,
}

/// Moves a member between `admin` and `member`. Ownership never changes here.
pub struct UpdateMemberRoleHandler {
    store: Arc<dyn TeamStore>,
}

impl UpdateMemberRoleHandler {
    pub fn new(store: Arc<dyn TeamStore>) -> Self {
        Self { store }
    }

    pub async fn handle(&self, cmd: UpdateMemberRoleCommand) -> Result<Membership, InvitationError> {
        let role = cmd
            .role
            .ensure_grantable()
            .map_err(|_| InvitationError::InvalidRole(cmd.role))?;

        let mut tx = self.store.begin().await?;

        let mut target = load_managed_target(
            tx.as_mut(),
            &cmd.team_id,
            &cmd.requestor_id,
            &cmd.user_id,
            "change your own role",
        )
        .await?;
        if target.is_owner() {
            return Err(InvitationError::OwnerProtected("given another role"));
        }

        if target.role != role {
            if tx.update_member_role(&cmd.team_id, &cmd.user_id, role).await? == 0 {
                return Err(InvitationError::MemberNotFound);
            }
            tx.commit().await?;
            tracing::info!(team_id = %cmd.team_id, user_id = %cmd.user_id, from = %target.role, to = %role, "member role changed");
            target.role = role;
        }

        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::team::fixtures::team_with_owner;

    fn command(requestor_id: UserId, team_id: TeamId, user_id: UserId, role: Role) -> UpdateMemberRoleCommand {
        UpdateMemberRoleCommand {
            requestor_id,
            team_id,
            user_id,
            role,
        }
    }

    #[tokio::test]
    async fn owner_promotes_member_to_admin() {
        let fx = team_with_owner().await;
        let member = fx.add_member("m@example.com", Role::Member).await;

        let updated = UpdateMemberRoleHandler::new(Arc::new(fx.store.clone()))
            .handle(command(fx.owner.id, fx.team.id, member.id, Role::Admin))
            .await
            .unwrap();

        assert_eq!(updated.role, Role::Admin);
        let stored = fx.store.find_membership(&fx.team.id, &member.id).await.unwrap().unwrap();
        assert_eq!(stored.role, Role::Admin);
    }

    #[tokio::test]
    async fn same_role_is_accepted_without_a_write() {
        let fx = team_with_owner().await;
        let admin = fx.add_member("a@example.com", Role::Admin).await;

        let updated = UpdateMemberRoleHandler::new(Arc::new(fx.store.clone()))
            .handle(command(fx.owner.id, fx.team.id, admin.id, Role::Admin))
            .await
            .unwrap();

        assert_eq!(updated.role, Role::Admin);
    }

    #[tokio::test]
    async fn owner_role_cannot_be_granted() {
        let fx = team_with_owner().await;
        let member = fx.add_member("m@example.com", Role::Member).await;

        let err = UpdateMemberRoleHandler::new(Arc::new(fx.store.clone()))
            .handle(command(fx.owner.id, fx.team.id, member.id, Role::Owner))
            .await
            .unwrap_err();

        assert_eq!(err, InvitationError::InvalidRole(Role::Owner));
    }

    #[tokio::test]
    async fn owner_role_cannot_be_changed() {
        let fx = team_with_owner().await;
        let admin = fx.add_member("a@example.com", Role::Admin).await;

        let err = UpdateMemberRoleHandler::new(Arc::new(fx.store.clone()))
            .handle(command(admin.id, fx.team.id, fx.owner.id, Role::Member))
            .await
            .unwrap_err();

        assert!(matches!(err, InvitationError::OwnerProtected(_)));
        let owner = fx.store.find_membership(&fx.team.id, &fx.owner.id).await.unwrap().unwrap();
        assert_eq!(owner.role, Role::Owner);
    }

    #[tokio::test]
    async fn member_cannot_change_roles() {
        let fx = team_with_owner().await;
        let member = fx.add_member("m@example.com", Role::Member).await;
        let other = fx.add_member("o@example.com", Role::Member).await;

        let err = UpdateMemberRoleHandler::new(Arc::new(fx.store.clone()))
            .handle(command(member.id, fx.team.id, other.id, Role::Admin))
            .await
            .unwrap_err();

        assert!(matches!(err, InvitationError::Forbidden(_)));
    }

    #[tokio::test]
    async fn admin_cannot_demote_themselves() {
        let fx = team_with_owner().await;
        let admin = fx.add_member("a@example.com", Role::Admin).await;

        let err = UpdateMemberRoleHandler::new(Arc::new(fx.store.clone()))
            .handle(command(admin.id, fx.team.id, admin.id, Role::Member))
            .await
            .unwrap_err();

        assert!(matches!(err, InvitationError::Validation(_)));
    }

    #[tokio::test]
    async fn unknown_target_is_not_found() {
        let fx = team_with_owner().await;

        let err = UpdateMemberRoleHandler::new(Arc::new(fx.store.clone()))
            .handle(command(fx.owner.id, fx.team.id, UserId::new(), Role::Admin))
            .await
            .unwrap_err();

        assert_eq!(err, InvitationError::MemberNotFound);
    }
}
