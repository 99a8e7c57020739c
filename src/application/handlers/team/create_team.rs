//! CreateTeamHandler - Creates a team together with its single owner membership.

use std::sync::Arc;

use crate::domain::foundation::{Timestamp, UserId};
use crate::domain::team::{InvitationError, Membership, Team};
use crate::ports::TeamStore;

#[derive(Debug, Clone)]
pub struct CreateTeamCommand {
    pub owner_id: UserId,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct CreateTeamResult {
    pub team: Team,
    pub owner: Membership,
}

pub struct CreateTeamHandler {
    store: Arc<dyn TeamStore>,
}

impl CreateTeamHandler {
    pub fn new(store: Arc<dyn TeamStore>) -> Self {
        Self { store }
    }

    pub async fn handle(&self, cmd: CreateTeamCommand) -> Result<CreateTeamResult, InvitationError> {
        let team = Team::new(cmd.name, Timestamp::now())?;
        let owner = Membership::owner_of(&team, cmd.owner_id);

        let mut tx = self.store.begin().await?;
        tx.insert_team(&team).await?;
        tx.insert_membership(&owner).await?;
        tx.commit().await?;

        tracing::info!(team_id = %team.id, owner_id = %cmd.owner_id, "team created");
        Ok(CreateTeamResult { team, owner })
    }
}
