//! Team and membership entities.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{MembershipId, TeamId, Timestamp, UserId, ValidationError};

use super::Role;

const MAX_TEAM_NAME_LEN: usize = 120;

/// A tenant. Every team is created together with its owner membership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    pub created_at: Timestamp,
}

impl Team {
    pub fn new(name: impl Into<String>, now: Timestamp) -> Result<Self, ValidationError> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(ValidationError::empty_field("name"));
        }
        if name.chars().count() > MAX_TEAM_NAME_LEN {
            return Err(ValidationError::out_of_range(
                "name",
                1,
                MAX_TEAM_NAME_LEN as i64,
                name.chars().count() as i64,
            ));
        }
        Ok(Self {
            id: TeamId::new(),
            name,
            created_at: now,
        })
    }
}

/// Links a user to a team.
///
/// # Invariants
///
/// - unique per `(user_id, team_id)`; writers insert-or-find, never duplicate
/// - the only `Owner` row of a team is the one created with the team
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub id: MembershipId,
    pub user_id: UserId,
    pub team_id: TeamId,
    pub role: Role,
    pub created_at: Timestamp,
}

impl Membership {
    /// The owner row written alongside a new team.
    pub fn owner_of(team: &Team, user_id: UserId) -> Self {
        Self {
            id: MembershipId::new(),
            user_id,
            team_id: team.id,
            role: Role::Owner,
            created_at: team.created_at,
        }
    }

    /// A membership granted by an accepted invitation.
    pub fn invited(user_id: UserId, team_id: TeamId, role: Role, now: Timestamp) -> Self {
        Self {
            id: MembershipId::new(),
            user_id,
            team_id,
            role,
            created_at: now,
        }
    }

    pub fn can_manage_invitations(&self) -> bool {
        self.role.can_manage_invitations()
    }

    pub fn can_manage_members(&self) -> bool {
        self.role.can_manage_members()
    }

    pub fn is_owner(&self) -> bool {
        self.role == Role::Owner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn team_name_is_trimmed_and_required() {
        let team = Team::new("  Acme  ", Timestamp::now()).unwrap();
        assert_eq!(team.name, "Acme");
        assert!(Team::new("   ", Timestamp::now()).is_err());
    }

    #[test]
    fn team_name_has_upper_bound() {
        let long = "x".repeat(MAX_TEAM_NAME_LEN + 1);
        assert!(Team::new(long, Timestamp::now()).is_err());
    }

    #[test]
    fn owner_membership_points_at_team() {
        let team = Team::new("Acme", Timestamp::now()).unwrap();
        let owner = UserId::new();
        let membership = Membership::owner_of(&team, owner);

        assert_eq!(membership.team_id, team.id);
        assert_eq!(membership.user_id, owner);
        assert_eq!(membership.role, Role::Owner);
        assert!(membership.can_manage_invitations());
    }
}
