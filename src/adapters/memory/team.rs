//! `TeamStore` over the in-memory tables.

use async_trait::async_trait;

use crate::domain::foundation::{
    ConditionalWrite, DomainError, Email, ErrorCode, InvitationId, TeamId, Timestamp, UserId,
};
use crate::domain::team::{Invitation, InvitationStatus, InvitationToken, Membership, Role, Team};
use crate::ports::{FindOrCreate, TeamStore, TeamTransaction};

use super::{InMemoryStore, Tables, UndoLog};

#[async_trait]
impl TeamStore for InMemoryStore {
    async fn begin(&self) -> Result<Box<dyn TeamTransaction>, DomainError> {
        Ok(Box::new(InMemoryTeamTransaction {
            log: UndoLog::new(self.tables.clone()),
        }))
    }

    async fn find_team(&self, id: &TeamId) -> Result<Option<Team>, DomainError> {
        Ok(self.lock().teams.get(id).cloned())
    }

    async fn find_membership(
        &self,
        team_id: &TeamId,
        user_id: &UserId,
    ) -> Result<Option<Membership>, DomainError> {
        Ok(membership_of(&self.lock(), team_id, user_id))
    }

    async fn list_pending_invitations(&self, team_id: &TeamId) -> Result<Vec<Invitation>, DomainError> {
        let mut rows: Vec<_> = self
            .lock()
            .invitations
            .values()
            .filter(|i| i.team_id == *team_id && i.status == InvitationStatus::Pending)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn find_invitation_by_token(
        &self,
        token: &InvitationToken,
    ) -> Result<Option<Invitation>, DomainError> {
        Ok(self.lock().invitations.values().find(|i| i.token == *token).cloned())
    }
}

fn membership_of(tables: &Tables, team_id: &TeamId, user_id: &UserId) -> Option<Membership> {
    tables
        .memberships
        .values()
        .find(|m| m.team_id == *team_id && m.user_id == *user_id)
        .cloned()
}

pub struct InMemoryTeamTransaction {
    log: UndoLog,
}

impl InMemoryTeamTransaction {
    fn insert_membership_row(&mut self, membership: &Membership) {
        let id = membership.id;
        self.log.lock().memberships.insert(id, membership.clone());
        self.log.push(Box::new(move |t| {
            t.memberships.remove(&id);
        }));
    }
}

#[async_trait]
impl ConditionalWrite<Invitation> for InMemoryTeamTransaction {
    async fn compare_and_set(
        &mut self,
        key: &InvitationId,
        expected: InvitationStatus,
        target: InvitationStatus,
    ) -> Result<u64, DomainError> {
        let previous = {
            let mut tables = self.log.lock();
            match tables.invitations.get_mut(key) {
                Some(row) if row.status == expected => {
                    let previous = (row.status, row.updated_at);
                    row.status = target;
                    row.updated_at = Timestamp::now();
                    Some(previous)
                }
                _ => None,
            }
        };

        let Some((status, updated_at)) = previous else {
            return Ok(0);
        };
        let id = *key;
        self.log.push(Box::new(move |t| {
            if let Some(row) = t.invitations.get_mut(&id) {
                row.status = status;
                row.updated_at = updated_at;
            }
        }));
        Ok(1)
    }

    async fn read_status(&mut self, key: &InvitationId) -> Result<Option<InvitationStatus>, DomainError> {
        Ok(self.log.lock().invitations.get(key).map(|i| i.status))
    }
}

#[async_trait]
impl TeamTransaction for InMemoryTeamTransaction {
    async fn insert_team(&mut self, team: &Team) -> Result<(), DomainError> {
        let id = team.id;
        self.log.lock().teams.insert(id, team.clone());
        self.log.push(Box::new(move |t| {
            t.teams.remove(&id);
        }));
        Ok(())
    }

    async fn insert_membership(&mut self, membership: &Membership) -> Result<(), DomainError> {
        let exists = membership_of(&self.log.lock(), &membership.team_id, &membership.user_id).is_some();
        if exists {
            return Err(DomainError::new(
                ErrorCode::DuplicateMembership,
                "membership already exists for this user and team",
            ));
        }
        self.insert_membership_row(membership);
        Ok(())
    }

    async fn find_or_create_membership(
        &mut self,
        membership: &Membership,
    ) -> Result<FindOrCreate<Membership>, DomainError> {
        // Check and insert under one lock so two callers cannot both insert.
        let created = {
            let mut tables = self.log.lock();
            if let Some(existing) = membership_of(&tables, &membership.team_id, &membership.user_id) {
                return Ok(FindOrCreate::Found(existing));
            }
            tables.memberships.insert(membership.id, membership.clone());
            membership.clone()
        };
        let id = created.id;
        self.log.push(Box::new(move |t| {
            t.memberships.remove(&id);
        }));
        Ok(FindOrCreate::Created(created))
    }

    async fn find_membership(
        &mut self,
        team_id: &TeamId,
        user_id: &UserId,
    ) -> Result<Option<Membership>, DomainError> {
        Ok(membership_of(&self.log.lock(), team_id, user_id))
    }

    async fn update_member_role(
        &mut self,
        team_id: &TeamId,
        user_id: &UserId,
        role: Role,
    ) -> Result<u64, DomainError> {
        let previous = {
            let mut tables = self.log.lock();
            let row = tables
                .memberships
                .values_mut()
                .find(|m| m.team_id == *team_id && m.user_id == *user_id && m.role != Role::Owner);
            match row {
                Some(m) => {
                    let previous = m.clone();
                    m.role = role;
                    previous
                }
                None => return Ok(0),
            }
        };
        self.log.push(Box::new(move |t| {
            t.memberships.insert(previous.id, previous);
        }));
        Ok(1)
    }

    async fn remove_member(&mut self, team_id: &TeamId, user_id: &UserId) -> Result<u64, DomainError> {
        let removed = {
            let mut tables = self.log.lock();
            let id = match membership_of(&tables, team_id, user_id) {
                Some(m) if m.role != Role::Owner => m.id,
                _ => return Ok(0),
            };
            tables.memberships.remove(&id)
        };
        if let Some(row) = removed {
            self.log.push(Box::new(move |t| {
                t.memberships.insert(row.id, row);
            }));
            return Ok(1);
        }
        Ok(0)
    }

    async fn has_member_with_email(&mut self, team_id: &TeamId, email: &Email) -> Result<bool, DomainError> {
        let tables = self.log.lock();
        Ok(tables.memberships.values().any(|m| {
            m.team_id == *team_id
                && tables
                    .users
                    .get(&m.user_id)
                    .map_or(false, |u| u.email == *email)
        }))
    }

    async fn find_invitation_by_token(
        &mut self,
        token: &InvitationToken,
    ) -> Result<Option<Invitation>, DomainError> {
        Ok(self
            .log
            .lock()
            .invitations
            .values()
            .find(|i| i.token == *token)
            .cloned())
    }

    async fn find_invitation(
        &mut self,
        team_id: &TeamId,
        id: &InvitationId,
    ) -> Result<Option<Invitation>, DomainError> {
        Ok(self
            .log
            .lock()
            .invitations
            .get(id)
            .filter(|i| i.team_id == *team_id)
            .cloned())
    }

    async fn find_pending_invitation(
        &mut self,
        team_id: &TeamId,
        email: &Email,
    ) -> Result<Option<Invitation>, DomainError> {
        Ok(self
            .log
            .lock()
            .invitations
            .values()
            .find(|i| i.team_id == *team_id && i.email == *email && i.status == InvitationStatus::Pending)
            .cloned())
    }

    async fn insert_invitation(&mut self, invitation: &Invitation) -> Result<(), DomainError> {
        {
            let mut tables = self.log.lock();
            let duplicate = tables.invitations.values().any(|i| {
                i.team_id == invitation.team_id
                    && i.email == invitation.email
                    && i.status == InvitationStatus::Pending
            });
            if duplicate {
                return Err(DomainError::new(
                    ErrorCode::DuplicateInvitation,
                    "a pending invitation already exists for this email",
                ));
            }
            tables.invitations.insert(invitation.id, invitation.clone());
        }
        let id = invitation.id;
        self.log.push(Box::new(move |t| {
            t.invitations.remove(&id);
        }));
        Ok(())
    }

    async fn commit(mut self: Box<Self>) -> Result<(), DomainError> {
        self.log.commit();
        Ok(())
    }
}
