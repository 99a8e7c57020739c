//! Invitation lifecycle settings

use serde::Deserialize;

use super::error::ValidationError;
use crate::domain::team::DEFAULT_EXPIRY_DAYS;

#[derive(Debug, Clone, Deserialize)]
pub struct InvitationConfig {
    /// Days an invitation stays acceptable after it is issued.
    #[serde(default = "default_expiry_days")]
    pub expiry_days: i64,
}

impl InvitationConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(1..=90).contains(&self.expiry_days) {
            return Err(ValidationError::InvalidInvitationExpiry);
        }
        Ok(())
    }
}

impl Default for InvitationConfig {
    fn default() -> Self {
        Self {
            expiry_days: default_expiry_days(),
        }
    }
}

fn default_expiry_days() -> i64 {
    DEFAULT_EXPIRY_DAYS
}
