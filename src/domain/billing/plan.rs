//! Billing plans.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::PlanId;

/// A sellable plan and the provider prices that map to it.
///
/// A subscription resolves to a plan when its provider price id equals
/// either the monthly or the yearly price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub id: PlanId,
    pub name: String,
    pub monthly_price_id: String,
    pub yearly_price_id: Option<String>,
    pub active: bool,
}

impl Plan {
    pub fn matches_price(&self, price_id: &str) -> bool {
        self.monthly_price_id == price_id || self.yearly_price_id.as_deref() == Some(price_id)
    }

    /// Price to check out with. `None` when yearly billing is not offered.
    pub fn price_for(&self, yearly: bool) -> Option<&str> {
        if yearly {
            self.yearly_price_id.as_deref()
        } else {
            Some(self.monthly_price_id.as_str())
        }
    }
}
