//! CreateCheckoutHandler - Starts a hosted checkout for a plan.

use std::sync::Arc;

use crate::domain::billing::BillingError;
use crate::domain::foundation::{AuthenticatedUser, PlanId};
use crate::ports::{BillingProvider, BillingStore, CheckoutRequest, CheckoutSession};

/// Where the provider sends the user back to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutUrls {
    pub success_url: String,
    pub cancel_url: String,
}

impl CheckoutUrls {
    /// Billing page of the frontend; the provider fills in `{CHECKOUT_SESSION_ID}`.
    pub fn for_frontend(frontend_url: &str) -> Self {
        let base = frontend_url.trim_end_matches('/');
        Self {
            success_url: format!("{}/app/billing?session_id={{CHECKOUT_SESSION_ID}}&status=success", base),
            cancel_url: format!("{}/app/billing?status=cancel", base),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateCheckoutCommand {
    pub user: AuthenticatedUser,
    pub plan_id: String,
    pub yearly: bool,
}

/// Nothing is written locally. The subscription row appears when the
/// provider reports `checkout.session.completed`, which carries the user id
/// back as `client_reference_id`.
pub struct CreateCheckoutHandler {
    store: Arc<dyn BillingStore>,
    provider: Arc<dyn BillingProvider>,
    urls: CheckoutUrls,
}

impl CreateCheckoutHandler {
    pub fn new(store: Arc<dyn BillingStore>, provider: Arc<dyn BillingProvider>, urls: CheckoutUrls) -> Self {
        Self { store, provider, urls }
    }

    pub async fn handle(&self, cmd: CreateCheckoutCommand) -> Result<CheckoutSession, BillingError> {
        let plan_id = PlanId::new(cmd.plan_id)?;
        let plan = self
            .store
            .find_plan(&plan_id)
            .await?
            .filter(|p| p.active)
            .ok_or_else(|| BillingError::PlanNotFound(plan_id.clone()))?;

        let price_id = plan.price_for(cmd.yearly).ok_or_else(|| {
            BillingError::Validation(format!("plan {} has no yearly price", plan.id))
        })?;

        let customer_id = self.store.find_customer_id(&cmd.user.id).await?;

        let session = self
            .provider
            .create_checkout_session(CheckoutRequest {
                user_id: cmd.user.id,
                price_id: price_id.to_string(),
                customer_id,
                customer_email: cmd.user.email.as_str().to_string(),
                success_url: self.urls.success_url.clone(),
                cancel_url: self.urls.cancel_url.clone(),
            })
            .await
            .map_err(|e| BillingError::Provider(e.to_string()))?;

        tracing::info!(user_id = %cmd.user.id, plan_id = %plan.id, yearly = cmd.yearly, session_id = %session.id, "checkout started");
        Ok(session)
    }
}
