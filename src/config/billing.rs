//! Billing provider configuration (Stripe)

use serde::Deserialize;

use super::error::ValidationError;
use super::server::Environment;

#[derive(Debug, Clone, Deserialize)]
pub struct BillingConfig {
    /// Secret API key (`sk_test_...` or `sk_live_...`).
    pub stripe_api_key: String,

    /// Webhook endpoint signing secret (`whsec_...`).
    pub stripe_webhook_secret: String,

    /// Provider price for the reserved-domain add-on.
    pub reserved_domain_price_id: Option<String>,

    /// Provider price for the custom-domain add-on.
    pub custom_domain_price_id: Option<String>,

    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Frontend origin the hosted checkout returns to.
    #[serde(default = "default_frontend_url")]
    pub frontend_url: String,
}

impl BillingConfig {
    pub fn is_test_mode(&self) -> bool {
        self.stripe_api_key.starts_with("sk_test_")
    }

    pub fn validate(&self, environment: Environment) -> Result<(), ValidationError> {
        if self.stripe_api_key.is_empty() {
            return Err(ValidationError::MissingRequired("BILLING__STRIPE_API_KEY"));
        }
        if self.stripe_webhook_secret.is_empty() {
            return Err(ValidationError::MissingRequired("BILLING__STRIPE_WEBHOOK_SECRET"));
        }
        if !self.stripe_api_key.starts_with("sk_") {
            return Err(ValidationError::InvalidStripeKey);
        }
        if !self.stripe_webhook_secret.starts_with("whsec_") {
            return Err(ValidationError::InvalidStripeWebhookSecret);
        }
        if environment == Environment::Production && !self.api_base_url.starts_with("https://") {
            return Err(ValidationError::BillingUrlMustBeHttps);
        }
        if environment == Environment::Production && !self.frontend_url.starts_with("https://") {
            return Err(ValidationError::FrontendUrlMustBeHttps);
        }
        Ok(())
    }
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            stripe_api_key: String::new(),
            stripe_webhook_secret: String::new(),
            reserved_domain_price_id: None,
            custom_domain_price_id: None,
            api_base_url: default_api_base_url(),
            frontend_url: default_frontend_url(),
        }
    }
}

fn default_api_base_url() -> String {
    "https://api.stripe.com".to_string()
}

fn default_frontend_url() -> String {
    "http://localhost:3000".to_string()
}
