use {
    crate::services::verification::GrantPolicy,
    std::{env, str::FromStr, time::Duration},
};

/// Community invite handed out with every grant. Not per-product; override
/// with `WHATSAPP_COMMUNITY_URL`.
const DEFAULT_COMMUNITY_URL: &str = "https://chat.whatsapp.com/community";

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

/// Head start given to the gateway webhook before a client-initiated
/// verification queries the store.
const DEFAULT_VERIFY_DELAY_MS: u64 = 2000;

/// Runtime configuration. Everything except `DATABASE_URL` (read by the
/// binary alone) lives here; absent optional keys degrade to disabled
/// features with clear errors, never a startup crash.
#[derive(Debug, Clone)]
pub struct Config {
    /// Shared secret for `X-Razorpay-Signature`. When unset the webhook
    /// endpoint answers 503 instead of trusting unauthenticated bodies.
    pub razorpay_webhook_secret: Option<String>,
    /// Bearer token for the operator surface. When unset the surface is
    /// disabled.
    pub admin_token: Option<String>,
    /// Workflow-automation target for fire-and-forget notifications.
    pub automation_webhook_url: Option<String>,
    pub whatsapp_community_url: String,
    pub bind_addr: String,
    pub verify_delay: Duration,
    /// Legacy amount-mismatch behavior; see [`GrantPolicy`].
    pub fallback_to_first_product: bool,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            razorpay_webhook_secret: non_empty_var("RAZORPAY_WEBHOOK_SECRET"),
            admin_token: non_empty_var("ADMIN_TOKEN"),
            automation_webhook_url: non_empty_var("AUTOMATION_WEBHOOK_URL"),
            whatsapp_community_url: non_empty_var("WHATSAPP_COMMUNITY_URL")
                .unwrap_or_else(|| DEFAULT_COMMUNITY_URL.to_string()),
            bind_addr: non_empty_var("BIND_ADDR")
                .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            verify_delay: Duration::from_millis(
                parse_var("VERIFY_DELAY_MS").unwrap_or(DEFAULT_VERIFY_DELAY_MS),
            ),
            fallback_to_first_product: parse_var("FALLBACK_TO_FIRST_PRODUCT").unwrap_or(false),
        }
    }

    pub fn grant_policy(&self) -> GrantPolicy {
        GrantPolicy {
            fallback_to_first_product: self.fallback_to_first_product,
        }
    }
}

impl Default for Config {
    /// No external collaborators, no artificial delay. What a test harness
    /// wants; production goes through [`Config::from_env`].
    fn default() -> Self {
        Self {
            razorpay_webhook_secret: None,
            admin_token: None,
            automation_webhook_url: None,
            whatsapp_community_url: DEFAULT_COMMUNITY_URL.to_string(),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            verify_delay: Duration::ZERO,
            fallback_to_first_product: false,
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_var<T: FromStr>(key: &str) -> Option<T> {
    let raw = non_empty_var(key)?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "unparseable configuration value, using default");
            None
        }
    }
}
