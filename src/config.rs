use std::time::Duration;

pub const DEFAULT_GATEWAY_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_APPROVAL_TIMEOUT: Duration = Duration::from_secs(300);

/// Timeout budgets for one transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// Bound on each provider call (create, capture).
    pub gateway_timeout: Duration,
    /// Bound on the payer's approval wait.
    pub approval_timeout: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            gateway_timeout: DEFAULT_GATEWAY_TIMEOUT,
            approval_timeout: DEFAULT_APPROVAL_TIMEOUT,
        }
    }
}

impl CoordinatorConfig {
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Builds the config from any variable source; unset or unparsable
    /// values keep their defaults.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            gateway_timeout: millis(var("PAYCOORD_GATEWAY_TIMEOUT_MS"))
                .unwrap_or(DEFAULT_GATEWAY_TIMEOUT),
            approval_timeout: millis(var("PAYCOORD_APPROVAL_TIMEOUT_MS"))
                .unwrap_or(DEFAULT_APPROVAL_TIMEOUT),
        }
    }
}

/// Settings for the REST order gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpGatewayConfig {
    pub base_url: String,
    pub access_token: String,
    /// Transport-level timeout applied by the HTTP client itself.
    pub timeout: Duration,
}

impl HttpGatewayConfig {
    pub fn new(base_url: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            access_token: access_token.into(),
            timeout: DEFAULT_GATEWAY_TIMEOUT,
        }
    }

    /// `None` when no provider URL is configured.
    pub fn from_env() -> Option<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let base_url = var("PAYCOORD_PROVIDER_URL").filter(|url| !url.is_empty())?;
        Some(Self {
            base_url,
            access_token: var("PAYCOORD_ACCESS_TOKEN").unwrap_or_default(),
            timeout: millis(var("PAYCOORD_GATEWAY_TIMEOUT_MS")).unwrap_or(DEFAULT_GATEWAY_TIMEOUT),
        })
    }
}

fn millis(value: Option<String>) -> Option<Duration> {
    value
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_millis)
}
