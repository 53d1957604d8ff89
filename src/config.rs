use std::net::SocketAddr;
use std::time::Duration;

/// Tuning for the per-agent commit stage of a distribution run.
///
/// Commits for different agents are independent, so they are dispatched
/// through a bounded worker pool. Each write carries a timeout and a single
/// retry for transient store failures.
#[derive(Debug, Clone)]
pub struct CommitConfig {
    /// Maximum number of in-flight per-agent writes.
    pub concurrency: usize,
    /// Timeout applied to each individual write attempt.
    pub timeout: Duration,
    /// Additional attempts after the first failure (0 = no retry).
    pub retries: u32,
}

impl Default for CommitConfig {
    fn default() -> Self {
        Self {
            concurrency: 8,
            timeout: Duration::from_secs(5),
            retries: 1,
        }
    }
}

/// Administrator credentials used by the idempotent bootstrap step.
///
/// Read from the environment, never embedded in the binary. If unset the
/// server starts with an empty user store and logs a warning.
#[derive(Debug, Clone)]
pub struct AdminCredentials {
    pub email: String,
    pub password: String,
}

impl AdminCredentials {
    pub const EMAIL_VAR: &'static str = "LEADSPLIT_ADMIN_EMAIL";
    pub const PASSWORD_VAR: &'static str = "LEADSPLIT_ADMIN_PASSWORD";

    /// Load credentials from the environment. Returns `None` unless both
    /// variables are present and non-empty.
    pub fn from_env() -> Option<Self> {
        let email = std::env::var(Self::EMAIL_VAR).ok()?;
        let password = std::env::var(Self::PASSWORD_VAR).ok()?;
        if email.is_empty() || password.is_empty() {
            return None;
        }
        Some(Self { email, password })
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub listen_addr: SocketAddr,
    pub admin: Option<AdminCredentials>,
    pub commit: CommitConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:5000".parse().expect("valid default address"),
            admin: None,
            commit: CommitConfig::default(),
        }
    }
}
