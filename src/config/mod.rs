use crate::utils::error::{CopycatError, Result};
use crate::utils::validation::{validate_non_empty_string, validate_range, validate_url, Validate};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Caller identity and remote service location for one import workflow. An
/// importer built from this context is bound to exactly one tenant and user
/// and must not be shared across either.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImporterContext {
    /// Base URL of the ingestion service.
    pub base_url: String,
    /// Tenant/scope marker, forwarded as-is on every request.
    pub tenant: String,
    /// Auth token, forwarded when present.
    pub token: Option<String>,
    /// User identifier carried in the create-job request. Malformed values
    /// are rejected by the remote service.
    pub user_id: String,
    /// Fallback job profile id when a request names none.
    pub default_job_profile_id: Option<String>,
}

impl Validate for ImporterContext {
    fn validate(&self) -> Result<()> {
        validate_url("base_url", &self.base_url)?;
        validate_non_empty_string("tenant", &self.tenant)?;
        validate_non_empty_string("user_id", &self.user_id)?;
        Ok(())
    }
}

/// Per-importer tuning. All values overridable; defaults match the remote
/// pipeline's pacing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImporterOptions {
    /// TCP connect timeout.
    pub connect_timeout: Duration,
    /// Idle/read timeout applied to each request.
    pub idle_timeout: Duration,
    /// Wait between source-record poll attempts.
    pub poll_wait: Duration,
    /// Not-ready poll responses tolerated before giving up.
    pub poll_iterations: u32,
    /// Settle delay before trusting caller-supplied instance ids (overlay).
    pub update_settle: Duration,
}

impl Default for ImporterOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            idle_timeout: Duration::from_secs(20),
            poll_wait: Duration::from_millis(300),
            poll_iterations: 10,
            update_settle: Duration::from_secs(5),
        }
    }
}

impl Validate for ImporterOptions {
    fn validate(&self) -> Result<()> {
        validate_range("poll_iterations", self.poll_iterations, 1, 1000)?;
        if self.connect_timeout.is_zero() || self.idle_timeout.is_zero() {
            return Err(CopycatError::InvalidConfigValueError {
                field: "timeouts".to_string(),
                value: format!("{:?}/{:?}", self.connect_timeout, self.idle_timeout),
                reason: "Timeouts must be non-zero".to_string(),
            });
        }
        Ok(())
    }
}
