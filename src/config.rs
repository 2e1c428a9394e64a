use crate::retry::RetryPolicy;
use std::fmt;
use std::time::Duration;

/// Default Wikibase site.
pub const DEFAULT_SITE: &str = "www.wikidata.org";

/// Bot configuration
///
/// Built with chained setters, checked with [`SweeperConfig::validate`].
#[derive(Debug, Clone)]
pub struct SweeperConfig {
    /// Site domain, e.g. `www.wikidata.org`
    pub site: String,

    /// Explicit action API endpoint; derived from `site` when unset
    pub api_url: Option<String>,

    /// User agent sent with every request (required on WMF wikis)
    pub user_agent: String,

    /// Retry on transient write conflicts
    pub retry: RetryPolicy,

    /// Upper bound on concurrently processed chunks
    pub max_chunks: usize,

    /// Progress is logged every `progress_step` removals in id-based runs
    pub progress_step: usize,

    /// Log elapsed time of every API call
    pub debug_api_timing: bool,

    /// Per-request HTTP timeout
    pub request_timeout: Duration,
}

impl SweeperConfig {
    /// Create a configuration for a site with default settings
    pub fn new(site: &str) -> Self {
        Self {
            site: site.to_string(),
            api_url: None,
            user_agent: format!(
                "claim-sweeper/{} (bulk statement removal bot)",
                env!("CARGO_PKG_VERSION")
            ),
            retry: RetryPolicy::default(),
            max_chunks: 4,
            progress_step: 10,
            debug_api_timing: false,
            request_timeout: Duration::from_secs(60),
        }
    }

    /// Set an explicit action API endpoint
    pub fn api_url(mut self, url: &str) -> Self {
        self.api_url = Some(url.to_string());
        self
    }

    /// Set the user agent
    pub fn user_agent(mut self, user_agent: &str) -> Self {
        self.user_agent = user_agent.to_string();
        self
    }

    /// Set the retry policy
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Set maximum concurrent chunks
    pub fn max_chunks(mut self, max: usize) -> Self {
        self.max_chunks = max;
        self
    }

    /// Set the progress log interval
    pub fn progress_step(mut self, step: usize) -> Self {
        self.progress_step = step;
        self
    }

    /// Enable per-call timing logs
    pub fn debug_api_timing(mut self, enabled: bool) -> Self {
        self.debug_api_timing = enabled;
        self
    }

    /// Set the HTTP request timeout
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Action API endpoint for this configuration.
    pub fn endpoint(&self) -> String {
        match &self.api_url {
            Some(url) => url.clone(),
            None => format!("https://{}/w/api.php", self.site),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.site.trim().is_empty() {
            return Err("site must not be empty".to_string());
        }
        if self.user_agent.trim().is_empty() {
            return Err("user_agent must not be empty".to_string());
        }
        if self.max_chunks == 0 {
            return Err("max_chunks must be at least 1".to_string());
        }
        if self.progress_step == 0 {
            return Err("progress_step must be at least 1".to_string());
        }
        self.retry.validate()
    }
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self::new(DEFAULT_SITE)
    }
}

/// Bot password credentials (`Special:BotPasswords`).
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: &str, password: &str) -> Self {
        Self {
            username: username.to_string(),
            password: password.to_string(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}
