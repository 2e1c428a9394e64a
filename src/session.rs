//! Per-site registry of logged-in API clients.

use crate::api::HttpEntityApi;
use crate::config::{Credentials, SweeperConfig};
use crate::core::{Result, SweepError};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};
use tracing::info;

/// Creates one logged-in [`HttpEntityApi`] per site on first use and hands
/// out the same client afterwards.
///
/// Sessions live as long as the registry; `close` or dropping the registry
/// tears them down. The registry is passed to whoever needs a client instead
/// of being reachable as global state.
pub struct SessionRegistry {
    base: SweeperConfig,
    credentials: Credentials,
    endpoints: HashMap<String, String>,
    sessions: Mutex<HashMap<String, Arc<OnceCell<Arc<HttpEntityApi>>>>>,
}

impl SessionRegistry {
    pub fn new(base: SweeperConfig, credentials: Credentials) -> Self {
        Self {
            base,
            credentials,
            endpoints: HashMap::new(),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Use `url` as the action API endpoint of `site` (test wikis, mirrors).
    pub fn with_endpoint(mut self, site: &str, url: &str) -> Self {
        self.endpoints.insert(site.to_string(), url.to_string());
        self
    }

    pub fn base_config(&self) -> &SweeperConfig {
        &self.base
    }

    /// Config used for `site`. The base config's explicit endpoint only
    /// applies to the base site; endpoints registered per site win.
    pub fn config_for(&self, site: &str) -> SweeperConfig {
        let mut config = self.base.clone();
        if site != self.base.site {
            config.site = site.to_string();
            config.api_url = None;
        }
        if let Some(url) = self.endpoints.get(site) {
            config.api_url = Some(url.clone());
        }
        config
    }

    /// Logged-in client for `site`. A failed login leaves nothing cached.
    ///
    /// Concurrent callers for the same site wait for a single login; other
    /// sites are not blocked by it.
    pub async fn get(&self, site: &str) -> Result<Arc<HttpEntityApi>> {
        let cell = {
            let mut sessions = self.sessions.lock().await;
            Arc::clone(sessions.entry(site.to_string()).or_default())
        };

        let api = cell
            .get_or_try_init(|| async {
                let api = HttpEntityApi::new(&self.config_for(site))?;
                api.login(&self.credentials).await?;
                info!(site, "session registered");
                Ok::<_, SweepError>(Arc::new(api))
            })
            .await?;
        Ok(Arc::clone(api))
    }

    /// Client for the base site.
    pub async fn default_session(&self) -> Result<Arc<HttpEntityApi>> {
        let site = self.base.site.clone();
        self.get(&site).await
    }

    pub async fn sites(&self) -> Vec<String> {
        let mut sites: Vec<String> = self
            .sessions
            .lock()
            .await
            .iter()
            .filter(|(_, cell)| cell.initialized())
            .map(|(site, _)| site.clone())
            .collect();
        sites.sort();
        sites
    }

    /// Drops every cached session.
    pub async fn close(&self) {
        let mut sessions = self.sessions.lock().await;
        let count = sessions.values().filter(|cell| cell.initialized()).count();
        sessions.clear();
        info!(sessions = count, "session registry closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock_wiki::{
        CSRF_TOKEN, api_url, mount_csrf_token, mount_login_result, mount_login_token,
        mount_successful_login,
    };
    use std::time::Duration;
    use tokio::time::Instant;
    use wiremock::MockServer;

    fn registry(api_url: &str) -> SessionRegistry {
        let config = SweeperConfig::new("wiki.invalid")
            .api_url(api_url)
            .request_timeout(Duration::from_secs(10));
        SessionRegistry::new(config, Credentials::new("Bot@test", "secret"))
    }

    #[test]
    fn explicit_endpoint_only_applies_to_base_site() {
        let registry = registry("http://127.0.0.1:1/w/api.php")
            .with_endpoint("test.wikidata.org", "http://127.0.0.1:2/w/api.php");
        assert_eq!(
            registry.config_for("wiki.invalid").endpoint(),
            "http://127.0.0.1:1/w/api.php"
        );
        assert_eq!(
            registry.config_for("pl.wikipedia.org").endpoint(),
            "https://pl.wikipedia.org/w/api.php"
        );
        assert_eq!(
            registry.config_for("test.wikidata.org").endpoint(),
            "http://127.0.0.1:2/w/api.php"
        );
    }

    #[tokio::test]
    async fn failed_login_is_not_cached() {
        let registry = registry("http://127.0.0.1:1/w/api.php");

        assert!(registry.default_session().await.is_err());
        assert!(registry.sites().await.is_empty());
    }

    #[tokio::test]
    async fn rejected_login_is_retried_on_next_get() {
        let server = MockServer::start().await;
        mount_login_token(&server, None).await;
        mount_login_result(&server, "Failed", 2).await;
        let registry = registry(&api_url(&server));

        for _ in 0..2 {
            assert!(matches!(
                registry.default_session().await,
                Err(SweepError::Auth(_))
            ));
        }
        assert!(registry.sites().await.is_empty());
    }

    #[tokio::test]
    async fn second_get_reuses_the_session() {
        let server = MockServer::start().await;
        mount_successful_login(&server, 1).await;
        let registry = registry(&api_url(&server));

        let first = registry.get("wiki.invalid").await.unwrap();
        let second = registry.get("wiki.invalid").await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.sites().await, vec!["wiki.invalid".to_string()]);

        registry.close().await;
        assert!(registry.sites().await.is_empty());
    }

    #[tokio::test]
    async fn concurrent_gets_share_one_login() {
        let server = MockServer::start().await;
        mount_successful_login(&server, 1).await;
        let registry = registry(&api_url(&server));

        let (first, second) = tokio::join!(
            registry.get("wiki.invalid"),
            registry.get("wiki.invalid")
        );

        assert!(Arc::ptr_eq(&first.unwrap(), &second.unwrap()));
    }

    #[tokio::test]
    async fn slow_login_does_not_block_other_sites() {
        let slow = MockServer::start().await;
        mount_login_token(&slow, Some(Duration::from_secs(2))).await;
        mount_login_result(&slow, "Success", 1).await;
        mount_csrf_token(&slow, CSRF_TOKEN).await;
        let fast = MockServer::start().await;
        mount_successful_login(&fast, 1).await;
        let registry = registry(&api_url(&fast)).with_endpoint("slow.test", &api_url(&slow));
        registry.get("wiki.invalid").await.unwrap();

        let cached_lookup = async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            let started = Instant::now();
            let api = registry.get("wiki.invalid").await;
            (api, started.elapsed())
        };
        let (slow_result, (cached, waited)) =
            tokio::join!(registry.get("slow.test"), cached_lookup);

        assert!(slow_result.is_ok());
        assert!(cached.is_ok());
        assert!(waited < Duration::from_secs(1), "{:?}", waited);
    }
}
