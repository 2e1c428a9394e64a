//! reqwest-backed client for the MediaWiki/Wikibase action API.

use super::{EntityApi, wire};
use crate::config::{Credentials, SweeperConfig};
use crate::core::{Entity, EntityId, Result, StatementId, SweepError};
use crate::instrument::{Stopwatch, format_elapsed};
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Session-backed API client for one site.
///
/// Cookies from `login` are kept by the inner client; the CSRF token fetched
/// after login is attached to every write.
#[derive(Debug)]
pub struct HttpEntityApi {
    api_url: String,
    http: reqwest::Client,
    csrf_token: RwLock<Option<String>>,
    conflict_signal: String,
    debug_timing: bool,
}

impl HttpEntityApi {
    pub fn new(config: &SweeperConfig) -> Result<Self> {
        config.validate().map_err(SweepError::Config)?;
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .user_agent(config.user_agent.clone())
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            api_url: config.endpoint(),
            http,
            csrf_token: RwLock::new(None),
            conflict_signal: config.retry.retryable_signal.clone(),
            debug_timing: config.debug_api_timing,
        })
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Bot-password login followed by a CSRF token fetch.
    pub async fn login(&self, credentials: &Credentials) -> Result<()> {
        let tokens = self
            .get_json(&[("action", "query"), ("meta", "tokens"), ("type", "login")])
            .await?;
        let login_token = tokens
            .pointer("/query/tokens/logintoken")
            .and_then(Value::as_str)
            .ok_or_else(|| SweepError::Auth("login token missing from response".to_string()))?
            .to_string();

        let response = self
            .post_form(&[
                ("action", "login"),
                ("lgname", credentials.username.as_str()),
                ("lgpassword", credentials.password.as_str()),
                ("lgtoken", login_token.as_str()),
            ])
            .await?;
        let result = response
            .pointer("/login/result")
            .and_then(Value::as_str)
            .unwrap_or("Unknown");
        if result != "Success" {
            let reason = response
                .pointer("/login/reason")
                .and_then(Value::as_str)
                .unwrap_or(result);
            return Err(SweepError::Auth(format!(
                "login as '{}' failed: {}",
                credentials.username, reason
            )));
        }
        info!(user = %credentials.username, api = %self.api_url, "logged in");

        self.refresh_csrf_token().await
    }

    pub async fn refresh_csrf_token(&self) -> Result<()> {
        let tokens = self
            .get_json(&[("action", "query"), ("meta", "tokens")])
            .await?;
        let token = tokens
            .pointer("/query/tokens/csrftoken")
            .and_then(Value::as_str)
            .ok_or_else(|| SweepError::Auth("csrf token missing from response".to_string()))?;
        // An anonymous session only ever gets the placeholder token.
        if token == "+\\" {
            return Err(SweepError::Auth(
                "session is anonymous, edit token unavailable".to_string(),
            ));
        }
        *self.csrf_token.write().await = Some(token.to_string());
        Ok(())
    }

    async fn csrf_token(&self) -> Result<String> {
        self.csrf_token
            .read()
            .await
            .clone()
            .ok_or_else(|| SweepError::Auth("not logged in, no edit token".to_string()))
    }

    /// Purges the parser cache of a page. Returns `false` when the response
    /// carries no purge report.
    pub async fn purge(&self, title: &str) -> Result<bool> {
        let response = self
            .post_form(&[("action", "purge"), ("titles", title)])
            .await?;
        let Some(pages) = response.get("purge").and_then(Value::as_array) else {
            warn!(title, response = %response, "unable to purge");
            return Ok(false);
        };
        for page in pages {
            let page_title = page.get("title").and_then(Value::as_str).unwrap_or(title);
            let status = if page.get("purged").is_some() {
                "OK - purged"
            } else {
                "fail?"
            };
            info!("Page \"{}\" purge status: {}", page_title, status);
        }
        Ok(true)
    }

    async fn get_json(&self, params: &[(&str, &str)]) -> Result<Value> {
        let response = self
            .http
            .get(&self.api_url)
            .query(params)
            .query(&[("format", "json")])
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }

    async fn post_form(&self, params: &[(&str, &str)]) -> Result<Value> {
        let mut form: Vec<(&str, &str)> = params.to_vec();
        form.push(("format", "json"));
        let response = self
            .http
            .post(&self.api_url)
            .form(&form)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }

    fn log_timing(&self, action: &str, stopwatch: &Stopwatch) {
        if self.debug_timing {
            info!(
                "Elapsed time action:{}: {}.",
                action,
                format_elapsed(stopwatch.elapsed(), None)
            );
        }
    }
}

#[async_trait]
impl EntityApi for HttpEntityApi {
    async fn read_entity(&self, id: &EntityId) -> Result<Entity> {
        let stopwatch = Stopwatch::start();
        let body = self
            .get_json(&[("action", "wbgetentities"), ("ids", id.as_str())])
            .await;
        self.log_timing("wbgetentities", &stopwatch);
        wire::decode_entity(&body?, id, &self.conflict_signal)
    }

    async fn remove_statement(&self, id: &StatementId) -> Result<()> {
        let token = self.csrf_token().await?;
        let stopwatch = Stopwatch::start();
        let body = self
            .post_form(&[
                ("action", "wbremoveclaims"),
                ("claim", id.as_str()),
                ("token", token.as_str()),
            ])
            .await;
        self.log_timing("wbremoveclaims", &stopwatch);
        wire::decode_write(&body?, &self.conflict_signal)
    }
}
