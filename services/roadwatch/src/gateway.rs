//! API gateway client
//!
//! One named operation per gateway endpoint, each a plain request/response
//! mapping: no retry, no caching, no timeout overrides. A failed call
//! surfaces immediately to the caller.

use std::sync::Arc;

use serde::Deserialize;

use crate::config::GatewayConfig;
use crate::io::HttpClient;
use crate::models::{DriverRecord, Session, SignupForm, SosAlert};

/// Vestigial JSONP callback parameter.
///
/// The gateway serves plain JSON and ignores this, but it has always been on
/// the wire; kept as a constant in case the server depends on its presence.
pub const JSONP_CALLBACK: (&str, &str) = ("jsonp", "callback");

/// Outcome of a credential check, discriminated by the body's status field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    Success,
    /// Server-supplied error message, or a generic fallback. Never empty.
    Failure(String),
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    error: Option<String>,
}

/// Client for the driver-monitoring REST gateway
pub struct ApiGateway {
    base_url: String,
    http: Arc<dyn HttpClient>,
}

impl std::fmt::Debug for ApiGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiGateway")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl ApiGateway {
    pub fn new(config: &GatewayConfig, http: Arc<dyn HttpClient>) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
        }
    }

    /// Driver login. A non-success body or a non-2xx status maps to
    /// `LoginOutcome::Failure`; only transport failures return `Err`.
    pub async fn login(&self, pid: &str, taxi: &str, password: &str) -> crate::Result<LoginOutcome> {
        let url = format!("{}/login", self.base_url);
        let response = self
            .http
            .post_form(&url, &[("pid", pid), ("taxi", taxi), ("password", password)])
            .await?;

        let parsed: Option<LoginResponse> = serde_json::from_str(&response.body).ok();
        let error = parsed.as_ref().and_then(|p| p.error.clone());

        if response.status / 100 != 2 {
            tracing::debug!("Login rejected with status {}", response.status);
            return Ok(LoginOutcome::Failure(
                error.unwrap_or_else(|| "Login failed".to_string()),
            ));
        }

        match parsed {
            Some(body) if body.status == "success" => Ok(LoginOutcome::Success),
            _ => Ok(LoginOutcome::Failure(
                error.unwrap_or_else(|| "Login failed".to_string()),
            )),
        }
    }

    /// Administrator login, same discrimination as `login` on a separate
    /// endpoint.
    pub async fn admin_login(&self, pid: &str, password: &str) -> crate::Result<LoginOutcome> {
        let url = format!("{}/admlogin", self.base_url);
        let response = self
            .http
            .get(&url, &[("pid", pid), ("password", password), JSONP_CALLBACK])
            .await?;

        let parsed: Option<LoginResponse> = serde_json::from_str(&response.body).ok();
        let error = parsed.as_ref().and_then(|p| p.error.clone());

        if response.status / 100 != 2 {
            tracing::debug!("Admin login rejected with status {}", response.status);
            return Ok(LoginOutcome::Failure(
                error.unwrap_or_else(|| "Login failed".to_string()),
            ));
        }

        match parsed {
            Some(body) if body.status == "success" => Ok(LoginOutcome::Success),
            _ => Ok(LoginOutcome::Failure(
                error.unwrap_or_else(|| "Login failed".to_string()),
            )),
        }
    }

    /// Current session list snapshot, order preserved
    pub async fn sessions(&self) -> crate::Result<Vec<Session>> {
        let url = format!("{}/session", self.base_url);
        let response = self.http.get(&url, &[JSONP_CALLBACK]).await?;

        if response.status / 100 != 2 {
            return Err(crate::RoadwatchError::Gateway(format!(
                "GET /session returned status {}",
                response.status
            )));
        }

        Ok(serde_json::from_str(&response.body)?)
    }

    /// Current SOS alert list snapshot, order preserved
    pub async fn sos_alerts(&self) -> crate::Result<Vec<SosAlert>> {
        let url = format!("{}/sos", self.base_url);
        let response = self.http.get(&url, &[JSONP_CALLBACK]).await?;

        if response.status / 100 != 2 {
            return Err(crate::RoadwatchError::Gateway(format!(
                "GET /sos returned status {}",
                response.status
            )));
        }

        Ok(serde_json::from_str(&response.body)?)
    }

    /// Create a driver account. The gateway defines no body contract beyond
    /// the acknowledgement status, so any 2xx is success.
    pub async fn signup(&self, form: &SignupForm) -> crate::Result<()> {
        let url = format!("{}/user", self.base_url);
        let body = serde_json::to_value(form)?;
        let response = self.http.post_json(&url, &body).await?;

        if response.status / 100 != 2 {
            return Err(crate::RoadwatchError::Gateway(format!(
                "POST /user returned status {}",
                response.status
            )));
        }

        Ok(())
    }

    /// Legacy driver registration endpoint. No response contract is defined,
    /// so a completed request counts as success regardless of status.
    pub async fn register_driver(&self, record: &DriverRecord) -> crate::Result<()> {
        let url = format!("{}/test", self.base_url);
        let body = serde_json::to_value(record)?;
        let response = self.http.post_json(&url, &body).await?;

        tracing::debug!("POST /test acknowledged with status {}", response.status);
        Ok(())
    }
}
