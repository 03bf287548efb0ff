//! Audit trail on the `audit` tracing target.
//!
//! Login and logout, access denials, account creation, patient deletion
//! and restore, and checkouts each emit one event. The subscriber keeps the
//! target, so deployments can route `audit` to its own sink.
//!
//! ```ignore
//! AuditEvent::new(Some(actor.to_string()), "patient.delete", Some(format!("patient:{}", id)), AuditOutcome::Success)
//!     .with_request(&headers)
//!     .log();
//! ```

use axum::http::HeaderMap;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditOutcome {
    Success,
    Failure,
    /// Authenticated but lacking the role or ability
    Denied,
}

/// Where the request came from, as far as the proxy headers tell.
#[derive(Debug, Default, Clone, Serialize)]
pub struct ClientInfo {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

impl ClientInfo {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            ip: extract_ip_from_headers(headers),
            user_agent: extract_user_agent(headers),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AuditEvent {
    /// Subject of the token; `None` for failed logins
    pub actor: Option<String>,
    /// Dotted action name, e.g. `user.login` or `pharmacy.checkout`
    pub action: String,
    /// `kind:id`, e.g. `patient:<uuid>` or `sale:42`
    pub resource: Option<String>,
    pub outcome: AuditOutcome,
    #[serde(flatten)]
    pub client: ClientInfo,
    pub at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl AuditEvent {
    pub fn new(
        actor: Option<String>,
        action: impl Into<String>,
        resource: Option<String>,
        outcome: AuditOutcome,
    ) -> Self {
        Self {
            actor,
            action: action.into(),
            resource,
            outcome,
            client: ClientInfo::default(),
            at: Utc::now(),
            details: None,
        }
    }

    pub fn with_request(mut self, headers: &HeaderMap) -> Self {
        self.client = ClientInfo::from_headers(headers);
        self
    }

    /// Attach extra context. Values that fail to serialize are dropped.
    pub fn with_details(mut self, details: impl Serialize) -> Self {
        self.details = serde_json::to_value(details).ok();
        self
    }

    pub fn log(self) {
        let details = self.details.as_ref().map(ToString::to_string);
        tracing::info!(
            target: "audit",
            actor = self.actor.as_deref(),
            action = %self.action,
            resource = self.resource.as_deref(),
            outcome = ?self.outcome,
            ip = self.client.ip.as_deref(),
            user_agent = self.client.user_agent.as_deref(),
            at = %self.at.to_rfc3339(),
            details = details.as_deref(),
            "{} {:?}",
            self.action,
            self.outcome,
        );
    }
}

/// First hop of `X-Forwarded-For`, else `X-Real-IP`.
pub fn extract_ip_from_headers(headers: &HeaderMap) -> Option<String> {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

    header("x-forwarded-for")
        .and_then(|chain| chain.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .or_else(|| header("x-real-ip"))
        .map(str::to_owned)
}

pub fn extract_user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}
