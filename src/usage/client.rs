//! claude.ai usage API client.
//!
//! Authenticates with the `sessionKey` cookie, resolves the organization once
//! per credential and fetches the plan usage for that organization.

use std::time::Duration;

use reqwest::header::{HeaderValue, ACCEPT, COOKIE};
use reqwest::{Client, Url};

use super::error::{check_status, UsageError};
use super::normalize::parse_usage_response;
use super::types::{OrganizationEntry, UsageRecord};
use crate::credentials::mask_credential;
use crate::settings::AppSettings;

const DEFAULT_USER_AGENT: &str = concat!("claude-checker/", env!("CARGO_PKG_VERSION"));
const MIN_REQUEST_TIMEOUT: Duration = Duration::from_secs(1);

/// Credential plus the organization id derived from it.
///
/// The organization id is only ever set through [`Session::with_organization`]
/// and dropped whenever the credential is replaced.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Session {
    credential: Option<String>,
    organization_id: Option<String>,
}

impl Session {
    /// Session for a credential, with nothing resolved yet.
    /// Blank credentials are stored as absent.
    pub fn new(credential: Option<&str>) -> Self {
        let credential = credential
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string);
        Self {
            credential,
            organization_id: None,
        }
    }

    pub fn credential(&self) -> Option<&str> {
        self.credential.as_deref()
    }

    pub fn organization_id(&self) -> Option<&str> {
        self.organization_id.as_deref()
    }

    fn with_organization(self, organization_id: String) -> Self {
        Self {
            organization_id: Some(organization_id),
            ..self
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("credential", &self.credential.as_deref().map(mask_credential))
            .field("organization_id", &self.organization_id)
            .finish()
    }
}

/// Client for the organizations and usage endpoints.
///
/// Not internally synchronized: one owner drives it (see `poller`).
pub struct UsageClient {
    http: Client,
    base_url: Url,
    session: Session,
}

impl UsageClient {
    /// Build a client from settings. The credential starts out unset.
    pub fn new(settings: &AppSettings) -> Result<Self, UsageError> {
        let base_url = parse_base_url(&settings.base_url)?;

        let user_agent = settings
            .user_agent
            .clone()
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());
        let http = Client::builder()
            .timeout(request_timeout(settings))
            .user_agent(user_agent)
            .build()
            .map_err(|e| UsageError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url,
            session: Session::default(),
        })
    }

    /// Build a client and set its credential in one step.
    pub fn with_credential(settings: &AppSettings, credential: &str) -> Result<Self, UsageError> {
        let mut client = Self::new(settings)?;
        client.set_credential(credential);
        Ok(client)
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn has_credential(&self) -> bool {
        self.session.credential.is_some()
    }

    /// Replace the credential. Always forgets the cached organization id.
    pub fn set_credential(&mut self, credential: &str) {
        self.session = Session::new(Some(credential));
        log::info!("Usage: session key replaced, organization cache cleared");
    }

    /// Fetch session and weekly utilization.
    ///
    /// Resolves the organization first if none is cached for the current
    /// credential. The two requests never overlap.
    pub async fn fetch_usage(&mut self) -> Result<UsageRecord, UsageError> {
        let credential = self
            .session
            .credential
            .clone()
            .ok_or(UsageError::MissingCredential)?;

        let organization_id = match self.session.organization_id.clone() {
            Some(id) => id,
            None => {
                let id = self.fetch_organization_id(&credential).await?;
                self.session = std::mem::take(&mut self.session).with_organization(id.clone());
                id
            }
        };

        let url = self.endpoint(&["organizations", organization_id.as_str(), "usage"])?;
        let body = self.get(url, &credential).await?;
        let record = parse_usage_response(&body)?;

        log::debug!(
            "Usage: session {:.1}%, weekly {:.1}%",
            record.session_percent,
            record.weekly_percent
        );
        Ok(record)
    }

    /// Check whether `candidate` is accepted by the backend.
    ///
    /// Returns `Ok(false)` for a rejected key and `Err` for anything that says
    /// nothing about the key (network, rate limit, server error). The client's
    /// own credential and organization cache are left exactly as they were;
    /// persisting an accepted key is up to the caller.
    pub async fn validate_credential(&self, candidate: &str) -> Result<bool, UsageError> {
        let candidate = candidate.trim();
        if candidate.is_empty() {
            return Ok(false);
        }

        match self.fetch_organization_id(candidate).await {
            Ok(_) => Ok(true),
            Err(UsageError::SessionExpired) => {
                log::debug!("Usage: candidate session key rejected");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// GET `/organizations` and take the first entry's uuid.
    async fn fetch_organization_id(&self, credential: &str) -> Result<String, UsageError> {
        let url = self.endpoint(&["organizations"])?;
        let body = self.get(url, credential).await?;

        let organizations: Vec<serde_json::Value> =
            serde_json::from_str(&body).map_err(|_| UsageError::NoOrganization)?;
        let first = organizations
            .into_iter()
            .next()
            .ok_or(UsageError::NoOrganization)?;
        let organization: OrganizationEntry =
            serde_json::from_value(first).map_err(|_| UsageError::NoOrganization)?;

        if organization.uuid.is_empty() {
            return Err(UsageError::NoOrganization);
        }

        log::info!(
            "Usage: resolved organization {} ({})",
            organization.uuid,
            organization.name.as_deref().unwrap_or("unnamed")
        );
        Ok(organization.uuid)
    }

    /// Authenticated GET returning the body of a 200 response.
    async fn get(&self, url: Url, credential: &str) -> Result<String, UsageError> {
        let cookie = HeaderValue::from_str(&format!("sessionKey={}", credential)).map_err(|_| {
            log::warn!("Usage: session key contains characters not allowed in a cookie");
            UsageError::SessionExpired
        })?;

        log::debug!("Usage: GET {}", url.path());
        let response = self
            .http
            .get(url)
            .header(COOKIE, cookie)
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .send()
            .await
            .map_err(|e| UsageError::Network(e.to_string()))?;

        let status = response.status();
        if let Err(e) = check_status(status) {
            log::warn!("Usage: request failed with status {}", status.as_u16());
            return Err(e);
        }

        response.text().await.map_err(|e| {
            log::warn!("Usage: failed to read response body: {}", e);
            UsageError::InvalidResponse
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, UsageError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| UsageError::InvalidUrl)?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

/// Configured per-request timeout, never shorter than [`MIN_REQUEST_TIMEOUT`].
fn request_timeout(settings: &AppSettings) -> Duration {
    Duration::from_secs(settings.request_timeout_secs).max(MIN_REQUEST_TIMEOUT)
}

/// Parse the configured base URL. Only http(s) URLs that can carry a path work.
fn parse_base_url(raw: &str) -> Result<Url, UsageError> {
    let url = Url::parse(raw.trim()).map_err(|_| UsageError::InvalidUrl)?;
    if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
        return Err(UsageError::InvalidUrl);
    }
    Ok(url)
}
