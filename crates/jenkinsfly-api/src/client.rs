// Jenkins HTTP client
//
// Wraps `reqwest::Client` with Jenkins-specific URL construction, basic
// authentication, and dialect-aware crumb headers. Only the root
// `api/json` resource is needed here: fetching it with the configured
// credentials is how a server/credential pair gets validated.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;
use crate::version::JenkinsVersion;

/// What the server told us about itself on a successful round-trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerInfo {
    /// Value of the `X-Jenkins` response header, when present.
    pub version: Option<String>,
    /// The root URL the server believes it lives at.
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RootResponse {
    #[serde(default)]
    url: Option<String>,
}

/// Raw HTTP client for the Jenkins remote access API.
pub struct JenkinsClient {
    http: reqwest::Client,
}

impl JenkinsClient {
    /// Create a new client from a `TransportConfig`.
    ///
    /// A cookie jar is added when the config has none, so a crumb issued
    /// for a session stays valid across requests.
    pub fn new(transport: &TransportConfig) -> Result<Self, Error> {
        let config = if transport.cookie_jar.is_some() {
            transport.clone()
        } else {
            transport.clone().with_cookie_jar()
        };
        let http = config.build_client()?;
        Ok(Self { http })
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// The underlying HTTP client.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Check that `base_url` answers as a Jenkins server for the given
    /// credentials.
    ///
    /// Sends `GET {base_url}/api/json`. Credentials are sent as HTTP basic
    /// auth only when `username` is non-blank; the crumb is sent only when
    /// `crumb_data` is non-blank, under the header `version` dictates.
    /// A 401 or 403 becomes [`Error::Authentication`] carrying the
    /// response page.
    pub async fn authenticate(
        &self,
        base_url: &Url,
        username: &str,
        password: &SecretString,
        crumb_data: &str,
        version: JenkinsVersion,
    ) -> Result<ServerInfo, Error> {
        let url = api_url(base_url)?;
        debug!(%url, ?version, "authenticating against jenkins");

        let mut request = self.http.get(url);
        if !username.trim().is_empty() {
            request = request.basic_auth(username, Some(password.expose_secret()));
        }
        if !crumb_data.trim().is_empty() {
            request = request.header(version.crumb_header(), crumb_data.trim());
        }

        let resp = request.send().await.map_err(Error::Transport)?;
        let status = resp.status();
        let server_version = resp
            .headers()
            .get("X-Jenkins")
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Authentication {
                message: format!(
                    "{} (HTTP {})",
                    status.canonical_reason().unwrap_or("Unauthorized"),
                    status.as_u16()
                ),
                body: Some(body).filter(|b| !b.trim().is_empty()),
            });
        }

        let body = resp.text().await.map_err(Error::Transport)?;
        if !status.is_success() {
            return Err(Error::Http {
                status: status.as_u16(),
                body,
            });
        }

        let root: RootResponse = serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body: body.clone(),
        })?;

        if let Some(ref reported) = root.url {
            if !same_location(reported, base_url) {
                warn!(
                    configured = %base_url,
                    reported = %reported,
                    "jenkins reports a different root URL; check the server's location setting"
                );
            }
        }

        debug!(version = ?server_version, "authentication successful");
        Ok(ServerInfo {
            version: server_version,
            url: root.url,
        })
    }
}

/// Build `{base}/api/json`, keeping any context path on `base`.
pub(crate) fn api_url(base: &Url) -> Result<Url, Error> {
    let mut root = base.clone();
    if !root.path().ends_with('/') {
        let path = format!("{}/", root.path());
        root.set_path(&path);
    }
    Ok(root.join("api/json")?)
}

fn same_location(reported: &str, configured: &Url) -> bool {
    reported.trim_end_matches('/') == configured.as_str().trim_end_matches('/')
}
