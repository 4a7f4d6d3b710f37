// ecoNET HTTP client
//
// Wraps `reqwest::Client` with basic auth, `/service/{endpoint}` URL
// construction, timeout retries and `{…Ver, data}` envelope unwrapping.
// Parameter writes go through `/econet/rmNewParam` and must be
// acknowledged with `{"result": "OK"}`.

use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::endpoint::{Endpoint, ServiceQuery};
use crate::error::Error;
use crate::models::{Envelope, SysParams};
use crate::transport::TransportConfig;

/// Username + password sent as HTTP basic auth on every request.
#[derive(Debug, Clone)]
pub struct BasicCredentials {
    pub username: String,
    pub password: SecretString,
}

/// Raw HTTP client for the controller's local API.
///
/// Returns unwrapped payloads: the version envelope is split off before
/// the caller sees it, and write acknowledgements are checked here.
pub struct EconetClient {
    http: reqwest::Client,
    base_url: Url,
    credentials: Option<BasicCredentials>,
    transport: TransportConfig,
}

impl EconetClient {
    /// Create a client from a `TransportConfig`.
    ///
    /// `base_url` is the controller root, e.g. `http://192.168.1.50`.
    pub fn new(
        base_url: Url,
        credentials: Option<BasicCredentials>,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self {
            http,
            base_url,
            credentials,
            transport: transport.clone(),
        })
    }

    /// Create a client around a pre-built `reqwest::Client`.
    pub fn with_client(
        http: reqwest::Client,
        base_url: Url,
        credentials: Option<BasicCredentials>,
        transport: TransportConfig,
    ) -> Self {
        Self {
            http,
            base_url,
            credentials,
            transport,
        }
    }

    /// The controller base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// `{base}/service/{endpoint}?uid=..[&lang=..]`
    pub(crate) fn service_url(&self, endpoint: Endpoint, query: &ServiceQuery) -> Result<Url, Error> {
        let mut url = self.join(&format!("service/{}", endpoint.name()))?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("uid", &query.uid);
            if endpoint.is_localized() {
                pairs.append_pair("lang", &query.lang);
            }
        }
        Ok(url)
    }

    /// `{base}/econet/{path}`
    pub(crate) fn econet_url(&self, path: &str) -> Result<Url, Error> {
        self.join(&format!("econet/{path}"))
    }

    fn join(&self, path: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}/{path}"))?)
    }

    // ── Endpoints ────────────────────────────────────────────────────

    /// Fetch one remote-menu endpoint and split off its version token.
    pub async fn fetch(&self, endpoint: Endpoint, query: &ServiceQuery) -> Result<Envelope, Error> {
        let url = self.service_url(endpoint, query)?;
        let body: Value = self.get_json(url).await?;
        Envelope::from_value(endpoint.name(), body)
    }

    /// Controller identity and firmware info.
    ///
    /// `GET /econet/sysParams`
    pub async fn sys_params(&self) -> Result<SysParams, Error> {
        let url = self.econet_url("sysParams")?;
        debug!("fetching sysParams");
        self.get_json(url).await
    }

    /// Write a remote-menu parameter by its structure number.
    ///
    /// `GET /econet/rmNewParam?newParamIndex={number}&newParamValue={value}`
    pub async fn set_param(&self, number: u32, value: &str) -> Result<(), Error> {
        let mut url = self.econet_url("rmNewParam")?;
        url.query_pairs_mut()
            .append_pair("newParamIndex", &number.to_string())
            .append_pair("newParamValue", value);
        debug!(number, value, "writing parameter");

        let ack: Value = self.get_json(url).await?;
        match ack.get("result").and_then(Value::as_str) {
            Some("OK") => Ok(()),
            Some(other) => Err(Error::WriteRejected {
                message: format!("controller answered result={other}"),
            }),
            None => Err(Error::WriteRejected {
                message: format!("no result in acknowledgement: {ack}"),
            }),
        }
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// GET with basic auth, retrying on timeouts, and decode the JSON body.
    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        let attempts = self.transport.attempts();
        let mut attempt = 0;
        loop {
            attempt += 1;
            debug!(attempt, "GET {}", url);

            let mut builder = self.http.get(url.clone());
            if let Some(ref creds) = self.credentials {
                builder = builder.basic_auth(&creds.username, Some(creds.password.expose_secret()));
            }

            match builder.send().await {
                Ok(resp) => return Self::parse_body(resp).await,
                Err(e) if e.is_timeout() => {
                    if attempt >= attempts {
                        return Err(Error::Timeout {
                            timeout_secs: self.transport.timeout.as_secs(),
                            attempts,
                        });
                    }
                    warn!(attempt, attempts, "request timed out, retrying");
                    tokio::time::sleep(self.transport.retry_delay).await;
                }
                Err(e) => return Err(Error::Transport(e)),
            }
        }
    }

    /// Map HTTP status, then decode the body with a preview on failure.
    async fn parse_body<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
        let status = resp.status();

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(Error::Authentication {
                message: "controller rejected the configured credentials".into(),
            });
        }

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Http {
                status: status.as_u16(),
                body: preview(&body).to_owned(),
            });
        }

        let body = resp.text().await.map_err(Error::Transport)?;
        serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: format!("{e} (body preview: {:?})", preview(&body)),
            body: body.clone(),
        })
    }
}

/// First 200 bytes of a body, cut on a char boundary.
fn preview(body: &str) -> &str {
    let mut end = body.len().min(200);
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client(base: &str) -> EconetClient {
        EconetClient::with_client(
            reqwest::Client::new(),
            Url::parse(base).unwrap(),
            None,
            TransportConfig::default(),
        )
    }

    #[test]
    fn service_url_includes_lang_only_for_localized_endpoints() {
        let c = client("http://10.0.0.5/");
        let q = ServiceQuery::new("ABC123", "pl");

        let names = c.service_url(Endpoint::ParamsNames, &q).unwrap();
        assert_eq!(
            names.as_str(),
            "http://10.0.0.5/service/rmParamsNames?uid=ABC123&lang=pl"
        );

        let data = c.service_url(Endpoint::ParamsData, &q).unwrap();
        assert_eq!(data.as_str(), "http://10.0.0.5/service/rmParamsData?uid=ABC123");
    }

    #[test]
    fn preview_respects_char_boundaries() {
        let body = "ł".repeat(150);
        let p = preview(&body);
        assert!(p.len() <= 200);
        assert!(body.starts_with(p));
    }
}
