//! `reqwest`-backed implementation of [`UcmdbApi`].

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, warn};
use url::Url;

use super::error::{ClientError, Result};
use super::models::{
    ConfigurationItem, DataModelChange, TopologyData, TopologyQuery, TopologyResult,
};
use super::UcmdbApi;
use crate::config::Credentials;

/// Maximum length of a response body carried into logs and errors.
const MAX_LOG_BODY_LENGTH: usize = 200;

/// UCMDB client context sent with every authenticate call.
const CLIENT_CONTEXT: u32 = 1;

fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_LOG_BODY_LENGTH {
        return body.to_string();
    }
    let mut end = MAX_LOG_BODY_LENGTH;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... [truncated, {} bytes total]", &body[..end], body.len())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AuthenticateRequest<'a> {
    username: &'a str,
    password: &'a str,
    client_context: u32,
}

#[derive(Deserialize)]
struct AuthenticateResponse {
    token: Option<String>,
}

/// UCMDB REST client.
///
/// Authenticates lazily on the first call and keeps the session token until
/// UCMDB rejects it with a 401.
pub struct RestClient {
    http: Client,
    base_url: Url,
    username: String,
    password: SecretString,
    token: Mutex<Option<SecretString>>,
}

impl std::fmt::Debug for RestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestClient")
            .field("base_url", &self.base_url.as_str())
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl RestClient {
    /// Build a client for the given credentials.
    ///
    /// The address must be an absolute `http` or `https` URL. No request is
    /// made until the first API call.
    pub fn new(credentials: &Credentials) -> Result<Self> {
        let invalid = |reason: String| ClientError::InvalidUrl {
            address: credentials.address.clone(),
            reason,
        };

        let mut base_url = Url::parse(&credentials.address).map_err(|e| invalid(e.to_string()))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme '{}'", base_url.scheme())));
        }
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let http = Client::builder()
            .user_agent(concat!("hemmer-provider-ucmdb/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url,
            username: credentials.user.clone(),
            password: credentials.password.clone(),
            token: Mutex::new(None),
        })
    }

    /// The normalized base URL requests are resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| ClientError::InvalidUrl {
                address: format!("{}{}", self.base_url, path),
                reason: e.to_string(),
            })
    }

    async fn authenticate(&self) -> Result<SecretString> {
        let url = self.endpoint("rest-api/authenticate")?;
        debug!(user = %self.username, "Authenticating with UCMDB");

        let response = self
            .http
            .post(url)
            .json(&AuthenticateRequest {
                username: &self.username,
                password: self.password.expose_secret(),
                client_context: CLIENT_CONTEXT,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, body = %truncate_body(&body), "UCMDB authentication rejected");
            return Err(ClientError::AuthFailed(format!(
                "authenticate returned {}",
                status
            )));
        }

        let auth: AuthenticateResponse = response
            .json()
            .await
            .map_err(|e| ClientError::InvalidResponse(e.to_string()))?;
        auth.token
            .filter(|t| !t.is_empty())
            .map(|t| SecretString::new(t.into()))
            .ok_or_else(|| ClientError::AuthFailed("response did not contain a token".into()))
    }

    async fn bearer(&self) -> Result<SecretString> {
        let mut token = self.token.lock().await;
        if let Some(existing) = token.as_ref() {
            return Ok(existing.clone());
        }
        let fresh = self.authenticate().await?;
        *token = Some(fresh.clone());
        Ok(fresh)
    }

    async fn send(
        &self,
        method: Method,
        url: Url,
        build: impl FnOnce(RequestBuilder) -> RequestBuilder,
    ) -> Result<Response> {
        let token = self.bearer().await?;
        debug!(%method, %url, "UCMDB request");

        let request = self
            .http
            .request(method, url.clone())
            .bearer_auth(token.expose_secret());
        let response = build(request).send().await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = truncate_body(&body);
        match status {
            StatusCode::UNAUTHORIZED => {
                self.token.lock().await.take();
                warn!(%url, "UCMDB session token rejected");
                Err(ClientError::Unauthorized(message))
            }
            StatusCode::NOT_FOUND => Err(ClientError::NotFound(url.to_string())),
            _ => {
                warn!(%status, %url, body = %message, "UCMDB API error");
                Err(ClientError::Api {
                    status: status.as_u16(),
                    url: url.to_string(),
                    message,
                })
            }
        }
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            debug!(body = %truncate_body(&body), "Unexpected UCMDB response");
            ClientError::InvalidResponse(e.to_string())
        })
    }

    /// The URL of a single CI. The id is percent-encoded as one segment.
    fn ci_url(&self, id: &str) -> Result<Url> {
        if matches!(id, "" | "." | "..") {
            return Err(ClientError::InvalidId(id.to_string()));
        }
        let mut url = self.endpoint("rest-api/dataModel/ci/")?;
        url.path_segments_mut()
            .map_err(|()| ClientError::InvalidId(id.to_string()))?
            .pop_if_empty()
            .push(id);
        Ok(url)
    }
}

#[async_trait]
impl UcmdbApi for RestClient {
    async fn execute_query(&self, query: &TopologyQuery) -> Result<TopologyResult> {
        let response = self
            .send(
                Method::POST,
                self.endpoint("rest-api/topologyQuery")?,
                |r| r.json(query),
            )
            .await?;
        Self::decode(response).await
    }

    async fn get_configuration_item(&self, id: &str) -> Result<ConfigurationItem> {
        let response = self.send(Method::GET, self.ci_url(id)?, |r| r).await?;
        Self::decode(response).await
    }

    async fn create_data_model(&self, data: &TopologyData) -> Result<DataModelChange> {
        let response = self
            .send(
                Method::POST,
                self.endpoint("rest-api/dataModel")?,
                |r| r.json(data),
            )
            .await?;
        Self::decode(response).await
    }

    async fn update_configuration_item(
        &self,
        id: &str,
        item: &ConfigurationItem,
    ) -> Result<DataModelChange> {
        let response = self
            .send(Method::PUT, self.ci_url(id)?, |r| r.json(item))
            .await?;
        Self::decode(response).await
    }

    async fn delete_configuration_item(&self, id: &str) -> Result<DataModelChange> {
        let response = self.send(Method::DELETE, self.ci_url(id)?, |r| r).await?;
        Self::decode(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials(address: &str) -> Credentials {
        Credentials {
            address: address.into(),
            user: "admin".into(),
            password: SecretString::new("s3cret".into()),
        }
    }

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let client = RestClient::new(&credentials("https://ucmdb.example:8443/ucmdb")).unwrap();
        assert_eq!(client.base_url().as_str(), "https://ucmdb.example:8443/ucmdb/");
        assert_eq!(
            client.endpoint("rest-api/topologyQuery").unwrap().as_str(),
            "https://ucmdb.example:8443/ucmdb/rest-api/topologyQuery"
        );
    }

    #[test]
    fn test_ci_url_encodes_id_as_one_segment() {
        let client = RestClient::new(&credentials("https://ucmdb.example/ucmdb")).unwrap();
        assert_eq!(
            client.ci_url("4d1c0a").unwrap().as_str(),
            "https://ucmdb.example/ucmdb/rest-api/dataModel/ci/4d1c0a"
        );
        assert_eq!(
            client.ci_url("a/b?c#d").unwrap().as_str(),
            "https://ucmdb.example/ucmdb/rest-api/dataModel/ci/a%2Fb%3Fc%23d"
        );
        for id in ["", ".", ".."] {
            assert!(matches!(client.ci_url(id), Err(ClientError::InvalidId(_))));
        }
    }

    #[test]
    fn test_rejects_bad_addresses() {
        let err = RestClient::new(&credentials("not a url")).unwrap_err();
        assert!(matches!(err, ClientError::InvalidUrl { .. }));

        let err = RestClient::new(&credentials("ftp://ucmdb.example")).unwrap_err();
        assert!(err.to_string().contains("unsupported scheme 'ftp'"));
    }

    #[test]
    fn test_debug_hides_password() {
        let client = RestClient::new(&credentials("https://ucmdb.example")).unwrap();
        let debug = format!("{:?}", client);
        assert!(debug.contains("admin"));
        assert!(!debug.contains("s3cret"));
    }

    #[test]
    fn test_truncate_body() {
        assert_eq!(truncate_body("short"), "short");
        let long = "é".repeat(150);
        let truncated = truncate_body(&long);
        assert!(truncated.contains("[truncated, 300 bytes total]"));
    }
}
