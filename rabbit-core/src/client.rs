use reqwest::{header::AUTHORIZATION, Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::{error::Result, session::Session, ApiConfig, Error};

/// HTTP handle for the admin API and the asset bucket.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    asset_host: String,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("rabbit-admin/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: config.api_url.trim_end_matches('/').into(),
            asset_host: config.asset_host.trim_end_matches('/').into(),
        })
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub fn asset_host(&self) -> &str {
        &self.asset_host
    }

    pub(crate) fn http(&self) -> &Client {
        &self.http
    }

    pub(crate) fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = self.endpoint(path);
        debug!(%method, %url, "api request");
        self.http.request(method, url)
    }

    /// The api expects the raw token in `Authorization`, without a scheme.
    pub(crate) fn authorized(&self, method: Method, path: &str, session: &Session) -> RequestBuilder {
        self.request(method, path)
            .header(AUTHORIZATION, session.token.as_str())
    }
}

pub(crate) async fn check_status(res: Response) -> Result<Response> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }

    let body = res.text().await.unwrap_or_default();
    debug!(%status, body = %body, "api error response");
    if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
        return Err(Error::Unauthorized);
    }

    Err(Error::Api {
        status,
        message: error_message(status, &body),
    })
}

pub(crate) async fn read_json<T: DeserializeOwned>(res: Response) -> Result<T> {
    let res = check_status(res).await?;
    let bytes = res.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn error_message(status: StatusCode, body: &str) -> String {
    let from_json = serde_json::from_str::<Value>(body).ok().and_then(|v| {
        match v.get("message").or_else(|| v.get("error"))? {
            Value::String(s) => Some(s.clone()),
            Value::Array(items) => Some(
                items
                    .iter()
                    .map(|i| i.as_str().map(Into::into).unwrap_or_else(|| i.to_string()))
                    .collect::<Vec<String>>()
                    .join(", "),
            ),
            _ => None,
        }
    });

    match from_json {
        Some(msg) => msg,
        None if !body.trim().is_empty() => body.trim().into(),
        None => status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_lowercase(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_variants() {
        let status = StatusCode::BAD_REQUEST;
        assert_eq!(error_message(status, r#"{"message":"bad country"}"#), "bad country");
        assert_eq!(
            error_message(status, r#"{"message":["country missing","file missing"]}"#),
            "country missing, file missing"
        );
        assert_eq!(error_message(status, "  plain text  "), "plain text");
        assert_eq!(error_message(status, ""), "bad request");
    }

    #[test]
    fn test_endpoint_joins_without_double_slash() {
        let client = ApiClient::new(&ApiConfig {
            api_url: "http://localhost:3000/api/".into(),
            asset_host: "https://assets.example.com/".into(),
        })
        .unwrap();
        assert_eq!(
            client.endpoint("/open-vpn/server/all"),
            "http://localhost:3000/api/open-vpn/server/all"
        );
        assert_eq!(client.asset_host(), "https://assets.example.com");
    }
}
