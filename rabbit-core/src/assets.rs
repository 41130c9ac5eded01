use bytes::Bytes;
use tracing::debug;

use crate::{error::Result, ApiClient, Error};

/// File name used when saving a config without an explicit destination.
pub const DEFAULT_CONFIG_NAME: &str = "config.ovpn";

/// Resolves a stored asset reference. Absolute links are kept, anything
/// else is a key in the asset bucket.
pub fn asset_url(client: &ApiClient, reference: &str) -> Result<String> {
    let reference = reference.trim();
    if reference.is_empty() {
        return Err(Error::Invalid(
            "nothing uploaded yet (coming soon), no asset to download".into(),
        ));
    }

    if reference.starts_with("http://") || reference.starts_with("https://") {
        return Ok(reference.into());
    }

    Ok(format!(
        "{}/{}",
        client.asset_host(),
        reference.trim_start_matches('/')
    ))
}

pub async fn download_asset(client: &ApiClient, reference: &str) -> Result<Bytes> {
    let url = asset_url(client, reference)?;
    debug!(%url, "downloading asset");
    let res = client.http().get(&url).send().await?;

    // Bucket failures are never session failures.
    let status = res.status();
    if !status.is_success() {
        debug!(%status, %url, "asset request failed");
        return Err(Error::Asset { status, url });
    }
    Ok(res.bytes().await?)
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;

    use super::*;
    use crate::ApiConfig;

    fn client_with_assets(asset_host: String) -> ApiClient {
        ApiClient::new(&ApiConfig {
            api_url: "http://127.0.0.1:9".into(),
            asset_host,
        })
        .unwrap()
    }

    #[test]
    fn test_asset_url() {
        let client = client_with_assets("https://rabbitvpn.sgp1.digitaloceanspaces.com".into());
        assert_eq!(
            asset_url(&client, "configs/de.ovpn").unwrap(),
            "https://rabbitvpn.sgp1.digitaloceanspaces.com/configs/de.ovpn"
        );
        assert_eq!(
            asset_url(&client, "/flags/de.png").unwrap(),
            "https://rabbitvpn.sgp1.digitaloceanspaces.com/flags/de.png"
        );
        assert_eq!(
            asset_url(&client, "https://cdn.example.com/de.png").unwrap(),
            "https://cdn.example.com/de.png"
        );
        assert!(matches!(asset_url(&client, ""), Err(Error::Invalid(_))));
    }

    #[tokio::test]
    async fn test_download_asset() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/configs/de.ovpn");
                then.status(200).body("client\nremote 1.2.3.4 1194\n");
            })
            .await;

        let client = client_with_assets(server.base_url());
        let bytes = download_asset(&client, "configs/de.ovpn").await.unwrap();
        mock.assert_async().await;
        assert_eq!(&bytes[..], b"client\nremote 1.2.3.4 1194\n");
    }

    #[tokio::test]
    async fn test_denied_asset_does_not_ask_for_login() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/configs/missing.ovpn");
                then.status(403).body("<Error><Code>AccessDenied</Code></Error>");
            })
            .await;

        let client = client_with_assets(server.base_url());
        let err = download_asset(&client, "configs/missing.ovpn")
            .await
            .unwrap_err();
        assert!(matches!(
            &err,
            Error::Asset { status, .. } if *status == reqwest::StatusCode::FORBIDDEN
        ));
        assert!(!err.needs_login());
    }
}
