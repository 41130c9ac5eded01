use reqwest::Method;
use tracing::info;
use urlencoding::encode;

use crate::{
    client::{check_status, read_json},
    error::Result,
    models::{
        servers::{NewServer, PatchBody, Server, ServerPatch},
        Envelope,
    },
    session::Session,
    ApiClient, Error,
};

fn server_path(id: &str) -> String {
    format!("/open-vpn/{}", encode(id))
}

/// Fetches every record. Filtering happens client side afterwards.
pub async fn get_servers(client: &ApiClient, session: &Session) -> Result<Vec<Server>> {
    let res = client
        .authorized(Method::GET, "/open-vpn/server/all", session)
        .send()
        .await?;
    let envelope: Envelope<Vec<Server>> = read_json(res).await?;
    Ok(envelope.data)
}

pub async fn get_server_by_id(client: &ApiClient, session: &Session, id: &str) -> Result<Server> {
    get_servers(client, session)
        .await?
        .into_iter()
        .find(|s| s.id == id)
        .ok_or_else(|| Error::Invalid(format!("no server with id '{id}'")))
}

pub async fn create_server(client: &ApiClient, session: &Session, new: NewServer) -> Result<()> {
    let country = new.country.clone().unwrap_or_default();
    let form = new.into_form().into_multipart();
    let res = client
        .authorized(Method::POST, "/open-vpn", session)
        .multipart(form)
        .send()
        .await?;
    check_status(res).await?;

    info!(%country, "created server");
    Ok(())
}

/// Sends the patch as JSON, or as multipart when it carries files.
pub async fn update_server(
    client: &ApiClient,
    session: &Session,
    id: &str,
    patch: ServerPatch,
) -> Result<()> {
    let req = client.authorized(Method::PATCH, &server_path(id), session);
    let req = match patch.into_body() {
        PatchBody::Json(fields) => req.json(&fields),
        PatchBody::Multipart(form) => req.multipart(form.into_multipart()),
    };
    check_status(req.send().await?).await?;

    info!(%id, "updated server");
    Ok(())
}

pub async fn delete_server(client: &ApiClient, session: &Session, id: &str) -> Result<()> {
    let res = client
        .authorized(Method::DELETE, &server_path(id), session)
        .send()
        .await?;
    check_status(res).await?;

    info!(%id, "deleted server");
    Ok(())
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use serde_json::json;

    use super::*;
    use crate::{
        filters::{ServerFilter, StatusFilter},
        models::servers::{Credentials, Upload},
        ApiConfig,
    };

    fn client_for(server: &MockServer) -> ApiClient {
        ApiClient::new(&ApiConfig {
            api_url: server.base_url(),
            asset_host: server.base_url(),
        })
        .unwrap()
    }

    fn record(id: &str, country: &str, url: &str) -> serde_json::Value {
        json!({
            "_id": id,
            "country": country,
            "cityname": "FREE",
            "isFreeOpenVpn": true,
            "isProton": false,
            "username": "u",
            "password": "p",
            "url": url,
            "flag": "",
            "hide": false
        })
    }

    #[tokio::test]
    async fn test_get_servers_sends_raw_token() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/open-vpn/server/all")
                    .header("authorization", "tok");
                then.status(200).json_body(json!({
                    "data": [record("1", "Germany", "a.ovpn"), record("2", "Japan", "")]
                }));
            })
            .await;

        let servers = get_servers(&client_for(&server), &Session::new("tok"))
            .await
            .unwrap();
        mock.assert_async().await;
        assert_eq!(servers.len(), 2);

        let filter = ServerFilter {
            status: StatusFilter::ComingSoon,
            ..Default::default()
        };
        let coming: Vec<&str> = filter.apply(&servers).iter().map(|s| s.id.as_str()).collect();
        assert_eq!(coming, vec!["2"]);
    }

    #[tokio::test]
    async fn test_get_servers_unauthorized() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/open-vpn/server/all");
                then.status(401);
            })
            .await;

        let err = get_servers(&client_for(&server), &Session::new("stale"))
            .await
            .unwrap_err();
        assert!(err.needs_login());
    }

    #[tokio::test]
    async fn test_create_sends_credentials_in_multipart() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/open-vpn")
                    .header("authorization", "tok")
                    .body_includes("name=\"username\"\r\n\r\nu\r\n")
                    .body_includes("name=\"password\"\r\n\r\np\r\n")
                    .body_includes("name=\"isFreeOpenVpn\"\r\n\r\ntrue\r\n")
                    .body_includes("filename=\"de.ovpn\"");
                then.status(201).json_body(json!({"message": "created"}));
            })
            .await;

        let new = NewServer {
            country: Some("Germany".into()),
            cityname: Some("FREE".into()),
            classification: None,
            free_open_vpn: Some(Credentials {
                username: "u".into(),
                password: "p".into(),
            }),
            proton: false,
            file: Some(Upload::new("de.ovpn", b"client\n".to_vec())),
        };
        create_server(&client_for(&server), &Session::new("tok"), new)
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_create_surfaces_api_message() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/open-vpn");
                then.status(400)
                    .json_body(json!({"message": ["file is required"]}));
            })
            .await;

        let err = create_server(&client_for(&server), &Session::new("tok"), NewServer::default())
            .await
            .unwrap_err();
        match err {
            Error::Api { status, message } => {
                assert_eq!(status.as_u16(), 400);
                assert_eq!(message, "file is required");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_update_sends_json_without_id() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(PATCH)
                    .path("/open-vpn/1")
                    .header("authorization", "tok")
                    .json_body(json!({
                        "country": "Germany",
                        "cityname": "FREE",
                        "isFreeOpenVpn": true,
                        "isProton": false,
                        "username": "u",
                        "password": "p",
                        "flag": "",
                        "url": "a.ovpn",
                        "hide": true
                    }));
                then.status(200);
            })
            .await;

        let current: Server = serde_json::from_value(record("1", "Germany", "a.ovpn")).unwrap();
        let mut patch = ServerPatch::from(&current);
        patch.hide = true;
        update_server(&client_for(&server), &Session::new("tok"), "1", patch)
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_update_with_file_is_multipart() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(PATCH)
                    .path("/open-vpn/1")
                    .body_includes("filename=\"new.ovpn\"");
                then.status(200);
            })
            .await;

        let current: Server = serde_json::from_value(record("1", "Germany", "a.ovpn")).unwrap();
        let mut patch = ServerPatch::from(&current);
        patch.config_file = Some(Upload::new("new.ovpn", b"remote 1.2.3.4".to_vec()));
        update_server(&client_for(&server), &Session::new("tok"), "1", patch)
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_delete_then_refetch_drops_record() {
        let server = MockServer::start_async().await;
        let delete = server
            .mock_async(|when, then| {
                when.method(DELETE)
                    .path("/open-vpn/1")
                    .header("authorization", "tok");
                then.status(200);
            })
            .await;
        let list = server
            .mock_async(|when, then| {
                when.method(GET).path("/open-vpn/server/all");
                then.status(200)
                    .json_body(json!({"data": [record("2", "Japan", "b.ovpn")]}));
            })
            .await;

        let client = client_for(&server);
        let session = Session::new("tok");
        delete_server(&client, &session, "1").await.unwrap();
        let servers = get_servers(&client, &session).await.unwrap();

        delete.assert_async().await;
        list.assert_async().await;
        assert!(servers.iter().all(|s| s.id != "1"));
    }

    #[tokio::test]
    async fn test_get_server_by_id_unknown() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/open-vpn/server/all");
                then.status(200).json_body(json!({"data": []}));
            })
            .await;

        let err = get_server_by_id(&client_for(&server), &Session::new("tok"), "nope")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Invalid(_)));
    }
}
