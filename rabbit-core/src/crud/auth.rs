use reqwest::Method;
use tracing::{info, warn};

use crate::{
    client::read_json,
    error::Result,
    models::auth::{LoginRequest, TokenResponse},
    session::Session,
    ApiClient, Error,
};

/// Exchanges admin credentials for a session valid for ten minutes.
///
/// Nothing is sent when either field is empty. Storing the returned session
/// is up to the caller.
pub async fn login(client: &ApiClient, req: &LoginRequest) -> Result<Session> {
    if !req.is_complete() {
        return Err(Error::Invalid("username and password are required".into()));
    }

    let res = client
        .request(Method::POST, "/auth/admin")
        .json(req)
        .send()
        .await?;
    let token: TokenResponse = match read_json(res).await {
        Ok(t) => t,
        Err(e) => {
            warn!(username = %req.username, error = %e, "login failed");
            return Err(e);
        }
    };

    if token.token.is_empty() {
        return Err(Error::Invalid("api returned an empty token".into()));
    }

    info!(username = %req.username, "logged in");
    Ok(Session::new(token.token))
}
