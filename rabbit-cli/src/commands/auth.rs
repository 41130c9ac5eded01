use anyhow::Context;
use dialoguer::{Input, Password};
use rabbit_core::{crud::auth, models::auth::LoginRequest, session::SessionStore};

use super::AppContext;

/// Prompts for whatever was not given on the command line.
pub async fn login(
    ctx: &AppContext,
    username: Option<String>,
    password: Option<String>,
) -> anyhow::Result<()> {
    let username = match username {
        Some(u) => u,
        None => Input::<String>::new().with_prompt("Username").interact_text()?,
    };
    let password = match password {
        Some(p) => p,
        None => Password::new().with_prompt("Password").interact()?,
    };

    let session = auth::login(&ctx.client, &LoginRequest::new(username, password))
        .await
        .context("login failed")?;
    ctx.store
        .save_session(&session)
        .context("could not store the session")?;

    println!("Logged in. The session is valid for 10 minutes.");
    Ok(())
}

pub fn logout(ctx: &AppContext) -> anyhow::Result<()> {
    ctx.store.clear_session()?;
    println!("Logged out.");
    Ok(())
}
