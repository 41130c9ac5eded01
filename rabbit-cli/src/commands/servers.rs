use std::path::PathBuf;

use anyhow::{bail, Context};
use dialoguer::Confirm;
use rabbit_core::{
    assets::{download_asset, DEFAULT_CONFIG_NAME},
    crud::{
        lookups::{city_options, get_countries},
        servers::{create_server, delete_server, get_server_by_id, get_servers, update_server},
    },
    filters::TypeFilter,
    models::servers::{Classification, Credentials, NewServer, ServerPatch, Upload},
    session::SessionStore,
};
use tracing::{info, warn};

use super::AppContext;
use crate::{output::render_servers, CreateArgs, ListArgs, UpdateArgs};

pub async fn list(ctx: &AppContext, args: ListArgs) -> anyhow::Result<()> {
    let session = ctx.session()?;

    let mut filter = ctx.default_filter()?;
    if let Some(kind) = args.kind {
        filter.kind = kind;
        remember_type_filter(ctx, kind)?;
    }
    filter.status = args.status;
    filter.search = args.search;

    let servers = get_servers(&ctx.client, &session)
        .await
        .context("could not fetch servers")?;
    println!("{}", render_servers(&filter.apply(&servers), ctx.format)?);
    Ok(())
}

fn remember_type_filter(ctx: &AppContext, kind: TypeFilter) -> anyhow::Result<()> {
    let mut prefs = ctx.store.load_preferences()?;
    if prefs.type_filter != Some(kind) {
        prefs.type_filter = Some(kind);
        ctx.store.save_preferences(&prefs)?;
    }
    Ok(())
}

pub fn configure_type_filter(ctx: &AppContext, filter: Option<TypeFilter>) -> anyhow::Result<()> {
    match filter {
        Some(kind) => {
            remember_type_filter(ctx, kind)?;
            println!("Default type filter set to {kind}.");
        }
        None => {
            let current = ctx.store.load_preferences()?.type_filter.unwrap_or_default();
            println!("{current}");
        }
    }
    Ok(())
}

/// Turns the create options into a request, enforcing what the form did:
/// no city without a country, category and tier together, credentials only
/// for free OpenVPN servers.
pub fn build_new_server(args: &CreateArgs) -> anyhow::Result<NewServer> {
    if args.city.is_some() && args.country.is_none() {
        bail!("--city needs --country");
    }

    let classification = match (args.category, args.tier) {
        (Some(category), Some(tier)) => Some(Classification { category, tier }),
        (None, None) => None,
        _ => bail!("--category and --tier have to be given together"),
    };

    let free_open_vpn = if args.free_open_vpn {
        let creds = Credentials {
            username: args.username.clone().unwrap_or_default(),
            password: args.password.clone().unwrap_or_default(),
        };
        if creds.username.is_empty() || creds.password.is_empty() {
            warn!("free OpenVPN server created without full credentials");
        }
        Some(creds)
    } else {
        None
    };

    Ok(NewServer {
        country: args.country.clone(),
        cityname: args.city.clone(),
        classification,
        free_open_vpn,
        proton: args.proton,
        file: None,
    })
}

/// Checks country and city against the lookup lists the api offers.
async fn check_location(ctx: &AppContext, new: &NewServer) -> anyhow::Result<()> {
    let Some(country) = new.country.as_deref() else {
        return Ok(());
    };

    let countries = get_countries(&ctx.client)
        .await
        .context("could not fetch countries")?;
    if !countries.iter().any(|c| c == country) {
        bail!("unknown country '{country}', see `rabbit-cli countries`");
    }

    if let Some(city) = new.cityname.as_deref() {
        let options = city_options(&ctx.client, Some(country))
            .await
            .context("could not fetch cities")?;
        if !options.iter().any(|c| c == city) {
            bail!("unknown city '{city}' for {country}, see `rabbit-cli cities \"{country}\"`");
        }
    }

    Ok(())
}

pub async fn create(ctx: &AppContext, args: CreateArgs) -> anyhow::Result<()> {
    let session = ctx.session()?;
    let mut new = build_new_server(&args)?;
    check_location(ctx, &new).await?;

    if let Some(path) = &args.file {
        new.file = Some(
            Upload::from_path(path)
                .await
                .with_context(|| format!("could not read {}", path.display()))?,
        );
    }

    create_server(&ctx.client, &session, new)
        .await
        .context("failed to create server")?;
    println!("Server created.");

    ctx.refresh_table(&session).await
}

/// Applies the given options on top of the record's current values.
pub fn apply_update(mut patch: ServerPatch, args: &UpdateArgs) -> anyhow::Result<ServerPatch> {
    if let Some(country) = &args.country {
        patch.country = country.clone();
    }
    if let Some(city) = &args.city {
        patch.cityname = city.clone();
    }
    if args.category.is_some() {
        patch.category = args.category;
    }
    if args.tier.is_some() {
        patch.tier = args.tier;
    }
    if let Some(proton) = args.proton {
        patch.proton = proton;
    }
    if let Some(location) = args.location {
        patch.location = Some(location.to_string());
    }
    if let Some(flag) = &args.flag {
        patch.flag = flag.clone();
    }
    if let Some(url) = &args.url {
        patch.url = url.clone();
    }
    if let Some(hide) = args.hide {
        patch.hide = hide;
    }

    let was_free = patch.free_open_vpn.is_some();
    let free = args.free_open_vpn.unwrap_or(was_free);
    if free {
        let current = patch.free_open_vpn.take().unwrap_or(Credentials {
            username: String::new(),
            password: String::new(),
        });
        let creds = Credentials {
            username: args.username.clone().unwrap_or(current.username),
            password: args.password.clone().unwrap_or(current.password),
        };
        if !was_free && (creds.username.is_empty() || creds.password.is_empty()) {
            bail!("switching to free OpenVPN needs --username and --password");
        }
        patch.free_open_vpn = Some(creds);
    } else {
        if args.username.is_some() || args.password.is_some() {
            bail!("--username and --password only apply to free OpenVPN servers");
        }
        patch.free_open_vpn = None;
    }

    Ok(patch)
}

pub async fn update(ctx: &AppContext, args: UpdateArgs) -> anyhow::Result<()> {
    let session = ctx.session()?;
    let current = get_server_by_id(&ctx.client, &session, &args.id).await?;
    let mut patch = apply_update(ServerPatch::from(&current), &args)?;

    if let Some(path) = &args.file {
        patch.config_file = Some(
            Upload::from_path(path)
                .await
                .with_context(|| format!("could not read {}", path.display()))?,
        );
    }
    if let Some(path) = &args.flag_file {
        patch.flag_file = Some(
            Upload::from_path(path)
                .await
                .with_context(|| format!("could not read {}", path.display()))?,
        );
    }

    update_server(&ctx.client, &session, &args.id, patch)
        .await
        .context("failed to update server")?;
    println!("Server {} updated.", args.id);

    ctx.refresh_table(&session).await
}

pub async fn delete(ctx: &AppContext, id: &str, yes: bool) -> anyhow::Result<()> {
    let session = ctx.session()?;

    let confirmed = yes
        || Confirm::new()
            .with_prompt(format!(
                "Delete server {id}? Once deleted the file cannot be recovered"
            ))
            .default(false)
            .interact()?;
    if !confirmed {
        println!("Nothing deleted.");
        return Ok(());
    }

    delete_server(&ctx.client, &session, id)
        .await
        .context("failed to delete server")?;
    println!("Server {id} deleted.");

    ctx.refresh_table(&session).await
}

pub async fn download(
    ctx: &AppContext,
    id: &str,
    flag: bool,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let session = ctx.session()?;
    let server = get_server_by_id(&ctx.client, &session, id).await?;
    let reference = if flag { &server.flag } else { &server.url };

    let bytes = download_asset(&ctx.client, reference)
        .await
        .with_context(|| format!("could not download the asset of server {id}"))?;

    let output = output.unwrap_or_else(|| default_output(reference, flag));
    tokio::fs::write(&output, &bytes)
        .await
        .with_context(|| format!("could not write {}", output.display()))?;

    info!(path = %output.display(), size = bytes.len(), "saved asset");
    println!("Saved {} ({} bytes).", output.display(), bytes.len());
    Ok(())
}

fn default_output(reference: &str, flag: bool) -> PathBuf {
    if !flag {
        return PathBuf::from(DEFAULT_CONFIG_NAME);
    }

    reference
        .rsplit('/')
        .next()
        .filter(|n| !n.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("flag.png"))
}
