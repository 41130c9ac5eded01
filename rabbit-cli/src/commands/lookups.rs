use rabbit_core::crud::lookups::{city_options, get_countries};

use super::AppContext;
use crate::output::render_names;

pub async fn countries(ctx: &AppContext) -> anyhow::Result<()> {
    let countries = get_countries(&ctx.client).await?;
    println!("{}", render_names("country", &countries, ctx.format)?);
    Ok(())
}

pub async fn cities(ctx: &AppContext, country: &str) -> anyhow::Result<()> {
    let cities = city_options(&ctx.client, Some(country)).await?;
    println!("{}", render_names("city", &cities, ctx.format)?);
    Ok(())
}
