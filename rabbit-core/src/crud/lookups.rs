use reqwest::Method;

use crate::{client::read_json, error::Result, models::Envelope, ApiClient};

/// Synthetic city offered for every country.
pub const FREE_CITY: &str = "FREE";

pub async fn get_countries(client: &ApiClient) -> Result<Vec<String>> {
    let res = client
        .request(Method::GET, "/utility/countries")
        .send()
        .await?;
    let envelope: Envelope<Vec<String>> = read_json(res).await?;
    Ok(envelope.data)
}

pub async fn get_cities(client: &ApiClient, country: &str) -> Result<Vec<String>> {
    let res = client
        .request(Method::GET, "/utility/cities")
        .query(&[("country", country)])
        .send()
        .await?;
    let envelope: Envelope<Vec<String>> = read_json(res).await?;
    Ok(envelope.data)
}

/// City choices for a country, led by [`FREE_CITY`].
///
/// Empty without a country, and no request is made in that case.
pub async fn city_options(client: &ApiClient, country: Option<&str>) -> Result<Vec<String>> {
    let Some(country) = country.filter(|c| !c.is_empty()) else {
        return Ok(Vec::new());
    };

    let mut options = vec![FREE_CITY.to_string()];
    options.extend(get_cities(client, country).await?);
    Ok(options)
}
