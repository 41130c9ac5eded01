use std::fmt::Display;

use rabbit_core::models::servers::Server;
use tabled::builder;

pub const HEADER: [&str; 10] = [
    "id", "country", "city", "type", "status", "category", "tier", "username", "password", "url",
];

pub struct ServerTable<'a>(pub Vec<&'a Server>);

/// One rendered row, shared by the table and csv output.
pub fn cells(server: &Server) -> [String; 10] {
    [
        server.id.clone(),
        server.country.clone(),
        server.cityname.clone(),
        server.provider_label().into(),
        server.status().label().into(),
        server.category.map(|c| c.to_string()).unwrap_or_default(),
        server.tier.map(|t| t.to_string()).unwrap_or_default(),
        server.username.clone().unwrap_or("N/A".into()),
        server.password.clone().unwrap_or("N/A".into()),
        server.url.clone(),
    ]
}

impl Display for ServerTable<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.is_empty() {
            return write!(f, "No VPN configurations found.");
        }

        let mut builder = builder::Builder::new();
        builder.push_record(HEADER);
        for server in &self.0 {
            builder.push_record(cells(server));
        }

        let table = builder.build().to_string();
        write!(f, "{}", table)
    }
}
