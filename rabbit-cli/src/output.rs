use anyhow::Context;
use clap::ValueEnum;
use rabbit_core::models::servers::Server;
use tabled::builder;

use crate::server_table::{cells, ServerTable, HEADER};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

pub fn render_servers(servers: &[&Server], format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Table => Ok(ServerTable(servers.to_vec()).to_string()),
        OutputFormat::Json => {
            serde_json::to_string_pretty(servers).context("failed to format JSON")
        }
        OutputFormat::Csv => {
            let mut wtr = csv::Writer::from_writer(vec![]);
            wtr.write_record(HEADER)?;
            for server in servers {
                wtr.write_record(cells(server))?;
            }
            let bytes = wtr.into_inner().context("failed to flush CSV")?;
            Ok(String::from_utf8(bytes)?.trim_end().to_string())
        }
    }
}

/// Single column listings: countries, cities.
pub fn render_names(column: &str, names: &[String], format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Table => {
            let mut builder = builder::Builder::new();
            builder.push_record([column]);
            for name in names {
                builder.push_record([name.as_str()]);
            }
            Ok(builder.build().to_string())
        }
        OutputFormat::Json => serde_json::to_string_pretty(names).context("failed to format JSON"),
        OutputFormat::Csv => {
            let mut wtr = csv::Writer::from_writer(vec![]);
            wtr.write_record([column])?;
            for name in names {
                wtr.write_record([name])?;
            }
            let bytes = wtr.into_inner().context("failed to flush CSV")?;
            Ok(String::from_utf8(bytes)?.trim_end().to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::*;

    fn server() -> Server {
        serde_json::from_value(json!({
            "_id": "1",
            "country": "Germany",
            "cityname": "Frankfurt, Main",
            "isFreeOpenVpn": true,
            "username": "u",
            "password": "p",
            "url": "configs/de.ovpn",
            "hide": "true"
        }))
        .unwrap()
    }

    #[test]
    fn test_csv_quotes_and_header() {
        let s = server();
        let out = render_servers(&[&s], OutputFormat::Csv).unwrap();
        let mut lines = out.lines();
        assert_eq!(
            lines.next(),
            Some("id,country,city,type,status,category,tier,username,password,url")
        );
        assert_eq!(
            lines.next(),
            Some("1,Germany,\"Frankfurt, Main\",Free Open VPN,Hidden,,,u,p,configs/de.ovpn")
        );
    }

    #[test]
    fn test_json_uses_api_field_names() {
        let s = server();
        let out = render_servers(&[&s], OutputFormat::Json).unwrap();
        let value: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value[0]["_id"], "1");
        assert_eq!(value[0]["isFreeOpenVpn"], true);
        assert_eq!(value[0]["hide"], true);
    }

    #[test]
    fn test_render_names() {
        let names = vec!["FREE".to_string(), "Berlin".to_string()];
        assert_eq!(
            render_names("city", &names, OutputFormat::Csv).unwrap(),
            "city\nFREE\nBerlin"
        );
        assert!(render_names("city", &names, OutputFormat::Table)
            .unwrap()
            .contains("Berlin"));
    }
}
