mod commands;
mod output;
mod server_table;

use std::{path::PathBuf, process::ExitCode};

use clap::{Args, Parser, Subcommand};
use rabbit_core::{
    filters::{StatusFilter, TypeFilter},
    get_state_dir,
    models::servers::{Category, Location, Tier},
    new_client,
    session::FileSessionStore,
    ApiConfig,
};
use tracing::error;
use tracing_subscriber::EnvFilter;

use crate::{commands::AppContext, output::OutputFormat};

#[derive(Debug, Parser)]
#[command(arg_required_else_help = true)]
struct Cli {
    /// Base url of the admin api [env: RABBIT_API_URL]
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Host serving uploaded configs and flags [env: RABBIT_ASSET_HOST]
    #[arg(long, global = true)]
    asset_host: Option<String>,

    /// Directory holding the session and preferences [env: RABBIT_STATE_DIR]
    #[arg(long, global = true)]
    state_dir: Option<PathBuf>,

    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table, global = true)]
    format: OutputFormat,

    /// Don't re-fetch the table after a create, update or delete
    #[arg(long, default_value_t = false, global = true)]
    no_refresh: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Log in as an administrator
    Login {
        #[arg(short, long)]
        username: Option<String>,

        #[arg(short, long, env = "RABBIT_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Forget the stored session
    Logout,
    /// List the countries servers can be placed in
    Countries,
    /// List the cities offered for a country
    Cities { country: String },
    /// Show the server table
    List(ListArgs),
    /// Create a server record
    Create(CreateArgs),
    /// Edit a server record
    Update(UpdateArgs),
    /// Delete a server record
    Delete {
        id: String,

        /// Skip the confirmation prompt
        #[arg(short, long, default_value_t = false)]
        yes: bool,
    },
    /// Download a server's config, or its flag with --flag
    Download {
        id: String,

        #[arg(long, default_value_t = false)]
        flag: bool,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// A subcommand for configuring saved preferences
    Configure {
        #[command(subcommand)]
        command: ConfigureCommand,
    },
}

#[derive(Debug, Clone, Subcommand)]
enum ConfigureCommand {
    /// Show or set the default type filter of the table
    TypeFilter { filter: Option<TypeFilter> },
}

#[derive(Debug, Clone, Args)]
pub struct ListArgs {
    /// Case insensitive text search over the table cells
    #[arg(short, long)]
    pub search: Option<String>,

    /// all, free-open-vpn or proto. Remembered for later runs
    #[arg(short = 't', long = "type")]
    pub kind: Option<TypeFilter>,

    /// all, visible, hidden or cs (coming soon)
    #[arg(long, default_value = "all")]
    pub status: StatusFilter,
}

#[derive(Debug, Clone, Default, Args)]
pub struct CreateArgs {
    #[arg(long)]
    pub country: Option<String>,

    /// A city of the country, or FREE
    #[arg(long)]
    pub city: Option<String>,

    /// generel, videos, games, social-media or sports. Needs --tier
    #[arg(long)]
    pub category: Option<Category>,

    /// free or premium. Needs --category
    #[arg(long)]
    pub tier: Option<Tier>,

    #[arg(long, default_value_t = false)]
    pub free_open_vpn: bool,

    #[arg(long, requires = "free_open_vpn")]
    pub username: Option<String>,

    #[arg(long, requires = "free_open_vpn")]
    pub password: Option<String>,

    #[arg(long, default_value_t = false)]
    pub proton: bool,

    /// Config file to upload
    #[arg(long)]
    pub file: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Args)]
pub struct UpdateArgs {
    pub id: String,

    #[arg(long)]
    pub country: Option<String>,

    #[arg(long)]
    pub city: Option<String>,

    #[arg(long)]
    pub category: Option<Category>,

    #[arg(long)]
    pub tier: Option<Tier>,

    #[arg(long)]
    pub free_open_vpn: Option<bool>,

    #[arg(long)]
    pub proton: Option<bool>,

    #[arg(long)]
    pub username: Option<String>,

    #[arg(long)]
    pub password: Option<String>,

    /// "latitude,longitude"
    #[arg(long)]
    pub location: Option<Location>,

    #[arg(long)]
    pub flag: Option<String>,

    #[arg(long)]
    pub url: Option<String>,

    #[arg(long)]
    pub hide: Option<bool>,

    /// Replacement config file
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Replacement flag image
    #[arg(long)]
    pub flag_file: Option<PathBuf>,
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = ApiConfig::from_env();
    if let Some(api_url) = cli.api_url {
        config.api_url = api_url;
    }
    if let Some(asset_host) = cli.asset_host {
        config.asset_host = asset_host;
    }

    let ctx = AppContext {
        client: new_client(&config)?,
        store: Box::new(FileSessionStore::new(
            cli.state_dir.unwrap_or_else(get_state_dir),
        )),
        format: cli.format,
        refresh: !cli.no_refresh,
    };

    match cli.command {
        Command::Login { username, password } => commands::auth::login(&ctx, username, password).await,
        Command::Logout => commands::auth::logout(&ctx),
        Command::Countries => commands::lookups::countries(&ctx).await,
        Command::Cities { country } => commands::lookups::cities(&ctx, &country).await,
        Command::List(args) => commands::servers::list(&ctx, args).await,
        Command::Create(args) => commands::servers::create(&ctx, args).await,
        Command::Update(args) => commands::servers::update(&ctx, args).await,
        Command::Delete { id, yes } => commands::servers::delete(&ctx, &id, yes).await,
        Command::Download { id, flag, output } => {
            commands::servers::download(&ctx, &id, flag, output).await
        }
        Command::Configure { command } => match command {
            ConfigureCommand::TypeFilter { filter } => {
                commands::servers::configure_type_filter(&ctx, filter)
            }
        },
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            eprintln!("{}", failure_message(&e));
            ExitCode::FAILURE
        }
    }
}

/// What the user sees on stderr, whatever `RUST_LOG` filters out.
fn failure_message(e: &anyhow::Error) -> String {
    let needs_login = e
        .chain()
        .filter_map(|c| c.downcast_ref::<rabbit_core::Error>())
        .any(|c| c.needs_login());
    if needs_login {
        format!("error: {e:#}\nrun `rabbit-cli login` to start a new session")
    } else {
        format!("error: {e:#}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list() {
        let cli = Cli::try_parse_from([
            "rabbit-cli", "list", "--type", "proto", "--status", "cs", "-s", "berlin",
        ])
        .unwrap();
        let Command::List(args) = cli.command else {
            panic!("expected list");
        };
        assert_eq!(args.kind, Some(TypeFilter::Proto));
        assert_eq!(args.status, StatusFilter::ComingSoon);
        assert_eq!(args.search.as_deref(), Some("berlin"));
    }

    #[test]
    fn test_parse_create() {
        let cli = Cli::try_parse_from([
            "rabbit-cli",
            "create",
            "--country",
            "Germany",
            "--city",
            "FREE",
            "--category",
            "social-media",
            "--tier",
            "premium",
            "--free-open-vpn",
            "--username",
            "u",
            "--password",
            "p",
            "--file",
            "de.ovpn",
        ])
        .unwrap();
        let Command::Create(args) = cli.command else {
            panic!("expected create");
        };
        assert_eq!(args.category, Some(Category::SocialMedia));
        assert_eq!(args.tier, Some(Tier::Premium));
        assert!(args.free_open_vpn);
        assert!(!args.proton);
    }

    #[test]
    fn test_credentials_need_free_open_vpn() {
        let r = Cli::try_parse_from(["rabbit-cli", "create", "--username", "u"]);
        assert!(r.is_err());
    }

    #[test]
    fn test_parse_update_flags() {
        let cli = Cli::try_parse_from([
            "rabbit-cli",
            "--no-refresh",
            "update",
            "66a1",
            "--hide",
            "true",
            "--location",
            "52.5,13.4",
        ])
        .unwrap();
        assert!(cli.no_refresh);
        let Command::Update(args) = cli.command else {
            panic!("expected update");
        };
        assert_eq!(args.id, "66a1");
        assert_eq!(args.hide, Some(true));
        assert_eq!(args.location.map(|l| l.to_string()).as_deref(), Some("52.5,13.4"));
    }

    #[test]
    fn test_failure_message() {
        let e = anyhow::Error::new(rabbit_core::Error::SessionExpired)
            .context("could not fetch servers");
        assert_eq!(
            failure_message(&e),
            "error: could not fetch servers: session expired\nrun `rabbit-cli login` to start a new session"
        );

        let e = anyhow::Error::new(rabbit_core::Error::Invalid("no file".into()));
        assert_eq!(failure_message(&e), "error: invalid input: no file");
    }

    #[test]
    fn test_rejects_unknown_filters() {
        assert!(Cli::try_parse_from(["rabbit-cli", "list", "--type", "wireguard"]).is_err());
        assert!(Cli::try_parse_from(["rabbit-cli", "list", "--status", "gone"]).is_err());
    }
}
