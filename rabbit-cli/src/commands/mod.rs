pub mod auth;
pub mod lookups;
pub mod servers;

use rabbit_core::{
    crud::servers::get_servers,
    filters::ServerFilter,
    session::{require_session, Session, SessionStore},
    ApiClient,
};

use crate::output::{render_servers, OutputFormat};

pub struct AppContext {
    pub client: ApiClient,
    pub store: Box<dyn SessionStore>,
    pub format: OutputFormat,
    /// Re-render the table after every successful mutation.
    pub refresh: bool,
}

impl AppContext {
    pub fn session(&self) -> rabbit_core::Result<Session> {
        require_session(self.store.as_ref())
    }

    /// The saved type filter, or everything when none was chosen yet.
    pub fn default_filter(&self) -> anyhow::Result<ServerFilter> {
        let prefs = self.store.load_preferences()?;
        Ok(ServerFilter {
            kind: prefs.type_filter.unwrap_or_default(),
            ..Default::default()
        })
    }

    pub async fn refresh_table(&self, session: &Session) -> anyhow::Result<()> {
        if !self.refresh {
            return Ok(());
        }

        let servers = get_servers(&self.client, session).await?;
        let filter = self.default_filter()?;
        println!("{}", render_servers(&filter.apply(&servers), self.format)?);
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use httpmock::MockServer;
    use rabbit_core::{
        session::{MemorySessionStore, Session},
        ApiClient, ApiConfig,
    };

    use super::AppContext;
    use crate::output::OutputFormat;

    pub fn context_for(server: &MockServer, logged_in: bool) -> AppContext {
        let store = if logged_in {
            MemorySessionStore::with_session(Session::new("tok"))
        } else {
            MemorySessionStore::new()
        };

        AppContext {
            client: ApiClient::new(&ApiConfig {
                api_url: server.base_url(),
                asset_host: server.base_url(),
            })
            .expect("client"),
            store: Box::new(store),
            format: OutputFormat::Table,
            refresh: true,
        }
    }
}
