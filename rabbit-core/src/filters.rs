use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    error::Result,
    models::servers::{Server, ServerStatus},
    Error,
};

/// Which delivery mechanism to show. Persisted as `vpnTypeFilter`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TypeFilter {
    #[default]
    All,
    FreeOpenVpn,
    Proto,
}

impl TypeFilter {
    pub fn matches(&self, server: &Server) -> bool {
        match self {
            TypeFilter::All => true,
            TypeFilter::FreeOpenVpn => server.is_free_open_vpn,
            TypeFilter::Proto => !server.is_free_open_vpn,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TypeFilter::All => "ALL",
            TypeFilter::FreeOpenVpn => "FREE_OPEN_VPN",
            TypeFilter::Proto => "PROTO",
        }
    }
}

impl fmt::Display for TypeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TypeFilter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "ALL" => Ok(TypeFilter::All),
            "FREE_OPEN_VPN" | "OPENVPN" | "FREE" => Ok(TypeFilter::FreeOpenVpn),
            "PROTO" | "PROTON" => Ok(TypeFilter::Proto),
            _ => Err(Error::Invalid(format!(
                "unknown type filter '{s}', expected all, free-open-vpn or proto"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    Visible,
    Hidden,
    ComingSoon,
}

impl StatusFilter {
    /// `Visible` and `Hidden` only look at `hide`; a coming soon record can
    /// match them as well.
    pub fn matches(&self, server: &Server) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Visible => !server.hide,
            StatusFilter::Hidden => server.hide,
            StatusFilter::ComingSoon => server.status() == ServerStatus::ComingSoon,
        }
    }
}

impl FromStr for StatusFilter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(StatusFilter::All),
            "visible" => Ok(StatusFilter::Visible),
            "hidden" => Ok(StatusFilter::Hidden),
            "cs" | "coming-soon" | "coming_soon" => Ok(StatusFilter::ComingSoon),
            _ => Err(Error::Invalid(format!(
                "unknown status filter '{s}', expected all, visible, hidden or cs"
            ))),
        }
    }
}

/// Client side narrowing of the fetched list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerFilter {
    pub kind: TypeFilter,
    pub status: StatusFilter,
    pub search: Option<String>,
}

impl ServerFilter {
    pub fn matches(&self, server: &Server) -> bool {
        self.kind.matches(server) && self.status.matches(server) && self.matches_search(server)
    }

    pub fn apply<'a>(&self, servers: &'a [Server]) -> Vec<&'a Server> {
        servers.iter().filter(|s| self.matches(s)).collect()
    }

    fn matches_search(&self, server: &Server) -> bool {
        let needle = match self.search.as_deref().map(str::trim) {
            Some(n) if !n.is_empty() => n.to_lowercase(),
            _ => return true,
        };

        [
            Some(server.id.as_str()),
            Some(server.country.as_str()),
            Some(server.cityname.as_str()),
            server.username.as_deref(),
            server.password.as_deref(),
            Some(server.url.as_str()),
        ]
        .into_iter()
        .flatten()
        .any(|cell| cell.to_lowercase().contains(&needle))
    }
}
