use std::{fmt, path::Path, str::FromStr};

use serde::{de, Deserialize, Deserializer, Serialize};
use tracing::warn;

use crate::{error::Result, Error};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    // The api spells it this way.
    #[serde(rename = "GENEREL")]
    General,
    #[serde(rename = "VIDEOS")]
    Videos,
    #[serde(rename = "GAMES")]
    Games,
    #[serde(rename = "SOCIAL MEDIA")]
    SocialMedia,
    #[serde(rename = "SPORTS")]
    Sports,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::General,
        Category::Videos,
        Category::Games,
        Category::SocialMedia,
        Category::Sports,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::General => "GENEREL",
            Category::Videos => "VIDEOS",
            Category::Games => "GAMES",
            Category::SocialMedia => "SOCIAL MEDIA",
            Category::Sports => "SPORTS",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match normalize(s).as_str() {
            "GENEREL" | "GENERAL" => Ok(Category::General),
            "VIDEOS" => Ok(Category::Videos),
            "GAMES" => Ok(Category::Games),
            "SOCIAL MEDIA" => Ok(Category::SocialMedia),
            "SPORTS" => Ok(Category::Sports),
            _ => Err(Error::Invalid(format!(
                "unknown category '{s}', expected one of: generel, videos, games, social-media, sports"
            ))),
        }
    }
}

/// The record's `type`: which plan a server belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Tier {
    Free,
    Premium,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Free => "FREE",
            Tier::Premium => "PREMIUM",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match normalize(s).as_str() {
            "FREE" => Ok(Tier::Free),
            "PREMIUM" => Ok(Tier::Premium),
            _ => Err(Error::Invalid(format!(
                "unknown tier '{s}', expected free or premium"
            ))),
        }
    }
}

fn normalize(s: &str) -> String {
    s.trim().to_uppercase().replace(['-', '_'], " ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerStatus {
    Visible,
    Hidden,
    ComingSoon,
}

impl ServerStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ServerStatus::Visible => "Visible",
            ServerStatus::Hidden => "Hidden",
            ServerStatus::ComingSoon => "Coming Soon",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Server {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub cityname: String,
    #[serde(default, deserialize_with = "lenient_enum")]
    pub category: Option<Category>,
    #[serde(rename = "type", default, deserialize_with = "lenient_enum")]
    pub tier: Option<Tier>,
    #[serde(rename = "isFreeOpenVpn", default, deserialize_with = "bool_like")]
    pub is_free_open_vpn: bool,
    #[serde(rename = "isProton", default, deserialize_with = "bool_like")]
    pub is_proton: bool,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default, deserialize_with = "string_or_null")]
    pub url: String,
    #[serde(default, deserialize_with = "string_or_null")]
    pub flag: String,
    #[serde(default, deserialize_with = "bool_like")]
    pub hide: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl Server {
    /// A record without an uploaded config is listed as coming soon,
    /// whatever its `hide` flag says.
    pub fn status(&self) -> ServerStatus {
        if self.url.is_empty() {
            ServerStatus::ComingSoon
        } else if self.hide {
            ServerStatus::Hidden
        } else {
            ServerStatus::Visible
        }
    }

    pub fn provider_label(&self) -> &'static str {
        if self.is_free_open_vpn {
            "Free Open VPN"
        } else {
            "Proton VPN"
        }
    }

    pub fn credentials(&self) -> Option<Credentials> {
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => Some(Credentials {
                username: username.clone(),
                password: password.clone(),
            }),
            _ => None,
        }
    }
}

/// Parses the loosely typed booleans the api hands back: real booleans,
/// `"true"`/`"false"` strings, `0`/`1` and `null`.
pub fn bool_like<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    struct BoolLikeVisitor;

    impl<'de> de::Visitor<'de> for BoolLikeVisitor {
        type Value = bool;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a boolean, \"true\"/\"false\", 0/1 or null")
        }

        fn visit_bool<E: de::Error>(self, v: bool) -> Result<bool, E> {
            Ok(v)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<bool, E> {
            match v {
                0 => Ok(false),
                1 => Ok(true),
                _ => Err(E::invalid_value(de::Unexpected::Unsigned(v), &self)),
            }
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<bool, E> {
            match v {
                0 => Ok(false),
                1 => Ok(true),
                _ => Err(E::invalid_value(de::Unexpected::Signed(v), &self)),
            }
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<bool, E> {
            match v.trim().to_ascii_lowercase().as_str() {
                "true" => Ok(true),
                "false" => Ok(false),
                _ => Err(E::invalid_value(de::Unexpected::Str(v), &self)),
            }
        }

        fn visit_unit<E: de::Error>(self) -> Result<bool, E> {
            Ok(false)
        }

        fn visit_none<E: de::Error>(self) -> Result<bool, E> {
            Ok(false)
        }

        fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<bool, D::Error> {
            deserializer.deserialize_any(self)
        }
    }

    deserializer.deserialize_any(BoolLikeVisitor)
}

fn lenient_enum<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|raw| {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        match raw.parse() {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(value = raw, "ignoring unrecognised enum value from api");
                None
            }
        }
    }))
}

fn string_or_null<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Category and tier only travel together on create.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub category: Category,
    pub tier: Tier,
}

#[derive(Clone, PartialEq, Eq)]
pub struct Upload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }

    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or("upload".into());
        Ok(Self { file_name, bytes })
    }
}

impl fmt::Debug for Upload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Upload")
            .field("file_name", &self.file_name)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Text and file parts of a multipart body, in send order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormBody {
    pub fields: Vec<(&'static str, String)>,
    pub files: Vec<(&'static str, Upload)>,
}

impl FormBody {
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn file(&self, name: &str) -> Option<&Upload> {
        self.files.iter().find(|(n, _)| *n == name).map(|(_, f)| f)
    }

    pub fn into_multipart(self) -> reqwest::multipart::Form {
        let mut form = reqwest::multipart::Form::new();
        for (name, value) in self.fields {
            form = form.text(name, value);
        }
        for (name, upload) in self.files {
            let part = reqwest::multipart::Part::bytes(upload.bytes).file_name(upload.file_name);
            form = form.part(name, part);
        }
        form
    }
}

/// Payload of `POST /open-vpn`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewServer {
    pub country: Option<String>,
    pub cityname: Option<String>,
    pub classification: Option<Classification>,
    /// `isFreeOpenVpn` is set exactly when credentials are present.
    pub free_open_vpn: Option<Credentials>,
    pub proton: bool,
    pub file: Option<Upload>,
}

impl NewServer {
    pub fn into_form(self) -> FormBody {
        let mut body = FormBody::default();
        if let Some(country) = self.country.filter(|c| !c.is_empty()) {
            body.fields.push(("country", country));
        }
        if let Some(city) = self.cityname.filter(|c| !c.is_empty()) {
            body.fields.push(("cityname", city));
        }
        if let Some(file) = self.file {
            body.files.push(("file", file));
        }
        if let Some(c) = self.classification {
            body.fields.push(("category", c.category.as_str().into()));
            body.fields.push(("type", c.tier.as_str().into()));
        }
        body.fields.push(("isProton", self.proton.to_string()));
        body.fields
            .push(("isFreeOpenVpn", self.free_open_vpn.is_some().to_string()));
        if let Some(creds) = self.free_open_vpn {
            body.fields.push(("username", creds.username));
            body.fields.push(("password", creds.password));
        }
        body
    }
}

/// Payload of `PATCH /open-vpn/:id`, pre-filled from the row being edited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerPatch {
    pub country: String,
    pub cityname: String,
    pub category: Option<Category>,
    pub tier: Option<Tier>,
    pub free_open_vpn: Option<Credentials>,
    pub proton: bool,
    pub location: Option<String>,
    pub flag: String,
    pub url: String,
    pub hide: bool,
    pub config_file: Option<Upload>,
    pub flag_file: Option<Upload>,
}

impl From<&Server> for ServerPatch {
    fn from(server: &Server) -> Self {
        let free_open_vpn = if server.is_free_open_vpn {
            Some(server.credentials().unwrap_or(Credentials {
                username: server.username.clone().unwrap_or_default(),
                password: server.password.clone().unwrap_or_default(),
            }))
        } else {
            None
        };

        Self {
            country: server.country.clone(),
            cityname: server.cityname.clone(),
            category: server.category,
            tier: server.tier,
            free_open_vpn,
            proton: server.is_proton,
            location: server.location.clone(),
            flag: server.flag.clone(),
            url: server.url.clone(),
            hide: server.hide,
            config_file: None,
            flag_file: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchFields {
    pub country: String,
    pub cityname: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub tier: Option<Tier>,
    pub is_free_open_vpn: bool,
    pub is_proton: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub flag: String,
    pub url: String,
    pub hide: bool,
}

impl PatchFields {
    fn into_text_fields(self, include_flag: bool) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("country", self.country),
            ("cityname", self.cityname),
        ];
        if let Some(category) = self.category {
            fields.push(("category", category.as_str().into()));
        }
        if let Some(tier) = self.tier {
            fields.push(("type", tier.as_str().into()));
        }
        fields.push(("isFreeOpenVpn", self.is_free_open_vpn.to_string()));
        fields.push(("isProton", self.is_proton.to_string()));
        if let Some(username) = self.username {
            fields.push(("username", username));
        }
        if let Some(password) = self.password {
            fields.push(("password", password));
        }
        if let Some(location) = self.location {
            fields.push(("location", location));
        }
        if include_flag {
            fields.push(("flag", self.flag));
        }
        fields.push(("url", self.url));
        fields.push(("hide", self.hide.to_string()));
        fields
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchBody {
    Json(PatchFields),
    Multipart(FormBody),
}

impl ServerPatch {
    pub fn has_uploads(&self) -> bool {
        self.config_file.is_some() || self.flag_file.is_some()
    }

    /// JSON unless a file is being replaced.
    pub fn into_body(self) -> PatchBody {
        let multipart = self.has_uploads();
        let (username, password) = match self.free_open_vpn {
            Some(creds) => (Some(creds.username), Some(creds.password)),
            None => (None, None),
        };
        let fields = PatchFields {
            country: self.country,
            cityname: self.cityname,
            category: self.category,
            tier: self.tier,
            is_free_open_vpn: username.is_some(),
            is_proton: self.proton,
            username,
            password,
            location: self.location.filter(|l| !l.is_empty()),
            flag: self.flag,
            url: self.url,
            hide: self.hide,
        };

        if !multipart {
            return PatchBody::Json(fields);
        }

        let mut body = FormBody {
            fields: fields.into_text_fields(self.flag_file.is_none()),
            files: Vec::new(),
        };
        if let Some(file) = self.config_file {
            body.files.push(("file", file));
        }
        if let Some(flag) = self.flag_file {
            body.files.push(("flag", flag));
        }
        PatchBody::Multipart(body)
    }
}

/// A `latitude,longitude` pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl FromStr for Location {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::Invalid(format!("location '{s}' is not \"latitude,longitude\""));
        let (lat, lon) = s.split_once(',').ok_or_else(invalid)?;
        let latitude: f64 = lat.trim().parse().map_err(|_| invalid())?;
        let longitude: f64 = lon.trim().parse().map_err(|_| invalid())?;
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(Error::Invalid(format!("location '{s}' is out of range")));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.latitude, self.longitude)
    }
}
