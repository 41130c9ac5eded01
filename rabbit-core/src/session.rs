//! Login state and saved preferences.
//!
//! A [`Session`] is created by a successful login, read by [`require_session`]
//! before every authenticated call, and cleared on logout or once it expires.

use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::Mutex,
};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use tracing::{debug, warn};

use crate::{error::Result, filters::TypeFilter, Error};

pub const SESSION_TTL: Duration = Duration::minutes(10);

const SESSION_FILE: &str = "session.json";
const PREFERENCES_FILE: &str = "preferences.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    #[serde(with = "time::serde::timestamp")]
    pub expires_at: OffsetDateTime,
}

impl Session {
    pub fn new(token: impl Into<String>) -> Self {
        Self::issued_at(token, OffsetDateTime::now_utc())
    }

    pub fn issued_at(token: impl Into<String>, now: OffsetDateTime) -> Self {
        Self {
            token: token.into(),
            expires_at: now + SESSION_TTL,
        }
    }

    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        now >= self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(OffsetDateTime::now_utc())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(rename = "vpnTypeFilter", default)]
    pub type_filter: Option<TypeFilter>,
}

pub trait SessionStore {
    fn load_session(&self) -> Result<Option<Session>>;
    fn save_session(&self, session: &Session) -> Result<()>;
    fn clear_session(&self) -> Result<()>;
    fn load_preferences(&self) -> Result<Preferences>;
    fn save_preferences(&self, prefs: &Preferences) -> Result<()>;
}

/// Gate in front of every authenticated command.
///
/// Expired sessions are removed from the store before the error is returned,
/// so the next run starts from a clean login.
pub fn require_session(store: &dyn SessionStore) -> Result<Session> {
    let session = store.load_session()?.ok_or(Error::Unauthenticated)?;
    if session.is_expired() {
        warn!("stored session expired, clearing it");
        store.clear_session()?;
        return Err(Error::SessionExpired);
    }

    Ok(session)
}

/// Keeps `session.json` and `preferences.json` in a state directory.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    dir: PathBuf,
}

impl FileSessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn read<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        let path = self.dir.join(name);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(name);
        let tmp = self.dir.join(format!("{name}.tmp"));
        fs::write(&tmp, serde_json::to_vec_pretty(value)?)?;
        // The session file holds the admin token.
        #[cfg(unix)]
        fs::set_permissions(&tmp, fs::Permissions::from_mode(0o600))?;
        fs::rename(&tmp, &path)?;
        debug!(path = %path.display(), "wrote state file");
        Ok(())
    }
}

impl SessionStore for FileSessionStore {
    fn load_session(&self) -> Result<Option<Session>> {
        self.read(SESSION_FILE)
    }

    fn save_session(&self, session: &Session) -> Result<()> {
        self.write(SESSION_FILE, session)
    }

    fn clear_session(&self) -> Result<()> {
        match fs::remove_file(self.dir.join(SESSION_FILE)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn load_preferences(&self) -> Result<Preferences> {
        Ok(self.read(PREFERENCES_FILE)?.unwrap_or_default())
    }

    fn save_preferences(&self, prefs: &Preferences) -> Result<()> {
        self.write(PREFERENCES_FILE, prefs)
    }
}

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    session: Mutex<Option<Session>>,
    prefs: Mutex<Preferences>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: Session) -> Self {
        Self {
            session: Mutex::new(Some(session)),
            prefs: Mutex::default(),
        }
    }
}

fn poisoned<T>(_: T) -> Error {
    Error::Io(io::Error::other("session store lock poisoned"))
}

impl SessionStore for MemorySessionStore {
    fn load_session(&self) -> Result<Option<Session>> {
        Ok(self.session.lock().map_err(poisoned)?.clone())
    }

    fn save_session(&self, session: &Session) -> Result<()> {
        *self.session.lock().map_err(poisoned)? = Some(session.clone());
        Ok(())
    }

    fn clear_session(&self) -> Result<()> {
        *self.session.lock().map_err(poisoned)? = None;
        Ok(())
    }

    fn load_preferences(&self) -> Result<Preferences> {
        Ok(self.prefs.lock().map_err(poisoned)?.clone())
    }

    fn save_preferences(&self, prefs: &Preferences) -> Result<()> {
        *self.prefs.lock().map_err(poisoned)? = prefs.clone();
        Ok(())
    }
}
