//! Process configuration and credentials.
//!
//! Sources, lowest to highest priority:
//! 1. Built-in defaults (board `XobnRsYv`, base `https://api.trello.com`)
//! 2. `TRELLO_*` environment variables (`TRELLO_API_KEY`, `TRELLO_TOKEN`,
//!    `TRELLO_BOARD_ID`, `TRELLO_BASE_URL`)
//! 3. Explicit [`Overrides`], typically from command-line flags
//!
//! The resulting [`Config`] is built once at startup and passed by reference;
//! nothing here is global.

use std::collections::BTreeMap;
use std::fmt;

use figment::{
    providers::{Env, Serialized},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, Result};

pub const DEFAULT_BASE_URL: &str = "https://api.trello.com";
pub const DEFAULT_BOARD_ID: &str = "XobnRsYv";

const ENV_KEYS: [&str; 4] = ["api_key", "token", "board_id", "base_url"];

/// API key/token pair. Both halves are non-empty by construction.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    key: String,
    token: String,
}

impl Credentials {
    pub fn new(key: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        let key = key.into().trim().to_string();
        let token = token.into().trim().to_string();
        if key.is_empty() || token.is_empty() {
            return Err(ApiError::config(
                "missing credentials: set TRELLO_API_KEY and TRELLO_TOKEN (or pass --key/--token)",
            ));
        }
        Ok(Self { key, token })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("key", &"<redacted>")
            .field("token", &"<redacted>")
            .finish()
    }
}

#[derive(Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub board_id: String,
    #[serde(default)]
    pub base_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            token: String::new(),
            board_id: DEFAULT_BOARD_ID.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &redact(&self.api_key))
            .field("token", &redact(&self.token))
            .field("board_id", &self.board_id)
            .field("base_url", &self.base_url)
            .finish()
    }
}

fn redact(value: &str) -> &'static str {
    if value.is_empty() {
        "<unset>"
    } else {
        "<redacted>"
    }
}

/// Values supplied explicitly by the caller. `None` leaves the lower layer
/// untouched.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Overrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub board_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl Config {
    /// Load defaults and environment variables.
    pub fn load() -> Result<Self> {
        Self::load_with(Overrides::default())
    }

    /// Load defaults and environment variables, then apply `overrides`.
    pub fn load_with(overrides: Overrides) -> Result<Self> {
        let config: Config = Self::figment()
            .merge(Serialized::defaults(overrides))
            .extract()
            .map_err(|e| ApiError::config(format!("invalid configuration: {e}")))?;
        Ok(config.normalized())
    }

    /// Defaults plus `TRELLO_*` environment variables.
    ///
    /// Variables are taken as raw text. An all-digit key or a token of `true`
    /// stays a string instead of being parsed as a scalar.
    pub fn figment() -> Figment {
        let env: BTreeMap<String, String> = Env::prefixed("TRELLO_")
            .only(&ENV_KEYS)
            .iter()
            .map(|(key, value)| (key.as_str().to_string(), value))
            .collect();
        Figment::from(Serialized::defaults(Self::default())).merge(Serialized::defaults(env))
    }

    /// The key/token pair, or a configuration error if either is blank.
    pub fn credentials(&self) -> Result<Credentials> {
        Credentials::new(self.api_key.as_str(), self.token.as_str())
    }

    fn normalized(mut self) -> Self {
        self.api_key = self.api_key.trim().to_string();
        self.token = self.token.trim().to_string();
        self.board_id = self.board_id.trim().to_string();
        self.base_url = self.base_url.trim().to_string();
        if self.board_id.is_empty() {
            self.board_id = DEFAULT_BOARD_ID.to_string();
        }
        if self.base_url.is_empty() {
            self.base_url = DEFAULT_BASE_URL.to_string();
        }
        self
    }
}
