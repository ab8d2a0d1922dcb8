//! `windpress.config.json` and `WINDPRESS_*` configuration.
//!
//! Priority: environment variables > config file > defaults. Command-line
//! flags are applied by each command on top of the loaded value.

use figment::{
    Figment,
    providers::{Env, Format as _, Json, Serialized},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use windpress_build::{Credentials, DEFAULT_REST_PREFIX};
use windpress_compiler::CdnConfig;

use crate::error::{ConfigError, Result};

pub const CONFIG_FILE: &str = "windpress.config.json";
pub const ENV_PREFIX: &str = "WINDPRESS_";

/// `SITE_URL` -> `siteUrl`, matching the file's field names.
fn env_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for (i, part) in key.split('_').filter(|p| !p.is_empty()).enumerate() {
        let part = part.to_ascii_lowercase();
        if i == 0 {
            out.push_str(&part);
        } else {
            let mut chars = part.chars();
            if let Some(first) = chars.next() {
                out.push(first.to_ascii_uppercase());
                out.push_str(chars.as_str());
            }
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindpressConfig {
    /// Root URL of the WordPress site, e.g. `https://example.com`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_url: Option<String>,

    /// WordPress user the application password belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_password: Option<String>,

    /// REST namespace of the WindPress plugin.
    #[serde(default = "default_rest_prefix")]
    pub rest_prefix: String,

    /// Directory of the durable provider cache.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Directory with the `package.json` that provides the Tailwind CLI.
    #[serde(default = "default_project_root")]
    pub project_root: PathBuf,

    /// `npm`, `pnpm`, `bun` or `deno`. Detected from lockfiles when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_manager: Option<String>,

    #[serde(default)]
    pub cdn: CdnConfig,

    /// Timeout for HTTP requests and Tailwind CLI runs.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_rest_prefix() -> String {
    DEFAULT_REST_PREFIX.to_string()
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from(".cache/windpress")
}

fn default_project_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for WindpressConfig {
    fn default() -> Self {
        Self {
            site_url: None,
            username: None,
            app_password: None,
            rest_prefix: default_rest_prefix(),
            cache_dir: default_cache_dir(),
            project_root: default_project_root(),
            package_manager: None,
            cdn: CdnConfig::default(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl WindpressConfig {
    /// Load from defaults, the config file and the environment.
    ///
    /// An explicit `config_path` must exist; the default file is optional.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let env = Env::prefixed(ENV_PREFIX)
            .ignore(&["config"])
            .lowercase(false)
            .map(|key| env_key(key.as_str()).into());
        Self::extract(Self::figment(config_path)?.merge(env))
    }

    /// Defaults plus the config file, without the environment.
    pub(crate) fn figment(config_path: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::new().merge(Serialized::defaults(Self::default()));

        let config_file = match config_path {
            Some(path) if !path.exists() => return Err(ConfigError::NotFound(path.to_path_buf()).into()),
            Some(path) => Some(path.to_path_buf()),
            None => {
                let default_path = Path::new(CONFIG_FILE);
                default_path.exists().then(|| default_path.to_path_buf())
            }
        };

        if let Some(path) = config_file {
            figment = figment.merge(Json::file(path));
        }

        Ok(figment)
    }

    pub(crate) fn extract(figment: Figment) -> Result<Self> {
        figment.extract().map_err(|e| {
            ConfigError::InvalidValue {
                field: "configuration".to_string(),
                value: e.to_string(),
                hint: format!("Check {CONFIG_FILE} syntax and field types"),
            }
            .into()
        })
    }

    /// The site URL, required by commands that talk to WordPress.
    pub fn require_site_url(&self) -> Result<&str> {
        self.site_url.as_deref().filter(|url| !url.trim().is_empty()).ok_or_else(|| {
            ConfigError::MissingField {
                field: "siteUrl".to_string(),
                hint: format!("Add \"siteUrl\" to {CONFIG_FILE} or set {ENV_PREFIX}SITE_URL"),
            }
            .into()
        })
    }

    /// Application password credentials. Both halves or neither.
    pub fn credentials(&self) -> Result<Option<Credentials>> {
        match (&self.username, &self.app_password) {
            (Some(username), Some(password)) => Ok(Some(Credentials {
                username: username.clone(),
                password: password.clone(),
            })),
            (None, None) => Ok(None),
            (Some(_), None) => Err(ConfigError::MissingField {
                field: "appPassword".to_string(),
                hint: format!("Set {ENV_PREFIX}APP_PASSWORD to an application password of the user"),
            }
            .into()),
            (None, Some(_)) => Err(ConfigError::MissingField {
                field: "username".to_string(),
                hint: format!("Set {ENV_PREFIX}USERNAME to the owner of the application password"),
            }
            .into()),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
