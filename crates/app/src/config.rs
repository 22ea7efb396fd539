use std::path::PathBuf;

use ava_chat::Personas;
use ava_gateway::http::DEFAULT_BASE_URL;
use ava_storage::{JsonSnapshotStore, SNAPSHOT_FILE_NAME};
use figment::{
    Figment,
    providers::{Format, Json, Serialized},
};
use serde::{Deserialize, Serialize};

pub const CONFIG_DIRECTORY_NAME: &str = "avabox";
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Shell configuration, read once at startup.
///
/// Every field is optional in the file; missing or malformed configuration
/// degrades to defaults rather than refusing to start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShellConfig {
    /// Base URL of the reply backend.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Overrides the platform data directory for the conversation snapshot.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    #[serde(default = "default_user_name")]
    pub user_name: String,
    #[serde(default = "default_assistant_name")]
    pub assistant_name: String,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            data_dir: None,
            user_name: default_user_name(),
            assistant_name: default_assistant_name(),
        }
    }
}

impl ShellConfig {
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|path| path.join(CONFIG_DIRECTORY_NAME))
            .unwrap_or_else(|| PathBuf::from(".avabox"))
    }

    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join(CONFIG_FILE_NAME)
    }

    pub fn load() -> Self {
        Self::load_from(&Self::default_config_path())
    }

    pub fn load_from(path: &PathBuf) -> Self {
        if !path.exists() {
            tracing::info!(path = ?path, "config file not found, using defaults");
            return Self::default();
        }

        let figment = Figment::from(Serialized::defaults(Self::default())).merge(Json::file(path));

        match figment.extract::<Self>() {
            Ok(config) => config.normalized(),
            Err(error) => {
                tracing::warn!(
                    path = ?path,
                    error = %error,
                    "failed to parse config, using defaults"
                );
                Self::default()
            }
        }
    }

    pub fn normalized(mut self) -> Self {
        self.endpoint = if self.endpoint.trim().is_empty() {
            default_endpoint()
        } else {
            self.endpoint.trim().to_string()
        };
        self.user_name = if self.user_name.trim().is_empty() {
            default_user_name()
        } else {
            self.user_name.trim().to_string()
        };
        self.assistant_name = if self.assistant_name.trim().is_empty() {
            default_assistant_name()
        } else {
            self.assistant_name.trim().to_string()
        };

        self
    }

    /// Location of the conversation snapshot file.
    pub fn snapshot_path(&self) -> PathBuf {
        match &self.data_dir {
            Some(dir) => dir.join(SNAPSHOT_FILE_NAME),
            None => JsonSnapshotStore::default_path(),
        }
    }

    pub fn personas(&self) -> Personas {
        Personas {
            user_name: self.user_name.clone(),
            assistant_name: self.assistant_name.clone(),
            ..Personas::default()
        }
    }
}

fn default_endpoint() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_user_name() -> String {
    "You".to_string()
}

fn default_assistant_name() -> String {
    "Ava".to_string()
}
