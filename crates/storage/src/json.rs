use std::path::{Path, PathBuf};

use snafu::ResultExt;

use crate::error::{
    CreateSnapshotDirectorySnafu, RemoveSnapshotFileSnafu, ReplaceSnapshotFileSnafu,
    SerializeSnapshotSnafu, StorageResult, WriteSnapshotFileSnafu,
};
use crate::snapshot::MessageSnapshot;
use crate::SnapshotStore;

pub const SNAPSHOT_DIRECTORY_NAME: &str = "avabox";
pub const SNAPSHOT_FILE_NAME: &str = "chat_messages.json";

/// File-backed snapshot store: one JSON document, overwritten on every save
/// through a temp-file rename so a crash never leaves a half-written file.
#[derive(Debug, Clone)]
pub struct JsonSnapshotStore {
    path: PathBuf,
}

impl JsonSnapshotStore {
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .map(|path| path.join(SNAPSHOT_DIRECTORY_NAME))
            .unwrap_or_else(|| PathBuf::from(".avabox"))
    }

    pub fn default_path() -> PathBuf {
        Self::default_data_dir().join(SNAPSHOT_FILE_NAME)
    }

    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Store rooted at the platform data directory.
    pub fn at_default_path() -> Self {
        Self::new(Self::default_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotStore for JsonSnapshotStore {
    fn save(&self, snapshot: &[MessageSnapshot]) -> StorageResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).context(CreateSnapshotDirectorySnafu {
                stage: "create-snapshot-directory",
                path: parent.to_path_buf(),
            })?;
        }

        let content = serde_json::to_string_pretty(snapshot).context(SerializeSnapshotSnafu {
            stage: "serialize-snapshot-json",
        })?;

        let temp_path = self.path.with_extension("json.tmp");
        std::fs::write(&temp_path, content).context(WriteSnapshotFileSnafu {
            stage: "write-temporary-snapshot-file",
            path: temp_path.clone(),
        })?;

        std::fs::rename(&temp_path, &self.path).context(ReplaceSnapshotFileSnafu {
            stage: "rename-temporary-snapshot-file",
            from: temp_path,
            to: self.path.clone(),
        })?;

        Ok(())
    }

    fn load(&self) -> Vec<MessageSnapshot> {
        if !self.path.exists() {
            tracing::info!(path = ?self.path, "no snapshot file found, starting empty");
            return Vec::new();
        }

        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(error) => {
                tracing::warn!(
                    path = ?self.path,
                    error = %error,
                    "failed to read snapshot file, starting empty"
                );
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<MessageSnapshot>>(&raw) {
            Ok(snapshot) => snapshot,
            Err(error) => {
                tracing::warn!(
                    path = ?self.path,
                    error = %error,
                    "failed to parse snapshot file, starting empty"
                );
                Vec::new()
            }
        }
    }

    fn wipe(&self) -> StorageResult<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(error).context(RemoveSnapshotFileSnafu {
                stage: "remove-snapshot-file",
                path: self.path.clone(),
            }),
        }
    }
}
