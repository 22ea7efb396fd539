use std::path::PathBuf;

use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum StorageError {
    #[snafu(display("failed to create snapshot directory at {path:?} on `{stage}`: {source}"))]
    CreateSnapshotDirectory {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("failed to serialize snapshot on `{stage}`: {source}"))]
    SerializeSnapshot {
        stage: &'static str,
        source: serde_json::Error,
    },
    #[snafu(display("failed to write snapshot file at {path:?} on `{stage}`: {source}"))]
    WriteSnapshotFile {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display(
        "failed to replace snapshot file from {from:?} to {to:?} on `{stage}`: {source}"
    ))]
    ReplaceSnapshotFile {
        stage: &'static str,
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("failed to remove snapshot file at {path:?} on `{stage}`: {source}"))]
    RemoveSnapshotFile {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
}

pub type StorageResult<T> = Result<T, StorageError>;
