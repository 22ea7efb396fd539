pub mod error;
pub mod json;
pub mod memory;
pub mod snapshot;

pub use error::{StorageError, StorageResult};
pub use json::{JsonSnapshotStore, SNAPSHOT_DIRECTORY_NAME, SNAPSHOT_FILE_NAME};
pub use memory::MemorySnapshotStore;
pub use snapshot::{MessageSnapshot, SnapshotAuthor};

/// Durable home of the conversation snapshot.
///
/// `load` is deliberately infallible: absent or corrupt data is treated as
/// "no history" so the chat surface always comes up.
pub trait SnapshotStore: Send + Sync {
    /// Overwrites the stored snapshot with the given records.
    fn save(&self, snapshot: &[MessageSnapshot]) -> StorageResult<()>;

    /// Restores the stored snapshot, or an empty one when nothing usable
    /// exists.
    fn load(&self) -> Vec<MessageSnapshot>;

    /// Deletes the stored snapshot wholesale.
    fn wipe(&self) -> StorageResult<()>;
}
