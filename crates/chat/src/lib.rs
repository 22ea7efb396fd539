//! Conversation state for the Ava chat client.
//!
//! The crate owns the ordered message log, the character-by-character reveal
//! of assistant replies, the follow-the-bottom scroll heuristic, and the
//! engine loop that serializes every mutation through one queue.

pub mod engine;
pub mod message;
pub mod reveal;
pub mod scroll;

pub use engine::{
    ChatEngine, ChatEngineHandle, Command, PendingExchange, Personas, ViewEvent,
    REVEAL_TICK_INTERVAL, SNAPSHOT_EXPIRY_PERIOD,
};
pub use message::{
    Author, Content, Conversation, EntryId, ExchangeId, Message, MessageStatus,
};
pub use reveal::{
    RevealGeneration, RevealRejection, RevealSequence, RevealState, RevealStep, RevealTarget,
};
pub use scroll::{FollowState, ScrollFollow, ScrollSample, FOLLOW_REARM_QUIET_PERIOD};
