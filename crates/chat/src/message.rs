/// Synthetic, monotonically increasing identifier for one log entry.
///
/// Minted by the engine, never by the backend, so it is unambiguous even when
/// a user entry and its companion reply share one backend id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(pub u64);

impl EntryId {
    /// Creates a typed entry identifier.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

/// Backend-assigned identifier for one exchange (a user turn plus the
/// assistant reply it produced). Both entries of the pair carry the same id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExchangeId(pub u64);

impl ExchangeId {
    /// Creates a typed exchange identifier.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

/// Chat speaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Author {
    User,
    Assistant,
}

/// Message body: plain text, or the transient typing marker shown while a
/// reply is pending. The typing marker is never persisted as such.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Text(String),
    TypingIndicator,
}

impl Content {
    /// Creates plain-text content.
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Returns the text when this content is textual.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::TypingIndicator => None,
        }
    }

    /// String-safe form used by persistence; non-text content becomes empty.
    pub fn to_persistable(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::TypingIndicator => String::new(),
        }
    }
}

/// Lifecycle status for one entry.
///
/// `Revealing` means the reveal engine is actively draining text into the
/// entry; `Editable` marks a user message eligible for in-place edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageStatus {
    Settled,
    Revealing,
    Editable,
}

/// One entry of the conversation log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub entry_id: EntryId,
    pub exchange_id: Option<ExchangeId>,
    pub author: Author,
    pub display_name: String,
    pub avatar_ref: String,
    pub content: Content,
    pub status: MessageStatus,
}

impl Message {
    /// Creates a message with explicit status.
    pub fn new(
        entry_id: EntryId,
        author: Author,
        display_name: impl Into<String>,
        avatar_ref: impl Into<String>,
        content: Content,
        status: MessageStatus,
    ) -> Self {
        Self {
            entry_id,
            exchange_id: None,
            author,
            display_name: display_name.into(),
            avatar_ref: avatar_ref.into(),
            content,
            status,
        }
    }

    /// Creates an editable user message; its exchange id is pending until the
    /// gateway reply arrives.
    pub fn user(
        entry_id: EntryId,
        display_name: impl Into<String>,
        avatar_ref: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self::new(
            entry_id,
            Author::User,
            display_name,
            avatar_ref,
            Content::text(text),
            MessageStatus::Editable,
        )
    }

    /// Creates the assistant placeholder shown while a reply is pending.
    pub fn assistant_revealing(
        entry_id: EntryId,
        display_name: impl Into<String>,
        avatar_ref: impl Into<String>,
    ) -> Self {
        Self::new(
            entry_id,
            Author::Assistant,
            display_name,
            avatar_ref,
            Content::TypingIndicator,
            MessageStatus::Revealing,
        )
    }

    /// Returns true once the message is no longer subject to reveal animation.
    pub fn is_settled(&self) -> bool {
        matches!(self.status, MessageStatus::Settled | MessageStatus::Editable)
    }
}

/// Ordered message log; insertion order is the display order and the only
/// order. Truncation may shorten the log but never reorders surviving entries.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Conversation {
    entries: Vec<Message>,
}

impl Conversation {
    /// Creates an empty conversation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a conversation from restored entries, preserving their order.
    pub fn from_entries(entries: Vec<Message>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[Message] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Inserts at the tail and returns the new length.
    pub fn append(&mut self, message: Message) -> usize {
        self.entries.push(message);
        self.entries.len()
    }

    /// Replaces the content of the first entry matching `id` by forward scan.
    /// A stale id is a silent no-op; the interaction must never fail the user.
    pub fn update_content(&mut self, id: ExchangeId, new_content: Content) {
        if let Some(position) = self.position_of(id) {
            self.entries[position].content = new_content;
        }
    }

    /// Retains every entry up to and including the first match of `id` and
    /// discards everything after it. An absent id is a no-op.
    pub fn truncate_after(&mut self, id: ExchangeId) {
        if let Some(position) = self.position_of(id) {
            self.entries.truncate(position + 1);
        }
    }

    /// Retains only entries whose exchange id is numerically strictly less
    /// than `id`. Entries still waiting for an exchange id compare as zero and
    /// are therefore retained. Idempotent.
    pub fn delete_from(&mut self, id: ExchangeId) {
        self.entries
            .retain(|entry| entry.exchange_id.map_or(0, |exchange_id| exchange_id.0) < id.0);
    }

    /// Resets to empty.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Looks up an entry by its synthetic id.
    pub fn entry(&self, entry_id: EntryId) -> Option<&Message> {
        self.entries.iter().find(|entry| entry.entry_id == entry_id)
    }

    /// Mutable lookup by synthetic id.
    pub fn entry_mut(&mut self, entry_id: EntryId) -> Option<&mut Message> {
        self.entries
            .iter_mut()
            .find(|entry| entry.entry_id == entry_id)
    }

    pub fn contains_entry(&self, entry_id: EntryId) -> bool {
        self.entry(entry_id).is_some()
    }

    /// Records the backend-assigned exchange id on an entry once it is known.
    /// A truncated-away entry is tolerated as a no-op.
    pub fn stamp_exchange_id(&mut self, entry_id: EntryId, exchange_id: ExchangeId) {
        if let Some(entry) = self.entry_mut(entry_id) {
            entry.exchange_id = Some(exchange_id);
        }
    }

    fn position_of(&self, id: ExchangeId) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.exchange_id == Some(id))
    }
}
