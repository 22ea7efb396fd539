use std::sync::Arc;
use std::time::{Duration, Instant};

use ava_gateway::{BackendGateway, GatewayReply};
use ava_storage::{MessageSnapshot, SnapshotAuthor, SnapshotStore};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use crate::message::{
    Author, Content, Conversation, EntryId, ExchangeId, Message, MessageStatus,
};
use crate::reveal::{RevealGeneration, RevealRejection, RevealState, RevealStep, RevealTarget};
use crate::scroll::{ScrollFollow, ScrollSample};

/// Interval between reveal ticks; one character is revealed per tick.
pub const REVEAL_TICK_INTERVAL: Duration = Duration::from_millis(5);

/// Period of the unconditional snapshot wipe. The countdown restarts only on
/// process restart, never on mutations.
pub const SNAPSHOT_EXPIRY_PERIOD: Duration = Duration::from_secs(300);

/// Presentation identity for the two speakers; opaque to the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Personas {
    pub user_name: String,
    pub user_avatar: String,
    pub assistant_name: String,
    pub assistant_avatar: String,
}

impl Default for Personas {
    fn default() -> Self {
        Self {
            user_name: "You".to_string(),
            user_avatar: "bot_img.png".to_string(),
            assistant_name: "Ava".to_string(),
            assistant_avatar: "bot_img.png".to_string(),
        }
    }
}

/// Entry pair an in-flight gateway call resolves into. The user entry is
/// absent for edits, where only the fresh placeholder needs stamping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingExchange {
    pub user_entry: Option<EntryId>,
    pub placeholder_entry: EntryId,
}

/// Mutation requests; every write to the log is serialized through this
/// queue, including the engine's own timer-driven ones.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// User submitted new text (a quick-reply selection is exactly this).
    Submit { content: String },
    /// In-place edit of a previously sent message; drops every later turn
    /// and re-solicits the reply.
    Edit {
        exchange_id: ExchangeId,
        new_content: String,
    },
    /// Drop the matching message and everything chronologically after it.
    DeleteFrom { exchange_id: ExchangeId },
    /// Reset the conversation and the persisted snapshot.
    Clear,
    /// The view reported a scroll position.
    Scrolled { sample: ScrollSample },
    /// Internal: a gateway call resolved for a previously appended pair.
    ReplyArrived {
        pending: PendingExchange,
        reply: GatewayReply,
    },
    /// Stop the engine loop.
    Shutdown,
}

/// Notifications for whatever renders the conversation.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
    /// Full refreshed log; sent after every mutation.
    MessagesChanged(Vec<Message>),
    /// The follow controller decided the view must jump to the newest entry.
    ScrollToBottom,
}

/// Caller-side handle to a running engine.
pub struct ChatEngineHandle {
    pub commands: mpsc::UnboundedSender<Command>,
    pub view_events: mpsc::UnboundedReceiver<ViewEvent>,
}

/// Single owner of the conversation state.
///
/// All mutations — user commands, gateway replies, reveal ticks, the expiry
/// wipe — are applied in one place, so the independently scheduled timers
/// never race on shared state.
pub struct ChatEngine {
    conversation: Conversation,
    reveal: RevealState,
    follow: ScrollFollow,
    snapshots: Arc<dyn SnapshotStore>,
    gateway: Arc<dyn BackendGateway>,
    personas: Personas,
    next_entry_id: u64,
    next_generation: u64,
    commands_tx: mpsc::UnboundedSender<Command>,
    commands_rx: mpsc::UnboundedReceiver<Command>,
    view_tx: mpsc::UnboundedSender<ViewEvent>,
}

impl ChatEngine {
    /// Builds an engine, restoring any persisted history.
    pub fn new(
        snapshots: Arc<dyn SnapshotStore>,
        gateway: Arc<dyn BackendGateway>,
        personas: Personas,
    ) -> (Self, ChatEngineHandle) {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (view_tx, view_events) = mpsc::unbounded_channel();

        let mut next_entry_id = 1;
        let restored = snapshots
            .load()
            .into_iter()
            .map(|record| {
                let entry_id = EntryId::new(next_entry_id);
                next_entry_id += 1;
                snapshot_to_message(entry_id, record)
            })
            .collect::<Vec<_>>();

        if !restored.is_empty() {
            tracing::info!(entry_count = restored.len(), "restored conversation history");
        }

        let engine = Self {
            conversation: Conversation::from_entries(restored),
            reveal: RevealState::default(),
            follow: ScrollFollow::new(),
            snapshots,
            gateway,
            personas,
            next_entry_id,
            next_generation: 1,
            commands_tx: commands_tx.clone(),
            commands_rx,
            view_tx,
        };

        let handle = ChatEngineHandle {
            commands: commands_tx,
            view_events,
        };

        (engine, handle)
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Runs the mutation loop until `Shutdown` or all senders are dropped.
    pub async fn run(mut self) {
        let started_at = tokio::time::Instant::now();
        let mut reveal_ticks =
            tokio::time::interval_at(started_at + REVEAL_TICK_INTERVAL, REVEAL_TICK_INTERVAL);
        // Skip ticks missed while no reveal is live instead of bursting.
        reveal_ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut expiry =
            tokio::time::interval_at(started_at + SNAPSHOT_EXPIRY_PERIOD, SNAPSHOT_EXPIRY_PERIOD);
        expiry.set_missed_tick_behavior(MissedTickBehavior::Skip);

        // Let the view render the restored history right away.
        self.notify_view(Instant::now());

        loop {
            tokio::select! {
                command = self.commands_rx.recv() => match command {
                    None | Some(Command::Shutdown) => break,
                    Some(command) => self.handle_command(command),
                },
                _ = reveal_ticks.tick(), if self.reveal.is_revealing() => {
                    self.apply_reveal_tick();
                }
                _ = expiry.tick() => self.expire(),
            }
        }

        tracing::debug!("chat engine loop stopped");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Submit { content } => self.handle_submit(content),
            Command::Edit {
                exchange_id,
                new_content,
            } => self.handle_edit(exchange_id, new_content),
            Command::DeleteFrom { exchange_id } => self.handle_delete_from(exchange_id),
            Command::Clear => self.handle_clear(),
            Command::Scrolled { sample } => {
                self.follow.observe_sample(sample, Instant::now());
            }
            Command::ReplyArrived { pending, reply } => self.handle_reply(pending, reply),
            Command::Shutdown => {}
        }
    }

    fn handle_submit(&mut self, content: String) {
        let user_entry = self.alloc_entry_id();
        self.conversation.append(Message::user(
            user_entry,
            self.personas.user_name.clone(),
            self.personas.user_avatar.clone(),
            content.clone(),
        ));

        let placeholder_entry = self.append_placeholder();
        self.after_mutation();

        let pending = PendingExchange {
            user_entry: Some(user_entry),
            placeholder_entry,
        };
        let gateway = Arc::clone(&self.gateway);
        let commands = self.commands_tx.clone();
        tokio::spawn(async move {
            let reply = gateway.send_message(content).await;
            // A closed queue means the engine is gone; nothing left to do.
            let _ = commands.send(Command::ReplyArrived { pending, reply });
        });
    }

    /// The five-step edit protocol. Deliberately not transactional: the
    /// truncation stands even if the gateway call later falls back.
    fn handle_edit(&mut self, exchange_id: ExchangeId, new_content: String) {
        self.conversation
            .update_content(exchange_id, Content::text(new_content.clone()));
        self.conversation.truncate_after(exchange_id);
        self.cancel_reveal_if_target_lost();

        let placeholder_entry = self.append_placeholder();
        self.after_mutation();

        let pending = PendingExchange {
            user_entry: None,
            placeholder_entry,
        };
        let gateway = Arc::clone(&self.gateway);
        let commands = self.commands_tx.clone();
        tokio::spawn(async move {
            let reply = gateway.edit_message(exchange_id.0, new_content).await;
            let _ = commands.send(Command::ReplyArrived { pending, reply });
        });
    }

    fn handle_delete_from(&mut self, exchange_id: ExchangeId) {
        self.conversation.delete_from(exchange_id);
        self.cancel_reveal_if_target_lost();
        self.after_mutation();
    }

    fn handle_clear(&mut self) {
        self.conversation.clear();
        self.reveal.cancel();
        self.follow.reset();

        if let Err(error) = self.snapshots.wipe() {
            tracing::warn!(error = %error, "failed to wipe snapshot on clear");
        }

        self.notify_view(Instant::now());
    }

    fn handle_reply(&mut self, pending: PendingExchange, reply: GatewayReply) {
        if !self.conversation.contains_entry(pending.placeholder_entry) {
            // Truncated or expired while the call was in flight; the reply
            // has nowhere to land, so nothing gets stamped either.
            tracing::debug!(
                placeholder = ?pending.placeholder_entry,
                "reply arrived for a removed placeholder"
            );
            return;
        }

        if let Some(raw_id) = reply.id {
            let exchange_id = ExchangeId::new(raw_id);
            if let Some(user_entry) = pending.user_entry {
                self.conversation.stamp_exchange_id(user_entry, exchange_id);
            }
            self.conversation
                .stamp_exchange_id(pending.placeholder_entry, exchange_id);
        }

        let target = RevealTarget::new(pending.placeholder_entry, self.alloc_generation());
        if let Err(RevealRejection::AlreadyRevealing { active, attempted }) =
            self.reveal.begin(target, &reply.response)
        {
            // Only one reveal animates at a time; the losing reply still
            // must land, so its placeholder settles in one step.
            tracing::warn!(
                active = ?active,
                attempted = ?attempted,
                "overlapping reveal rejected, settling the reply without animation"
            );
            if let Some(entry) = self.conversation.entry_mut(pending.placeholder_entry) {
                entry.content = Content::text(reply.response);
                entry.status = MessageStatus::Settled;
            }
        }

        self.after_mutation();
    }

    /// Advances the live reveal by one character. The target is re-resolved
    /// on every tick; a vanished target turns the sequence inert.
    fn apply_reveal_tick(&mut self) {
        let Some(target) = self.reveal.active_target() else {
            return;
        };

        if !self.conversation.contains_entry(target.entry_id) {
            self.reveal.cancel();
            return;
        }

        let Some((target, step)) = self.reveal.tick() else {
            return;
        };

        if let Some(entry) = self.conversation.entry_mut(target.entry_id) {
            match step {
                RevealStep::Partial(prefix) => {
                    entry.content = Content::text(prefix);
                }
                RevealStep::Settle(full_text) => {
                    entry.content = Content::text(full_text);
                    entry.status = MessageStatus::Settled;
                }
            }
        }

        self.after_mutation();
    }

    /// Unconditional wipe on the global expiry clock, independent of user
    /// activity and of any in-flight reveal or edit.
    fn expire(&mut self) {
        tracing::info!(
            entry_count = self.conversation.len(),
            "conversation expired, wiping snapshot"
        );

        self.conversation.clear();
        self.reveal.cancel();

        if let Err(error) = self.snapshots.wipe() {
            tracing::warn!(error = %error, "failed to wipe expired snapshot");
        }

        self.notify_view(Instant::now());
    }

    fn append_placeholder(&mut self) -> EntryId {
        let entry_id = self.alloc_entry_id();
        self.conversation.append(Message::assistant_revealing(
            entry_id,
            self.personas.assistant_name.clone(),
            self.personas.assistant_avatar.clone(),
        ));
        entry_id
    }

    fn cancel_reveal_if_target_lost(&mut self) {
        if let Some(target) = self.reveal.active_target()
            && !self.conversation.contains_entry(target.entry_id)
        {
            self.reveal.cancel();
        }
    }

    /// Write-through persistence plus the follow decision, applied after
    /// every log mutation.
    fn after_mutation(&mut self) {
        self.persist();
        self.notify_view(Instant::now());
    }

    fn persist(&self) {
        let records = self
            .conversation
            .entries()
            .iter()
            .map(message_to_snapshot)
            .collect::<Vec<_>>();

        if let Err(error) = self.snapshots.save(&records) {
            tracing::warn!(error = %error, "failed to save conversation snapshot");
        }
    }

    fn notify_view(&mut self, now: Instant) {
        let _ = self.view_tx.send(ViewEvent::MessagesChanged(
            self.conversation.entries().to_vec(),
        ));

        if self.follow.should_follow(now) {
            let _ = self.view_tx.send(ViewEvent::ScrollToBottom);
        }
    }

    fn alloc_entry_id(&mut self) -> EntryId {
        let id = EntryId::new(self.next_entry_id);
        self.next_entry_id = self.next_entry_id.saturating_add(1);
        id
    }

    fn alloc_generation(&mut self) -> RevealGeneration {
        let generation = RevealGeneration::new(self.next_generation);
        self.next_generation = self.next_generation.saturating_add(1);
        generation
    }
}

fn message_to_snapshot(message: &Message) -> MessageSnapshot {
    MessageSnapshot::new(
        message.exchange_id.map(|exchange_id| exchange_id.0),
        author_to_snapshot(message.author),
        message.display_name.clone(),
        message.avatar_ref.clone(),
        message.content.to_persistable(),
    )
}

fn snapshot_to_message(entry_id: EntryId, record: MessageSnapshot) -> Message {
    let author = snapshot_to_author(record.author);
    // Restored entries are final; user turns stay editable.
    let status = match author {
        Author::User => MessageStatus::Editable,
        Author::Assistant => MessageStatus::Settled,
    };

    let mut message = Message::new(
        entry_id,
        author,
        record.display_name,
        record.avatar_ref,
        Content::Text(record.content),
        status,
    );
    message.exchange_id = record.id.map(ExchangeId::new);
    message
}

fn author_to_snapshot(author: Author) -> SnapshotAuthor {
    match author {
        Author::User => SnapshotAuthor::User,
        Author::Assistant => SnapshotAuthor::Assistant,
    }
}

fn snapshot_to_author(author: SnapshotAuthor) -> Author {
    match author {
        SnapshotAuthor::User => Author::User,
        SnapshotAuthor::Assistant => Author::Assistant,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use ava_gateway::{BoxFuture, FALLBACK_REPLY};
    use ava_storage::MemorySnapshotStore;

    /// Gateway double that replays canned replies and records edit calls.
    #[derive(Debug, Default)]
    struct ScriptedGateway {
        send_replies: Mutex<VecDeque<GatewayReply>>,
        edit_replies: Mutex<VecDeque<GatewayReply>>,
        edit_calls: Mutex<Vec<(u64, String)>>,
    }

    impl ScriptedGateway {
        fn with_send_replies(replies: Vec<GatewayReply>) -> Self {
            Self {
                send_replies: Mutex::new(replies.into()),
                ..Self::default()
            }
        }

        fn with_edit_replies(replies: Vec<GatewayReply>) -> Self {
            Self {
                edit_replies: Mutex::new(replies.into()),
                ..Self::default()
            }
        }

        fn edit_calls(&self) -> Vec<(u64, String)> {
            self.edit_calls.lock().unwrap().clone()
        }
    }

    impl BackendGateway for ScriptedGateway {
        fn send_message(&self, _content: String) -> BoxFuture<'_, GatewayReply> {
            let reply = self
                .send_replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(GatewayReply::fallback);
            Box::pin(async move { reply })
        }

        fn edit_message(&self, id: u64, new_content: String) -> BoxFuture<'_, GatewayReply> {
            self.edit_calls.lock().unwrap().push((id, new_content));
            let reply = self
                .edit_replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(GatewayReply::fallback);
            Box::pin(async move { reply })
        }
    }

    fn seeded_history() -> Vec<MessageSnapshot> {
        vec![
            MessageSnapshot::new(Some(1), SnapshotAuthor::User, "You", "bot_img.png", "one"),
            MessageSnapshot::new(
                Some(2),
                SnapshotAuthor::Assistant,
                "Ava",
                "bot_img.png",
                "two",
            ),
            MessageSnapshot::new(Some(3), SnapshotAuthor::User, "You", "bot_img.png", "foo"),
            MessageSnapshot::new(
                Some(4),
                SnapshotAuthor::Assistant,
                "Ava",
                "bot_img.png",
                "four",
            ),
            MessageSnapshot::new(Some(5), SnapshotAuthor::User, "You", "bot_img.png", "five"),
        ]
    }

    /// Drains view events until the log satisfies the predicate.
    async fn wait_for_log(
        view_events: &mut mpsc::UnboundedReceiver<ViewEvent>,
        predicate: impl Fn(&[Message]) -> bool,
    ) -> Vec<Message> {
        loop {
            match view_events.recv().await {
                Some(ViewEvent::MessagesChanged(entries)) if predicate(&entries) => {
                    return entries;
                }
                Some(_) => {}
                None => panic!("view channel closed before the expected log appeared"),
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn send_reveals_the_reply_into_the_placeholder() {
        let snapshots = Arc::new(MemorySnapshotStore::new());
        let gateway = Arc::new(ScriptedGateway::with_send_replies(vec![GatewayReply::new(
            "Hello",
            Some(1),
        )]));
        let (engine, mut handle) =
            ChatEngine::new(snapshots.clone(), gateway, Personas::default());
        tokio::spawn(engine.run());

        handle
            .commands
            .send(Command::Submit {
                content: "Hi".to_string(),
            })
            .unwrap();

        let entries = wait_for_log(&mut handle.view_events, |entries| {
            entries.len() == 2 && entries[1].is_settled()
        })
        .await;

        assert_eq!(entries[0].author, Author::User);
        assert_eq!(entries[0].content, Content::text("Hi"));
        assert_eq!(entries[0].status, MessageStatus::Editable);
        assert_eq!(entries[0].exchange_id, Some(ExchangeId::new(1)));

        assert_eq!(entries[1].author, Author::Assistant);
        assert_eq!(entries[1].content, Content::text("Hello"));
        assert_eq!(entries[1].status, MessageStatus::Settled);
        assert_eq!(entries[1].exchange_id, Some(ExchangeId::new(1)));

        // Write-through persistence caught up with the final state.
        let persisted = snapshots.records();
        assert_eq!(persisted.len(), 2);
        assert_eq!(persisted[0].content, "Hi");
        assert_eq!(persisted[1].content, "Hello");
    }

    #[tokio::test(start_paused = true)]
    async fn placeholder_shows_the_typing_marker_until_the_reply_lands() {
        let snapshots = Arc::new(MemorySnapshotStore::new());
        let gateway = Arc::new(ScriptedGateway::with_send_replies(vec![GatewayReply::new(
            "ok",
            Some(1),
        )]));
        let (engine, mut handle) =
            ChatEngine::new(snapshots.clone(), gateway, Personas::default());
        tokio::spawn(engine.run());

        handle
            .commands
            .send(Command::Submit {
                content: "Hi".to_string(),
            })
            .unwrap();

        let entries =
            wait_for_log(&mut handle.view_events, |entries| entries.len() == 2).await;
        assert_eq!(entries[1].content, Content::TypingIndicator);
        assert_eq!(entries[1].status, MessageStatus::Revealing);

        // The typing marker is normalized to an empty string on disk.
        assert_eq!(snapshots.records()[1].content, "");
    }

    #[tokio::test(start_paused = true)]
    async fn edit_truncates_rewrites_and_regenerates() {
        let snapshots = Arc::new(MemorySnapshotStore::with_records(seeded_history()));
        let gateway = Arc::new(ScriptedGateway::with_edit_replies(vec![GatewayReply::new(
            "fresh reply",
            Some(4),
        )]));
        let (engine, mut handle) =
            ChatEngine::new(snapshots.clone(), gateway.clone(), Personas::default());
        tokio::spawn(engine.run());

        handle
            .commands
            .send(Command::Edit {
                exchange_id: ExchangeId::new(3),
                new_content: "bar".to_string(),
            })
            .unwrap();

        let entries = wait_for_log(&mut handle.view_events, |entries| {
            entries.len() == 4 && entries[3].is_settled()
        })
        .await;

        // Positions 0..=2 survive, the edited entry holds the new text, and
        // the regenerated reply landed in a fresh tail entry.
        assert_eq!(entries[0].content, Content::text("one"));
        assert_eq!(entries[1].content, Content::text("two"));
        assert_eq!(entries[2].content, Content::text("bar"));
        assert_eq!(entries[2].exchange_id, Some(ExchangeId::new(3)));
        assert_eq!(entries[3].author, Author::Assistant);
        assert_eq!(entries[3].content, Content::text("fresh reply"));

        assert_eq!(gateway.edit_calls(), vec![(3, "bar".to_string())]);
    }

    #[tokio::test(start_paused = true)]
    async fn transport_failure_settles_the_apology_without_ids() {
        let snapshots = Arc::new(MemorySnapshotStore::new());
        // No scripted replies: every call degrades to the fallback.
        let gateway = Arc::new(ScriptedGateway::default());
        let (engine, mut handle) =
            ChatEngine::new(snapshots.clone(), gateway, Personas::default());
        tokio::spawn(engine.run());

        handle
            .commands
            .send(Command::Submit {
                content: "Hi".to_string(),
            })
            .unwrap();

        let entries = wait_for_log(&mut handle.view_events, |entries| {
            entries.len() == 2 && entries[1].is_settled()
        })
        .await;

        assert_eq!(entries[1].content, Content::text(FALLBACK_REPLY));
        assert_eq!(entries[0].exchange_id, None);
        assert_eq!(entries[1].exchange_id, None);
    }

    #[tokio::test(start_paused = true)]
    async fn expiry_wipes_the_log_and_the_snapshot() {
        let snapshots = Arc::new(MemorySnapshotStore::with_records(seeded_history()));
        let gateway = Arc::new(ScriptedGateway::default());
        let (engine, mut handle) =
            ChatEngine::new(snapshots.clone(), gateway, Personas::default());
        assert_eq!(engine.conversation().len(), 5);
        tokio::spawn(engine.run());

        let entries =
            wait_for_log(&mut handle.view_events, |entries| entries.is_empty()).await;

        assert!(entries.is_empty());
        assert!(snapshots.records().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn clear_resets_the_log_and_the_snapshot() {
        let snapshots = Arc::new(MemorySnapshotStore::with_records(seeded_history()));
        let gateway = Arc::new(ScriptedGateway::default());
        let (engine, mut handle) =
            ChatEngine::new(snapshots.clone(), gateway, Personas::default());
        tokio::spawn(engine.run());

        handle.commands.send(Command::Clear).unwrap();

        wait_for_log(&mut handle.view_events, |entries| entries.is_empty()).await;
        assert!(snapshots.records().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn reviewing_suppresses_scroll_to_bottom_until_resumed() {
        let snapshots = Arc::new(MemorySnapshotStore::new());
        let gateway = Arc::new(ScriptedGateway::with_send_replies(vec![GatewayReply::new(
            "Hello",
            Some(1),
        )]));
        let (engine, mut handle) =
            ChatEngine::new(snapshots, gateway, Personas::default());
        tokio::spawn(engine.run());

        // Away-from-bottom sample before anything mutates.
        handle
            .commands
            .send(Command::Scrolled {
                sample: ScrollSample::new(0.0, 300.0, 900.0),
            })
            .unwrap();
        handle
            .commands
            .send(Command::Submit {
                content: "Hi".to_string(),
            })
            .unwrap();

        let mut scroll_requests = 0;
        loop {
            match handle.view_events.recv().await {
                Some(ViewEvent::ScrollToBottom) => scroll_requests += 1,
                Some(ViewEvent::MessagesChanged(entries))
                    if entries.len() == 2 && entries[1].is_settled() =>
                {
                    break;
                }
                Some(_) => {}
                None => panic!("view channel closed"),
            }
        }

        // Only the startup notification may scroll; every mutation during
        // review leaves the reading position alone.
        assert_eq!(scroll_requests, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn following_scrolls_on_every_mutation() {
        let snapshots = Arc::new(MemorySnapshotStore::new());
        let gateway = Arc::new(ScriptedGateway::with_send_replies(vec![GatewayReply::new(
            "Hey",
            Some(1),
        )]));
        let (engine, mut handle) =
            ChatEngine::new(snapshots, gateway, Personas::default());
        tokio::spawn(engine.run());

        handle
            .commands
            .send(Command::Submit {
                content: "Hi".to_string(),
            })
            .unwrap();

        let mut refreshes = 0;
        let mut scroll_requests = 0;
        let mut settled = false;
        while !settled {
            match handle.view_events.recv().await {
                Some(ViewEvent::MessagesChanged(entries)) => {
                    refreshes += 1;
                    settled = entries.len() == 2 && entries[1].is_settled();
                }
                Some(ViewEvent::ScrollToBottom) => scroll_requests += 1,
                None => panic!("view channel closed"),
            }
        }
        // The final refresh's scroll request is still queued behind it.
        if let Some(ViewEvent::ScrollToBottom) = handle.view_events.recv().await {
            scroll_requests += 1;
        }

        assert_eq!(refreshes, scroll_requests);
    }

    #[tokio::test(start_paused = true)]
    async fn reply_for_a_truncated_placeholder_is_dropped() {
        let snapshots = Arc::new(MemorySnapshotStore::new());
        let gateway = Arc::new(ScriptedGateway::default());
        let (engine, mut handle) =
            ChatEngine::new(snapshots, gateway, Personas::default());
        tokio::spawn(engine.run());

        // A reply whose placeholder never existed must leave the log alone.
        handle
            .commands
            .send(Command::ReplyArrived {
                pending: PendingExchange {
                    user_entry: None,
                    placeholder_entry: EntryId::new(77),
                },
                reply: GatewayReply::new("late", Some(9)),
            })
            .unwrap();
        handle
            .commands
            .send(Command::Submit {
                content: "after".to_string(),
            })
            .unwrap();

        let entries =
            wait_for_log(&mut handle.view_events, |entries| entries.len() == 2).await;
        assert_eq!(entries[0].content, Content::text("after"));
    }

    #[tokio::test(start_paused = true)]
    async fn overlapping_replies_both_settle_with_their_full_text() {
        let snapshots = Arc::new(MemorySnapshotStore::new());
        let gateway = Arc::new(ScriptedGateway::with_send_replies(vec![
            GatewayReply::new("a long first reply", Some(1)),
            GatewayReply::new("a long second reply", Some(2)),
        ]));
        let (engine, mut handle) =
            ChatEngine::new(snapshots, gateway, Personas::default());
        tokio::spawn(engine.run());

        // Both replies land before the first reveal can finish; only one
        // animates, but neither placeholder may stay a typing marker.
        handle
            .commands
            .send(Command::Submit {
                content: "one".to_string(),
            })
            .unwrap();
        handle
            .commands
            .send(Command::Submit {
                content: "two".to_string(),
            })
            .unwrap();

        let entries = wait_for_log(&mut handle.view_events, |entries| {
            entries.len() == 4 && entries.iter().all(Message::is_settled)
        })
        .await;

        assert!(
            entries
                .iter()
                .all(|entry| entry.content != Content::TypingIndicator)
        );
        assert_eq!(entries[0].exchange_id, entries[1].exchange_id);
        assert_eq!(entries[2].exchange_id, entries[3].exchange_id);
        assert!(entries[1].exchange_id.is_some());
        assert!(entries[3].exchange_id.is_some());

        let mut replies = vec![
            entries[1].content.to_persistable(),
            entries[3].content.to_persistable(),
        ];
        replies.sort();
        assert_eq!(replies, vec!["a long first reply", "a long second reply"]);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_reply_stamps_nothing_on_surviving_entries() {
        let snapshots = Arc::new(MemorySnapshotStore::new());
        let gateway = Arc::new(ScriptedGateway::default());
        let (engine, mut handle) =
            ChatEngine::new(snapshots, gateway, Personas::default());
        tokio::spawn(engine.run());

        handle
            .commands
            .send(Command::Submit {
                content: "Hi".to_string(),
            })
            .unwrap();
        wait_for_log(&mut handle.view_events, |entries| {
            entries.len() == 2 && entries[1].is_settled()
        })
        .await;

        // The placeholder of this pair is gone, so the id must not land on
        // the user entry either.
        handle
            .commands
            .send(Command::ReplyArrived {
                pending: PendingExchange {
                    user_entry: Some(EntryId::new(1)),
                    placeholder_entry: EntryId::new(99),
                },
                reply: GatewayReply::new("late", Some(42)),
            })
            .unwrap();
        handle
            .commands
            .send(Command::Submit {
                content: "again".to_string(),
            })
            .unwrap();

        let entries =
            wait_for_log(&mut handle.view_events, |entries| entries.len() == 4).await;
        assert_eq!(entries[0].exchange_id, None);
    }
}
