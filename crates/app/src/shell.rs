use ava_chat::{Content, EntryId, ExchangeId, Message};
use snafu::{ResultExt, Snafu};

pub const WELCOME_MESSAGE: &str =
    "Hello.👋 I'm Your Personal Assistant. You can ask me any questions.";

/// Canned prompts offered at startup; `/1`..`/3` submit them verbatim.
pub const QUICK_REPLIES: [&str; 3] = [
    "Ola! How are you ?",
    "Write a beautiful Quote on Life",
    "What's your opinion on AI ?",
];

pub const HELP_TEXT: &str = "\
Type a message and press enter to send it.
  /1 … /3            send a quick reply
  /edit <id> <text>  rewrite a sent message and regenerate everything after it
  /delete <id>       drop a message and everything after it
  /clear             reset the conversation
  /help              show this help
  /quit              exit";

const TRANSCRIPT_BREAK: &str = "────────────────────────────";

/// What one input line asks the shell to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellAction {
    /// Blank line; nothing to do.
    Nothing,
    Send(String),
    Edit {
        exchange_id: ExchangeId,
        new_content: String,
    },
    DeleteFrom {
        exchange_id: ExchangeId,
    },
    Clear,
    Help,
    Quit,
}

#[derive(Debug, Snafu)]
pub enum ParseError {
    #[snafu(display("`{command}` needs an argument, see /help"))]
    MissingArgument { command: String },
    #[snafu(display("`{raw}` is not a message id: {source}"))]
    InvalidExchangeId {
        raw: String,
        source: std::num::ParseIntError,
    },
    #[snafu(display("unknown command `{raw}`, see /help"))]
    UnknownCommand { raw: String },
}

/// Parses one input line. Anything not starting with `/` is a plain send.
pub fn parse_line(line: &str) -> Result<ShellAction, ParseError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(ShellAction::Nothing);
    }
    if !trimmed.starts_with('/') {
        return Ok(ShellAction::Send(trimmed.to_string()));
    }

    let mut parts = trimmed.splitn(2, char::is_whitespace);
    let command = parts.next().unwrap_or_default();
    let rest = parts.next().unwrap_or_default().trim();

    match command {
        "/help" => Ok(ShellAction::Help),
        "/quit" => Ok(ShellAction::Quit),
        "/clear" => Ok(ShellAction::Clear),
        "/1" => Ok(ShellAction::Send(QUICK_REPLIES[0].to_string())),
        "/2" => Ok(ShellAction::Send(QUICK_REPLIES[1].to_string())),
        "/3" => Ok(ShellAction::Send(QUICK_REPLIES[2].to_string())),
        "/delete" => {
            let exchange_id = parse_exchange_id(command, rest)?;
            Ok(ShellAction::DeleteFrom { exchange_id })
        }
        "/edit" => {
            let mut arguments = rest.splitn(2, char::is_whitespace);
            let raw_id = arguments.next().unwrap_or_default();
            let new_content = arguments.next().unwrap_or_default().trim();
            let exchange_id = parse_exchange_id(command, raw_id)?;
            if new_content.is_empty() {
                return MissingArgumentSnafu { command }.fail();
            }
            Ok(ShellAction::Edit {
                exchange_id,
                new_content: new_content.to_string(),
            })
        }
        other => UnknownCommandSnafu { raw: other }.fail(),
    }
}

fn parse_exchange_id(command: &str, raw: &str) -> Result<ExchangeId, ParseError> {
    if raw.is_empty() {
        return MissingArgumentSnafu { command }.fail();
    }
    let id = raw
        .parse::<u64>()
        .context(InvalidExchangeIdSnafu { raw })?;
    Ok(ExchangeId::new(id))
}

/// Incremental transcript printer.
///
/// Reveal ticks refresh the whole log many times per second; printing each
/// refresh would flood a terminal. Instead an entry is printed once when it
/// appears and once more when it settles, and any truncation or rewrite of
/// already printed entries triggers a full redraw.
#[derive(Debug, Default)]
pub struct Transcript {
    rendered: Vec<RenderedEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct RenderedEntry {
    entry_id: EntryId,
    // Content text only; the id tag is stamped onto a line after the fact
    // and must not count as a rewrite.
    body: String,
    settled: bool,
}

impl RenderedEntry {
    fn of(entry: &Message) -> Self {
        Self {
            entry_id: entry.entry_id,
            body: entry.content.to_persistable(),
            settled: entry.is_settled(),
        }
    }
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the lines to print for this refresh of the log.
    pub fn apply(&mut self, entries: &[Message]) -> Vec<String> {
        if self.diverges_from(entries) {
            return self.redraw(entries);
        }

        let mut lines = Vec::new();
        for (index, entry) in entries.iter().enumerate() {
            match self.rendered.get_mut(index) {
                None => {
                    lines.push(render_entry(entry));
                    self.rendered.push(RenderedEntry::of(entry));
                }
                Some(rendered) => {
                    // Reprint only the settling transition, not every
                    // partially revealed prefix.
                    if entry.is_settled() && !rendered.settled {
                        lines.push(render_entry(entry));
                        *rendered = RenderedEntry::of(entry);
                    }
                }
            }
        }

        lines
    }

    /// True when an already printed entry was removed or rewritten, which
    /// the append-only fast path cannot express.
    fn diverges_from(&self, entries: &[Message]) -> bool {
        if self.rendered.len() > entries.len() {
            return true;
        }
        self.rendered.iter().zip(entries).any(|(rendered, entry)| {
            rendered.entry_id != entry.entry_id
                || (rendered.settled && rendered.body != entry.content.to_persistable())
        })
    }

    fn redraw(&mut self, entries: &[Message]) -> Vec<String> {
        self.rendered = entries.iter().map(RenderedEntry::of).collect();

        let mut lines = vec![TRANSCRIPT_BREAK.to_string()];
        lines.extend(entries.iter().map(render_entry));
        lines
    }
}

fn render_entry(entry: &Message) -> String {
    let text = match &entry.content {
        Content::Text(text) => text.clone(),
        Content::TypingIndicator => return format!("{} is typing…", entry.display_name),
    };

    // Messages without a backend id cannot be edited or deleted, so no id
    // tag is shown for them.
    match entry.exchange_id {
        Some(exchange_id) => format!("[#{}] {}: {}", exchange_id.0, entry.display_name, text),
        None => format!("{}: {}", entry.display_name, text),
    }
}
