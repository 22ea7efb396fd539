use crate::message::EntryId;

/// Monotonic counter distinguishing reveal sessions.
///
/// This must change on every `begin` so a second concurrent reveal can be
/// detected and rejected instead of silently interleaving with the first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RevealGeneration(pub u64);

impl RevealGeneration {
    /// Creates a typed reveal generation.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

/// Weak reference to the entry a reveal sequence drains into.
///
/// The target is re-resolved against the log on every tick rather than held
/// as a direct reference, so a concurrent truncation simply makes the
/// sequence inert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RevealTarget {
    pub entry_id: EntryId,
    pub generation: RevealGeneration,
}

impl RevealTarget {
    /// Builds a reveal target from an entry id and session generation.
    pub const fn new(entry_id: EntryId, generation: RevealGeneration) -> Self {
        Self {
            entry_id,
            generation,
        }
    }
}

/// One step of reveal progress to apply to the target entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevealStep {
    /// Replace the target's content with the prefix revealed so far.
    Partial(String),
    /// Fix the target's content to the exact final string and settle it,
    /// superseding any partially-revealed value.
    Settle(String),
}

/// Progress of one reveal sequence, one character per tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevealSequence {
    target: RevealTarget,
    // Characters, not bytes, so non-ASCII text reveals one unit per tick.
    text: Vec<char>,
    revealed: usize,
}

impl RevealSequence {
    fn new(target: RevealTarget, text: &str) -> Self {
        Self {
            target,
            text: text.chars().collect(),
            revealed: 0,
        }
    }

    pub fn target(&self) -> RevealTarget {
        self.target
    }

    fn advance(&mut self) -> RevealStep {
        if self.revealed < self.text.len() {
            self.revealed += 1;
        }

        if self.revealed >= self.text.len() {
            RevealStep::Settle(self.text.iter().collect())
        } else {
            RevealStep::Partial(self.text[..self.revealed].iter().collect())
        }
    }
}

/// Rejection reason for an illegal `begin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealRejection {
    AlreadyRevealing {
        active: RevealTarget,
        attempted: RevealTarget,
    },
}

/// Result type for reveal transitions.
pub type RevealResult<T> = Result<T, RevealRejection>;

/// Deterministic reveal lifecycle.
///
/// At most one sequence is live at a time; `Cancelled` is the permanent
/// no-op state a sequence enters once its target disappears.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RevealState {
    #[default]
    Idle,
    Revealing(RevealSequence),
    Settled(RevealTarget),
    Cancelled(RevealTarget),
}

impl RevealState {
    /// Starts a new sequence. Rejected while another sequence is live.
    pub fn begin(&mut self, target: RevealTarget, text: &str) -> RevealResult<()> {
        if let Self::Revealing(sequence) = self {
            return Err(RevealRejection::AlreadyRevealing {
                active: sequence.target(),
                attempted: target,
            });
        }

        *self = Self::Revealing(RevealSequence::new(target, text));
        Ok(())
    }

    /// Returns the live target, if any.
    pub fn active_target(&self) -> Option<RevealTarget> {
        match self {
            Self::Revealing(sequence) => Some(sequence.target()),
            Self::Idle | Self::Settled(_) | Self::Cancelled(_) => None,
        }
    }

    pub fn is_revealing(&self) -> bool {
        matches!(self, Self::Revealing(_))
    }

    /// Advances the live sequence by one character and returns the step the
    /// caller must apply to the log. `None` when no sequence is live.
    pub fn tick(&mut self) -> Option<(RevealTarget, RevealStep)> {
        let Self::Revealing(sequence) = self else {
            return None;
        };

        let step = sequence.advance();
        let target = sequence.target();
        if matches!(step, RevealStep::Settle(_)) {
            *self = Self::Settled(target);
        }

        Some((target, step))
    }

    /// Makes the live sequence permanently inert; used when its target was
    /// truncated away or the log was wiped mid-flight.
    pub fn cancel(&mut self) -> Option<RevealTarget> {
        let target = self.active_target()?;
        *self = Self::Cancelled(target);
        Some(target)
    }
}
