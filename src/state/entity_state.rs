/// Entity lifecycle definitions
///
/// An entity's state is never stored directly; it is derived from the
/// durable link, the census marker and the done marker on every pass.
use std::fmt;

/// Represents where an entity stands in the harvest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityState {
    /// No remote link was found for the identifier; skipped on every pass
    Unresolved,

    /// Link known, but categories have not been counted yet
    Unprepared,

    /// Census done, at least one category still incomplete
    Pending,

    /// Every category reached its expected amount; permanent
    Done,
}

impl EntityState {
    /// Derives the state from what durable storage holds
    ///
    /// The done marker wins over everything else: once written it is never
    /// re-evaluated.
    pub fn derive(link: &str, prepared: bool, done: bool) -> Self {
        if done {
            Self::Done
        } else if link.is_empty() {
            Self::Unresolved
        } else if !prepared {
            Self::Unprepared
        } else {
            Self::Pending
        }
    }

    /// Returns true if the driver never touches this entity again in a pass
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Unresolved | Self::Done)
    }

    /// Returns true if the driver should crawl this entity
    pub fn is_crawlable(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Returns all possible entity states
    pub fn all_states() -> [Self; 4] {
        [Self::Unresolved, Self::Unprepared, Self::Pending, Self::Done]
    }
}

impl fmt::Display for EntityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unresolved => "unresolved",
            Self::Unprepared => "unprepared",
            Self::Pending => "pending",
            Self::Done => "done",
        };
        write!(f, "{}", s)
    }
}
