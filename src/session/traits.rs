//! Capability interface of the session collaborator
//!
//! The crawl core drives a catalog session only through these traits. A
//! session can navigate, wait for a condition, test whether something is on
//! the page, activate a control and hand the page to the extraction hook.
//! Every failure is reported as an [`OpFailure`] so the retry controller can
//! classify it.

use crate::catalog::{Extract, Extracted};
use crate::session::ProxyIdentity;
use crate::OpFailure;
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use url::Url;

/// Something the core may look for on a rendered page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// The catalog's "anonymous access blocked" notice
    BlockedNotice,

    /// An anti-bot challenge frame
    ChallengeFrame,

    /// A server error page
    ServerErrorBanner,

    /// The "nothing matches the query" notice of a title search
    NothingFound,

    /// The table of search or listing results
    ResultTable,

    /// The table of categories of an entity
    CategoryTable,

    /// One category row in the categories table
    CategoryRow(String),

    /// The marker showing a category selection is still active server-side
    ActiveSelection,

    /// The "next page" control of a listing
    NextPage,
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BlockedNotice => write!(f, "blocked notice"),
            Self::ChallengeFrame => write!(f, "challenge frame"),
            Self::ServerErrorBanner => write!(f, "server error banner"),
            Self::NothingFound => write!(f, "nothing-found notice"),
            Self::ResultTable => write!(f, "result table"),
            Self::CategoryTable => write!(f, "category table"),
            Self::CategoryRow(id) => write!(f, "category row {}", id),
            Self::ActiveSelection => write!(f, "active selection marker"),
            Self::NextPage => write!(f, "next page control"),
        }
    }
}

/// An interaction that changes what the session shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Control {
    /// Expand the categories panel of an entity page
    ShowCategories,

    /// Select exactly one category and run the publication search
    ChooseCategory(String),

    /// Jump to a 1-based page of the current listing
    GotoPage(u64),

    /// Follow the "next page" control
    NextPage,

    /// Search the catalog titles by identifier
    SearchTitle(String),
}

/// A condition to wait for, bounded by a timeout
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// The current page finished loading
    Loaded,

    /// The target is present on the current page
    Present(Target),
}

/// A live browsing context bound to exactly one network identity
#[async_trait(?Send)]
pub trait Session {
    /// Loads a URL
    async fn navigate(&mut self, url: &Url) -> Result<(), OpFailure>;

    /// Waits until the condition holds or the timeout elapses
    async fn wait_for(&mut self, condition: &Condition, timeout: Duration)
        -> Result<(), OpFailure>;

    /// Returns true if the target is on the current page
    async fn locate(&mut self, target: &Target) -> Result<bool, OpFailure>;

    /// Activates a control on the current page
    async fn activate(&mut self, control: &Control) -> Result<(), OpFailure>;

    /// Passes the current page to the extraction hook
    async fn extract(&mut self, request: Extract) -> Result<Extracted, OpFailure>;

    /// Releases the session
    async fn close(&mut self);
}

/// Factory of sessions
#[async_trait(?Send)]
pub trait Browser {
    type Session: Session;

    /// Launches a new session bound to the given identity
    async fn launch(&mut self, identity: &ProxyIdentity) -> Result<Self::Session, OpFailure>;
}
