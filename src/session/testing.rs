//! Scripted fake catalog for unit tests
//!
//! Models the catalog as a stateful remote: a session shows one page at a
//! time, a listing only exists after a category was chosen, and the
//! selection marker can be dropped server-side. Faults are injected either
//! on the next navigations (queue) or when a given listing page renders.

use crate::catalog::{CategoryCount, Extract, Extracted};
use crate::session::{Browser, Condition, Control, ProxyIdentity, Session, Target};
use crate::storage::Record;
use crate::OpFailure;
use async_trait::async_trait;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::rc::Rc;
use std::time::Duration;
use url::Url;

/// A scripted failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    Network,
    Timeout,
    Unrecoverable,
    Blocked,
    Challenge,
    ServerError,
    DropSelection,
}

#[derive(Default)]
struct SiteState {
    page_size: u64,
    categories: BTreeMap<String, u64>,
    titles: HashMap<String, String>,
    navigation_faults: VecDeque<Fault>,
    page_faults: HashMap<(String, u64), Fault>,
    launched: Vec<ProxyIdentity>,
    navigations: Vec<String>,
    rendered: Vec<(String, u64)>,
    closed: u32,
}

/// Shared handle on the fake catalog
#[derive(Clone)]
pub struct FakeSite {
    state: Rc<RefCell<SiteState>>,
}

impl FakeSite {
    pub fn new(page_size: u64) -> Self {
        Self {
            state: Rc::new(RefCell::new(SiteState {
                page_size,
                ..SiteState::default()
            })),
        }
    }

    pub fn browser(&self) -> FakeBrowser {
        FakeBrowser { site: self.clone() }
    }

    /// Adds a category listing with `count` publications
    pub fn add_category(&self, category_id: &str, count: u64) {
        self.state
            .borrow_mut()
            .categories
            .insert(category_id.to_string(), count);
    }

    /// Makes a title search for `code` find `link`
    pub fn add_title(&self, code: &str, link: &str) {
        self.state
            .borrow_mut()
            .titles
            .insert(code.to_string(), link.to_string());
    }

    /// Fails the next navigation with the given fault
    pub fn push_fault(&self, fault: Fault) {
        self.state.borrow_mut().navigation_faults.push_back(fault);
    }

    /// Fails the first rendering of one listing page
    pub fn fault_on_page(&self, category_id: &str, page: u64, fault: Fault) {
        self.state
            .borrow_mut()
            .page_faults
            .insert((category_id.to_string(), page), fault);
    }

    /// The publication at a 1-based position of a category listing
    pub fn record(category_id: &str, position: u64) -> Record {
        Record {
            remote_id: format!("{}-{}", category_id, position),
            title: format!("publication {} of {}", position, category_id),
            link: format!("/item.asp?id={}-{}", category_id, position),
        }
    }

    pub fn launched_indices(&self) -> Vec<u32> {
        self.state
            .borrow()
            .launched
            .iter()
            .map(|identity| identity.index)
            .collect()
    }

    pub fn navigations(&self) -> Vec<String> {
        self.state.borrow().navigations.clone()
    }

    /// Every (category, page) a listing was rendered for, in order
    pub fn rendered_pages(&self) -> Vec<(String, u64)> {
        self.state.borrow().rendered.clone()
    }

    pub fn closed_sessions(&self) -> u32 {
        self.state.borrow().closed
    }

    fn pop_navigation_fault(&self) -> Option<Fault> {
        self.state.borrow_mut().navigation_faults.pop_front()
    }

    fn take_page_fault(&self, category_id: &str, page: u64) -> Option<Fault> {
        self.state
            .borrow_mut()
            .page_faults
            .remove(&(category_id.to_string(), page))
    }

    fn count(&self, category_id: &str) -> Option<u64> {
        self.state.borrow().categories.get(category_id).copied()
    }

    fn page_size(&self) -> u64 {
        self.state.borrow().page_size.max(1)
    }
}

pub struct FakeBrowser {
    site: FakeSite,
}

#[async_trait(?Send)]
impl Browser for FakeBrowser {
    type Session = FakeSession;

    async fn launch(&mut self, identity: &ProxyIdentity) -> Result<FakeSession, OpFailure> {
        self.site.state.borrow_mut().launched.push(identity.clone());
        Ok(FakeSession {
            site: self.site.clone(),
            page: Page::Blank,
            categories_shown: false,
            selection_active: false,
            signal: None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Page {
    Blank,
    SearchForm,
    SearchResult(String),
    Entity,
    Census,
    Listing { category_id: String, page: u64 },
}

pub struct FakeSession {
    site: FakeSite,
    page: Page,
    categories_shown: bool,
    selection_active: bool,
    signal: Option<Fault>,
}

impl FakeSession {
    /// Turns a fault into an error, or keeps it as a page signal
    fn apply(&mut self, fault: Option<Fault>) -> Result<(), OpFailure> {
        match fault {
            Some(Fault::Network) => Err(OpFailure::Network("connection reset".to_string())),
            Some(Fault::Timeout) => Err(OpFailure::Timeout("page load".to_string())),
            Some(Fault::Unrecoverable) => {
                Err(OpFailure::Unrecoverable("scripted".to_string()))
            }
            Some(Fault::DropSelection) => {
                self.selection_active = false;
                Ok(())
            }
            signal => {
                self.signal = signal;
                Ok(())
            }
        }
    }

    fn render_listing(&mut self, category_id: String, page: u64) -> Result<(), OpFailure> {
        let fault = self.site.take_page_fault(&category_id, page);
        if matches!(
            fault,
            Some(Fault::Network | Fault::Timeout | Fault::Unrecoverable)
        ) {
            return self.apply(fault);
        }

        self.site
            .state
            .borrow_mut()
            .rendered
            .push((category_id.clone(), page));
        self.page = Page::Listing { category_id, page };
        self.signal = None;
        self.apply(fault)
    }

    fn has_next(&self) -> bool {
        match &self.page {
            Page::Listing { category_id, page } => {
                let count = self.site.count(category_id).unwrap_or(0);
                page * self.site.page_size() < count
            }
            _ => false,
        }
    }
}

#[async_trait(?Send)]
impl Session for FakeSession {
    async fn navigate(&mut self, url: &Url) -> Result<(), OpFailure> {
        self.site
            .state
            .borrow_mut()
            .navigations
            .push(url.to_string());

        let fault = self.site.pop_navigation_fault();
        if matches!(
            fault,
            Some(Fault::Network | Fault::Timeout | Fault::Unrecoverable)
        ) {
            return self.apply(fault);
        }

        self.page = match url.path() {
            "/titles.asp" => match url.query_pairs().find(|(key, _)| key == "titlename") {
                Some((_, code)) => Page::SearchResult(code.into_owned()),
                None => Page::SearchForm,
            },
            "/title_items.asp" => Page::Entity,
            "/title_items_rubrics.asp" => Page::Census,
            other => return Err(OpFailure::Unexpected(format!("no page at {}", other))),
        };
        self.categories_shown = false;
        self.selection_active = false;
        self.signal = None;
        self.apply(fault)
    }

    async fn wait_for(
        &mut self,
        condition: &Condition,
        _timeout: Duration,
    ) -> Result<(), OpFailure> {
        match condition {
            Condition::Loaded if self.page != Page::Blank => Ok(()),
            Condition::Loaded => Err(OpFailure::Timeout("page load".to_string())),
            Condition::Present(target) => {
                if self.locate(target).await? {
                    Ok(())
                } else {
                    Err(OpFailure::Timeout(target.to_string()))
                }
            }
        }
    }

    async fn locate(&mut self, target: &Target) -> Result<bool, OpFailure> {
        let found = match target {
            Target::BlockedNotice => self.signal == Some(Fault::Blocked),
            Target::ChallengeFrame => self.signal == Some(Fault::Challenge),
            Target::ServerErrorBanner => self.signal == Some(Fault::ServerError),
            Target::NothingFound => match &self.page {
                Page::SearchResult(code) => !self.site.state.borrow().titles.contains_key(code),
                _ => false,
            },
            Target::ResultTable => match &self.page {
                Page::Listing { .. } => true,
                Page::SearchResult(code) => self.site.state.borrow().titles.contains_key(code),
                _ => false,
            },
            Target::CategoryTable => self.page == Page::Census || self.categories_shown,
            Target::CategoryRow(id) => self.categories_shown && self.site.count(id).is_some(),
            Target::ActiveSelection => {
                matches!(self.page, Page::Listing { .. }) && self.selection_active
            }
            Target::NextPage => self.has_next(),
        };
        Ok(found)
    }

    async fn activate(&mut self, control: &Control) -> Result<(), OpFailure> {
        match (control, self.page.clone()) {
            (Control::ShowCategories, Page::Entity | Page::Listing { .. }) => {
                self.categories_shown = true;
                Ok(())
            }
            (Control::ChooseCategory(id), _) if self.categories_shown => {
                if self.site.count(id).is_none() {
                    return Err(OpFailure::Unexpected(format!("no category {}", id)));
                }
                self.selection_active = true;
                self.render_listing(id.clone(), 1)
            }
            (Control::GotoPage(page), Page::Listing { category_id, .. }) => {
                self.render_listing(category_id, *page)
            }
            (Control::NextPage, Page::Listing { category_id, page }) if self.has_next() => {
                self.render_listing(category_id, page + 1)
            }
            (Control::SearchTitle(code), Page::SearchForm) => {
                self.page = Page::SearchResult(code.clone());
                Ok(())
            }
            (control, page) => Err(OpFailure::Unexpected(format!(
                "cannot {:?} on {:?}",
                control, page
            ))),
        }
    }

    async fn extract(&mut self, request: Extract) -> Result<Extracted, OpFailure> {
        match (request, &self.page) {
            (Extract::Publications, Page::Listing { category_id, page }) => {
                let count = self.site.count(category_id).unwrap_or(0);
                let size = self.site.page_size();
                let first = (page - 1) * size + 1;
                let last = (page * size).min(count);
                Ok(Extracted::Publications(
                    (first..=last)
                        .map(|position| FakeSite::record(category_id, position))
                        .collect(),
                ))
            }
            (Extract::Categories, Page::Census) => Ok(Extracted::Categories(
                self.site
                    .state
                    .borrow()
                    .categories
                    .iter()
                    .map(|(id, amount)| CategoryCount {
                        category_id: id.clone(),
                        amount: *amount,
                    })
                    .collect(),
            )),
            (Extract::TitleLinks, Page::SearchResult(code)) => Ok(Extracted::TitleLinks(
                self.site
                    .state
                    .borrow()
                    .titles
                    .get(code)
                    .cloned()
                    .into_iter()
                    .collect(),
            )),
            (request, page) => Err(OpFailure::Unexpected(format!(
                "cannot extract {:?} from {:?}",
                request, page
            ))),
        }
    }

    async fn close(&mut self) {
        self.site.state.borrow_mut().closed += 1;
        self.page = Page::Blank;
    }
}
