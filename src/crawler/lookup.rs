//! Pre-crawl stages: identifier import, link resolution, category census
//!
//! These stages fill the durable state the crawl loop consumes:
//! - names and their identifiers, imported from a JSON map
//! - the catalog link of every identifier (empty when nothing matches)
//! - the category counts of every resolved entity

use crate::catalog::{self, Extract};
use crate::crawler::classifier::guard_page;
use crate::crawler::driver::Driver;
use crate::crawler::retry::Attempt;
use crate::session::{Browser, Condition, Control, Session, SessionManager, Target};
use crate::state::CategoryProgress;
use crate::storage::Storage;
use crate::HarvestError;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Counters of the link resolution stage
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveReport {
    pub names: u32,
    pub already_resolved: u32,
    pub resolved: u32,
    pub not_found: u32,
}

/// Counters of the category census stage
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CensusReport {
    pub prepared: u32,
    pub skipped: u32,
    pub aborted: u32,
    pub categories_kept: u32,
}

/// Imports a JSON map of entity names to identifier lists
///
/// ```json
/// { "Physics of the Earth": ["0002-3337", "1069-3513"] }
/// ```
///
/// Returns the number of names imported.
pub fn import_codes<S: Storage>(storage: &mut S, path: &Path) -> Result<usize, HarvestError> {
    let content = std::fs::read_to_string(path)?;
    let names: BTreeMap<String, Vec<String>> = serde_json::from_str(&content)?;

    for (name, codes) in &names {
        let codes: Vec<String> = codes
            .iter()
            .map(|code| code.trim().to_string())
            .filter(|code| !code.is_empty())
            .collect();
        storage.add_entity_names(name.trim(), &codes)?;
    }

    tracing::info!("Imported {} names from {}", names.len(), path.display());
    Ok(names.len())
}

impl<B: Browser, S: Storage> Driver<B, S> {
    /// Looks up the catalog link of every identifier not yet resolved
    ///
    /// Identifiers of a name are tried in order; the first one with a match
    /// ends the name. A name is skipped entirely when any of its identifiers
    /// already has a link. "Not found" is stored as an empty link.
    pub async fn resolve_links(&mut self) -> Result<ResolveReport, HarvestError> {
        let names = self.storage().list_entity_names()?;
        let mut report = ResolveReport::default();
        self.sessions.restart().await;

        for (name, codes) in names {
            report.names += 1;

            let mut resolved = false;
            for code in &codes {
                if self.storage().get_link(code)?.is_some_and(|l| !l.is_empty()) {
                    resolved = true;
                    break;
                }
            }
            if resolved {
                report.already_resolved += 1;
                continue;
            }

            for code in &codes {
                if self.storage().get_link(code)?.is_some() {
                    tracing::debug!("{} already looked up without a match", code);
                    continue;
                }

                let mut lookup = TitleLookup {
                    base_url: &self.base_url,
                    code,
                    wait_timeout: self.sessions.wait_timeout(),
                };
                self.throttle.pause().await;
                let link = self.retry.execute(&mut self.sessions, &mut lookup).await?;
                self.storage_mut().set_link(code, &link)?;

                if link.is_empty() {
                    tracing::info!("{} ({}): not found", name, code);
                    report.not_found += 1;
                } else {
                    tracing::info!("{} ({}): {}", name, code, link);
                    report.resolved += 1;
                    break;
                }
            }
        }

        self.sessions.close().await;
        Ok(report)
    }

    /// Counts the categories of every resolved entity not yet censused
    ///
    /// Only the configured interest categories are kept (all of them when
    /// the list is empty). Stored `parsed` values are re-derived from any
    /// records already present.
    pub async fn prepare_categories(&mut self) -> Result<CensusReport, HarvestError> {
        let entities = self.storage().list_entities()?;
        let interest = self.config.interest.categories.clone();
        let mut report = CensusReport::default();
        self.sessions.restart().await;

        for entity in entities {
            let link = match entity.link.as_deref() {
                Some(link) if !link.is_empty() && !entity.prepared => link.to_string(),
                _ => {
                    report.skipped += 1;
                    continue;
                }
            };

            let Some(url) = catalog::categories_url(&self.base_url, &link) else {
                tracing::warn!("No entity id in link {:?} of {}, skip", link, entity.code);
                report.skipped += 1;
                continue;
            };

            let mut census = CategoryCensus {
                url: &url,
                wait_timeout: self.sessions.wait_timeout(),
            };
            self.throttle.pause().await;
            let counts = match self.retry.execute(&mut self.sessions, &mut census).await {
                Ok(counts) => counts,
                Err(e) if e.is_entity_scoped() => {
                    tracing::error!("Census of {} aborted: {}", entity.code, e);
                    report.aborted += 1;
                    continue;
                }
                Err(e) => return Err(e),
            };

            let total = counts.len();
            let kept: Vec<CategoryProgress> = counts
                .into_iter()
                .filter(|c| interest.is_empty() || interest.contains(&c.category_id))
                .map(|c| CategoryProgress::new(c.category_id, c.amount))
                .collect();

            tracing::info!(
                "{}: {} categories, {} of interest",
                entity.code,
                total,
                kept.len()
            );
            report.categories_kept += kept.len() as u32;
            self.storage_mut().replace_categories(&entity.code, &kept)?;
            self.checkpoints.recompute(&entity.code)?;
            report.prepared += 1;
        }

        self.sessions.close().await;
        Ok(report)
    }
}

/// One title search for an identifier
struct TitleLookup<'a> {
    base_url: &'a Url,
    code: &'a str,
    wait_timeout: Duration,
}

#[async_trait(?Send)]
impl<'a, B: Browser> Attempt<B> for TitleLookup<'a> {
    type Output = String;

    fn describe(&self) -> String {
        format!("title search for {}", self.code)
    }

    async fn run(&mut self, sessions: &mut SessionManager<B>) -> Result<String, HarvestError> {
        let search_url = catalog::title_search_url(self.base_url)?;
        let session = sessions.open(&search_url).await?;

        session
            .activate(&Control::SearchTitle(self.code.to_string()))
            .await?;
        session.wait_for(&Condition::Loaded, self.wait_timeout).await?;

        if session.locate(&Target::NothingFound).await? {
            return Ok(String::new());
        }
        guard_page(&mut *session).await?;

        session
            .wait_for(&Condition::Present(Target::ResultTable), self.wait_timeout)
            .await?;
        let links = session
            .extract(Extract::TitleLinks)
            .await?
            .into_title_links()?;

        Ok(links.into_iter().next().unwrap_or_default())
    }
}

/// One read of an entity's categories page
struct CategoryCensus<'a> {
    url: &'a Url,
    wait_timeout: Duration,
}

#[async_trait(?Send)]
impl<'a, B: Browser> Attempt<B> for CategoryCensus<'a> {
    type Output = Vec<catalog::CategoryCount>;

    fn describe(&self) -> String {
        format!("category census at {}", self.url)
    }

    async fn run(
        &mut self,
        sessions: &mut SessionManager<B>,
    ) -> Result<Vec<catalog::CategoryCount>, HarvestError> {
        let session = sessions.open(self.url).await?;
        session
            .wait_for(&Condition::Present(Target::CategoryTable), self.wait_timeout)
            .await?;

        // An empty table is a valid answer: the entity has no categories
        Ok(session
            .extract(Extract::Categories)
            .await?
            .into_categories()?)
    }
}
