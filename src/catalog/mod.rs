//! Catalog extraction collaborator
//!
//! Knows the catalog's markup and URL scheme. Given a loaded page and a
//! request kind it returns typed results; the crawl core never parses markup
//! itself.

mod markup;
mod urls;

pub use markup::{
    extract_categories, extract_publications, extract_title_links, is_present, next_page_href,
};
pub use urls::{
    categories_url, category_url, entity_url, link_id, page_url, set_query_param,
    title_search_url, title_url,
};

use crate::storage::Record;
use crate::OpFailure;

/// What to extract from the current page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extract {
    /// {category id, amount} pairs from a categories table
    Categories,

    /// Publication rows from a result listing
    Publications,

    /// Entity links from a title search result
    TitleLinks,
}

/// A category and the number of items the catalog reports for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryCount {
    pub category_id: String,
    pub amount: u64,
}

/// Typed result of an extraction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extracted {
    Categories(Vec<CategoryCount>),
    Publications(Vec<Record>),
    TitleLinks(Vec<String>),
}

impl Extracted {
    pub fn into_categories(self) -> Result<Vec<CategoryCount>, OpFailure> {
        match self {
            Self::Categories(categories) => Ok(categories),
            other => Err(other.mismatch("categories")),
        }
    }

    pub fn into_publications(self) -> Result<Vec<Record>, OpFailure> {
        match self {
            Self::Publications(records) => Ok(records),
            other => Err(other.mismatch("publications")),
        }
    }

    pub fn into_title_links(self) -> Result<Vec<String>, OpFailure> {
        match self {
            Self::TitleLinks(links) => Ok(links),
            other => Err(other.mismatch("title links")),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Categories(_) => "categories",
            Self::Publications(_) => "publications",
            Self::TitleLinks(_) => "title links",
        }
    }

    fn mismatch(&self, wanted: &str) -> OpFailure {
        OpFailure::Unexpected(format!("asked for {}, got {}", wanted, self.kind()))
    }
}
