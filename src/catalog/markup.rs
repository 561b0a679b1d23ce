//! Catalog markup: selectors and scraper-based extraction
//!
//! This module handles parsing catalog pages to find:
//! - Page signals (blocked notice, challenge frame, server error)
//! - Navigation controls (result table, categories table, next page)
//! - Typed rows (categories with counts, publications, title links)

use crate::catalog::CategoryCount;
use crate::session::Target;
use crate::storage::Record;
use scraper::{ElementRef, Html, Selector};

const BLOCKED_NOTICE: &str = "div#blockedip";
const CHALLENGE_FRAME: &str = "iframe[title='reCAPTCHA']";
const SERVER_ERROR: &str = "h1";
const SERVER_ERROR_TEXT: &str = "Server Error";
const NOTHING_FOUND: &str = "td.redref";
const NOTHING_FOUND_TEXT: &str = "Не найдено журналов";
const RESULT_TABLE: &str = "table#restab";
const CATEGORY_TABLE: &str = "#rubrics_table";
const CATEGORY_ROWS: &str = "#rubrics_table tr[id^='rubric_']";
const CATEGORY_ROW_PREFIX: &str = "rubric_";
const CATEGORY_COUNT_CELL: &str = "td:nth-child(2)";
const SELECTION_HEADER: &str = "#rubricsheader";
const SELECTION_TEXT: &str = "(выделено: 1)";
const NEXT_PAGE: &str = "td.mouse-hovergr a[title='Следующая страница']";
const PUBLICATION_ROWS: &str = "table#restab tr[id^='arw']";
const PUBLICATION_LINK: &str = "a[href^='/item.asp?id=']";
const PUBLICATION_TITLE: &str = "b span";
const TITLE_LINKS: &str = "#restab tr a[href^='title_items.asp?id='][title]";

/// Returns true if the target is present in the page
///
/// Text-bearing targets (server error, nothing found, active selection)
/// match only when the element also contains the expected text.
pub fn is_present(html: &str, target: &Target) -> bool {
    let document = Html::parse_document(html);

    match target {
        Target::BlockedNotice => has_match(&document, BLOCKED_NOTICE, None),
        Target::ChallengeFrame => has_match(&document, CHALLENGE_FRAME, None),
        Target::ServerErrorBanner => {
            has_match(&document, SERVER_ERROR, Some(SERVER_ERROR_TEXT))
        }
        Target::NothingFound => has_match(&document, NOTHING_FOUND, Some(NOTHING_FOUND_TEXT)),
        Target::ResultTable => has_match(&document, RESULT_TABLE, None),
        Target::CategoryTable => has_match(&document, CATEGORY_TABLE, None),
        Target::CategoryRow(id) => {
            let css = format!("tr#{}{}", CATEGORY_ROW_PREFIX, id);
            has_match(&document, &css, None)
        }
        Target::ActiveSelection => has_match(&document, SELECTION_HEADER, Some(SELECTION_TEXT)),
        Target::NextPage => has_match(&document, NEXT_PAGE, None),
    }
}

/// Returns the href of the "next page" control, if any
pub fn next_page_href(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(NEXT_PAGE).ok()?;

    document
        .select(&selector)
        .find_map(|element| element.value().attr("href"))
        .map(|href| href.trim().to_string())
        .filter(|href| !href.is_empty())
}

/// Extracts {category id, amount} pairs from a categories table
///
/// The amount is the number in the last parentheses of the second cell,
/// e.g. `Физика (123)`. Rows without a parsable id or count are skipped.
pub fn extract_categories(html: &str) -> Vec<CategoryCount> {
    let document = Html::parse_document(html);
    let mut categories = Vec::new();

    let (Ok(row_selector), Ok(cell_selector)) = (
        Selector::parse(CATEGORY_ROWS),
        Selector::parse(CATEGORY_COUNT_CELL),
    ) else {
        return categories;
    };

    for row in document.select(&row_selector) {
        let Some(category_id) = row
            .value()
            .id()
            .and_then(|id| id.strip_prefix(CATEGORY_ROW_PREFIX))
            .filter(|id| !id.is_empty())
        else {
            continue;
        };

        let amount = row
            .select(&cell_selector)
            .next()
            .and_then(|cell| parse_count(&element_text(cell)));

        match amount {
            Some(amount) => categories.push(CategoryCount {
                category_id: category_id.to_string(),
                amount,
            }),
            None => tracing::debug!("No item count in category row {}", category_id),
        }
    }

    categories
}

/// Extracts the publication rows of a result listing in page order
///
/// Every row yields a record, even one missing its link or title, so row
/// positions stay aligned with the catalog's own numbering.
pub fn extract_publications(html: &str) -> Vec<Record> {
    let document = Html::parse_document(html);
    let mut records = Vec::new();

    let (Ok(row_selector), Ok(link_selector), Ok(title_selector)) = (
        Selector::parse(PUBLICATION_ROWS),
        Selector::parse(PUBLICATION_LINK),
        Selector::parse(PUBLICATION_TITLE),
    ) else {
        return records;
    };

    for row in document.select(&row_selector) {
        let link = row
            .select(&link_selector)
            .next()
            .and_then(|a| a.value().attr("href"))
            .unwrap_or("")
            .trim()
            .to_string();

        let remote_id = link
            .split_once('=')
            .map(|(_, id)| id.to_string())
            .unwrap_or_default();

        let title = row
            .select(&title_selector)
            .next()
            .map(|span| element_text(span).to_lowercase())
            .unwrap_or_default();

        if link.is_empty() {
            tracing::debug!("Publication row without link: {:?}", row.value().id());
        }

        records.push(Record {
            remote_id,
            title,
            link,
        });
    }

    records
}

/// Extracts entity links from a title search result
pub fn extract_title_links(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse(TITLE_LINKS) else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|a| a.value().attr("href"))
        .map(|href| href.trim().to_string())
        .filter(|href| !href.is_empty())
        .collect()
}

fn has_match(document: &Html, css: &str, text: Option<&str>) -> bool {
    let Ok(selector) = Selector::parse(css) else {
        return false;
    };

    let mut elements = document.select(&selector);
    match text {
        Some(needle) => elements.any(|element| element_text(element).contains(needle)),
        None => elements.next().is_some(),
    }
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Parses the number inside the last `(...)` of a cell text
fn parse_count(text: &str) -> Option<u64> {
    let open = text.rfind('(')?;
    let close = open + text[open..].find(')')?;
    text[open + 1..close].trim().parse().ok()
}
