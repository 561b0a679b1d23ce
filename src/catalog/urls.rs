//! Catalog URL scheme
//!
//! Entity links are stored as the catalog renders them
//! (`title_items.asp?id=7`) and resolved against the configured base URL.

use url::Url;

const TITLE_SEARCH_PAGE: &str = "titles.asp";
const CATEGORIES_PAGE: &str = "title_items_rubrics.asp";
const TITLE_QUERY_PARAM: &str = "titlename";
const CATEGORY_PARAM: &str = "rubrics";
const PAGE_PARAM: &str = "pagenum";

/// Resolves a stored entity link to the entity page URL
pub fn entity_url(base_url: &Url, link: &str) -> Result<Url, url::ParseError> {
    base_url.join(link.trim())
}

/// Builds the category census page of an entity
///
/// Returns `None` if the link carries no entity id.
pub fn categories_url(base_url: &Url, link: &str) -> Option<Url> {
    let id = link_id(base_url, link)?;
    let mut url = base_url.join(CATEGORIES_PAGE).ok()?;
    url.query_pairs_mut()
        .append_pair("id", &id)
        .append_pair("order", "0")
        .append_pair("selids", "")
        .append_pair("show_multi", "0")
        .append_pair("hide_doubles", "0");
    Some(url)
}

/// The title search form page
pub fn title_search_url(base_url: &Url) -> Result<Url, url::ParseError> {
    base_url.join(TITLE_SEARCH_PAGE)
}

/// The result page of a title search for the given identifier
pub fn title_url(base_url: &Url, code: &str) -> Result<Url, url::ParseError> {
    let mut url = title_search_url(base_url)?;
    url.query_pairs_mut().append_pair(TITLE_QUERY_PARAM, code);
    Ok(url)
}

/// The first listing page of one selected category of an entity page
pub fn category_url(entity_page: &Url, category_id: &str) -> Url {
    let url = set_query_param(entity_page, CATEGORY_PARAM, category_id);
    set_query_param(&url, PAGE_PARAM, "1")
}

/// A 1-based page of the current listing
pub fn page_url(listing: &Url, page: u64) -> Url {
    set_query_param(listing, PAGE_PARAM, &page.to_string())
}

/// Extracts the entity id from a stored link
pub fn link_id(base_url: &Url, link: &str) -> Option<String> {
    let url = base_url.join(link.trim()).ok()?;
    url.query_pairs()
        .find(|(key, _)| key == "id")
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
}

/// Returns a copy of the URL with one query parameter replaced or added
///
/// Other parameters keep their order.
pub fn set_query_param(url: &Url, key: &str, value: &str) -> Url {
    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != key)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    pairs.push((key.to_string(), value.to_string()));

    let mut result = url.clone();
    result.set_query(None);
    result.query_pairs_mut().extend_pairs(pairs.iter());
    result
}
