//! A wiremock responder that renders a small catalog
//!
//! Pages follow the catalog's own URL scheme:
//! - `/titles.asp[?titlename=CODE]` - title search form and results
//! - `/title_items.asp?id=ID` - entity page with the categories panel
//! - `/title_items.asp?id=ID&rubrics=CAT&pagenum=N` - one listing page
//! - `/title_items_rubrics.asp?id=ID` - category census page

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

pub const ENTITY_ID: &str = "7";
pub const ENTITY_LINK: &str = "title_items.asp?id=7";

#[derive(Default)]
struct SiteState {
    page_size: u64,
    categories: Vec<(String, u64)>,
    titles: HashMap<String, String>,
    listing_failures: VecDeque<u16>,
    blocked: bool,
    requests: Vec<String>,
}

/// Shared handle to the rendered catalog
#[derive(Clone)]
pub struct CatalogSite {
    state: Arc<Mutex<SiteState>>,
}

impl CatalogSite {
    pub fn new(page_size: u64) -> Self {
        Self {
            state: Arc::new(Mutex::new(SiteState {
                page_size,
                ..SiteState::default()
            })),
        }
    }

    /// Starts a mock server answering every GET through this site
    pub async fn serve(&self) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(self.clone())
            .mount(&server)
            .await;
        server
    }

    pub fn add_category(&self, id: &str, amount: u64) {
        self.state
            .lock()
            .unwrap()
            .categories
            .push((id.to_string(), amount));
    }

    pub fn add_title(&self, code: &str, link: &str) {
        self.state
            .lock()
            .unwrap()
            .titles
            .insert(code.to_string(), link.to_string());
    }

    /// The next listing request answers with this status
    pub fn fail_next_listing(&self, status: u16) {
        self.state.lock().unwrap().listing_failures.push_back(status);
    }

    /// Every request answers 403 from now on
    pub fn block_everything(&self) {
        self.state.lock().unwrap().blocked = true;
    }

    /// Path and query of every request seen so far
    pub fn requests(&self) -> Vec<String> {
        self.state.lock().unwrap().requests.clone()
    }

    /// Number of listing requests for the given page
    pub fn listing_hits(&self, page: u64) -> usize {
        let needle = format!("pagenum={}", page);
        self.requests()
            .iter()
            .filter(|r| r.contains("rubrics=") && r.split(&['?', '&'][..]).any(|p| p == needle))
            .count()
    }
}

impl Respond for CatalogSite {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let mut state = self.state.lock().unwrap();

        let query: HashMap<String, String> = request
            .url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        state.requests.push(match request.url.query() {
            Some(q) => format!("{}?{}", request.url.path(), q),
            None => request.url.path().to_string(),
        });

        if state.blocked {
            return ResponseTemplate::new(403).set_body_string(page(r#"<div id="blockedip">blocked</div>"#));
        }

        match request.url.path() {
            "/titles.asp" => match query.get("titlename") {
                None => html(page("<form><input name=\"titlename\"></form>")),
                Some(code) => match state.titles.get(code) {
                    Some(link) => html(page(&format!(
                        r#"<table id="restab"><tr><td><a href="{}" title="Journal">Journal</a></td></tr></table>"#,
                        link
                    ))),
                    None => html(page(
                        r#"<table><tr><td class="redref">Не найдено журналов</td></tr></table>"#,
                    )),
                },
            },
            "/title_items_rubrics.asp" => html(page(&categories_table(&state.categories))),
            "/title_items.asp" if query.get("id").map(String::as_str) == Some(ENTITY_ID) => {
                match (query.get("rubrics"), query.get("pagenum")) {
                    (Some(category), Some(pagenum)) => {
                        if let Some(status) = state.listing_failures.pop_front() {
                            return ResponseTemplate::new(status)
                                .set_body_string(page("<h1>Server Error</h1>"));
                        }
                        let pagenum: u64 = pagenum.parse().unwrap_or(1);
                        html(listing(&state, category, pagenum))
                    }
                    _ => html(page(&categories_table(&state.categories))),
                }
            }
            _ => ResponseTemplate::new(404),
        }
    }
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_string(body)
}

fn page(content: &str) -> String {
    format!("<html><head><title>catalog</title></head><body>{}</body></html>", content)
}

fn categories_table(categories: &[(String, u64)]) -> String {
    let rows: String = categories
        .iter()
        .map(|(id, amount)| {
            format!(
                r#"<tr id="rubric_{}"><td><input type="checkbox"></td><td>Рубрика {} ({})</td></tr>"#,
                id, id, amount
            )
        })
        .collect();
    format!(r#"<table id="rubrics_table">{}</table>"#, rows)
}

fn listing(state: &SiteState, category: &str, pagenum: u64) -> String {
    let amount = state
        .categories
        .iter()
        .find(|(id, _)| id == category)
        .map(|(_, amount)| *amount)
        .unwrap_or(0);

    let first = (pagenum - 1) * state.page_size + 1;
    let last = (pagenum * state.page_size).min(amount);
    let rows: String = (first..=last)
        .map(|pos| {
            format!(
                r#"<tr id="arw{}"><td>{}.</td><td><a href="/item.asp?id={}-{}"><b><span>Publication {} of {}</span></b></a></td></tr>"#,
                pos, pos, category, pos, pos, category
            )
        })
        .collect();

    let next = if pagenum * state.page_size < amount {
        format!(
            r#"<table><tr><td class="mouse-hovergr"><a href="title_items.asp?id={}&amp;rubrics={}&amp;pagenum={}" title="Следующая страница">&gt;</a></td></tr></table>"#,
            ENTITY_ID,
            category,
            pagenum + 1
        )
    } else {
        String::new()
    };

    page(&format!(
        r#"<div id="rubricsheader">Рубрики (выделено: 1)</div><table id="restab">{}</table>{}"#,
        rows, next
    ))
}
