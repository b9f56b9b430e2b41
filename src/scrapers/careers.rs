//! Selector-driven careers-page strategy.
//!
//! For companies without an ATS API we scrape their careers page
//! directly. The CSS selectors live in source config so a redesigned
//! page means a config change, not a code change. HTML scraping is the
//! fragile path; prefer an ATS strategy whenever one exists.

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::ScrapeError;
use crate::models::LocationType;

use super::{FetchStrategy, HttpClient, NormalizedPosting, SourceConfig};

/// Fetch strategy for static HTML careers pages.
///
/// Config:
/// - `url` (required): the listings page (injected from the source row)
/// - `card_selector` (required): CSS selector for one job card
/// - `title_selector` (optional, default "h3, h4, a"): title within a card
/// - `location_selector` (optional): location within a card
/// - `link_selector` (optional, default "a"): apply link within a card
/// - `id_attr` (optional, default "data-job-id"): card attribute holding
///   the external id; falls back to a slug of the title
pub struct CareersPageStrategy;

#[async_trait]
impl FetchStrategy for CareersPageStrategy {
    fn key(&self) -> &'static str {
        "careers_page"
    }

    fn source_url(&self, config: &SourceConfig) -> Result<String, ScrapeError> {
        Ok(config.require_str("url")?.to_string())
    }

    async fn fetch(
        &self,
        client: &HttpClient,
        config: &SourceConfig,
    ) -> Result<Vec<NormalizedPosting>, ScrapeError> {
        let url = self.source_url(config)?;
        let selectors = Selectors::from_config(config)?;

        let html = client.get_text(&url).await?;
        // Parsing happens fully before the next await: Html is not Send.
        Ok(parse_listings(&html, &url, &selectors))
    }
}

/// Compiled selector set for one careers page.
struct Selectors {
    card: Selector,
    title: Selector,
    location: Option<Selector>,
    link: Selector,
    id_attr: String,
}

impl Selectors {
    fn from_config(config: &SourceConfig) -> Result<Self, ScrapeError> {
        let parse = |css: &str| {
            Selector::parse(css)
                .map_err(|e| ScrapeError::InvalidConfig(format!("bad selector '{css}': {e}")))
        };

        Ok(Self {
            card: parse(config.require_str("card_selector")?)?,
            title: parse(config.get_str("title_selector").unwrap_or("h3, h4, a"))?,
            location: config
                .get_str("location_selector")
                .map(parse)
                .transpose()?,
            link: parse(config.get_str("link_selector").unwrap_or("a"))?,
            id_attr: config
                .get_str("id_attr")
                .unwrap_or("data-job-id")
                .to_string(),
        })
    }
}

fn parse_listings(html: &str, page_url: &str, selectors: &Selectors) -> Vec<NormalizedPosting> {
    let document = Html::parse_document(html);
    let mut postings = Vec::new();

    for card in document.select(&selectors.card) {
        match parse_card(&card, page_url, selectors) {
            Some(posting) => postings.push(posting),
            None => tracing::debug!("dropped careers-page card without title"),
        }
    }
    postings
}

fn parse_card(
    card: &ElementRef,
    page_url: &str,
    selectors: &Selectors,
) -> Option<NormalizedPosting> {
    let title = card
        .select(&selectors.title)
        .next()
        .map(|el| collect_text(&el))
        .filter(|t| !t.is_empty())?;

    // Prefer an explicit id attribute; a title slug is the fallback so
    // re-sightings of the same listing still dedup.
    let external_id = card
        .value()
        .attr(&selectors.id_attr)
        .or_else(|| card.value().attr("id"))
        .map(|s| s.to_string())
        .unwrap_or_else(|| slugify(&title));

    let location = selectors.location.as_ref().and_then(|sel| {
        card.select(sel)
            .next()
            .map(|el| collect_text(&el))
            .filter(|l| !l.is_empty())
    });
    let location_type = location.as_deref().map(infer_location_type);

    let apply_url = card
        .select(&selectors.link)
        .next()
        .and_then(|el| el.value().attr("href"))
        .map(|href| absolutize(page_url, href))
        .unwrap_or_else(|| page_url.to_string());

    Some(NormalizedPosting {
        location,
        location_type,
        ..NormalizedPosting::new(external_id, title, apply_url)
    })
}

/// Concatenated text content of an element, whitespace-normalized.
fn collect_text(el: &ElementRef) -> String {
    el.text().collect::<Vec<_>>().join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
}

fn infer_location_type(location: &str) -> LocationType {
    let loc = location.to_lowercase();
    if loc.contains("remote") {
        LocationType::Remote
    } else if loc.contains("hybrid") {
        LocationType::Hybrid
    } else {
        LocationType::Onsite
    }
}

/// Resolve a possibly-relative href against the page URL.
fn absolutize(page_url: &str, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        return href.to_string();
    }
    match Url::parse(page_url).and_then(|base| base.join(href)) {
        Ok(joined) => joined.to_string(),
        Err(_) => href.to_string(),
    }
}

/// Stable identifier derived from a title when the page exposes no id.
fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut last_dash = false;
    for c in title.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
            last_dash = false;
        } else if !last_dash && !slug.is_empty() {
            slug.push('-');
            last_dash = true;
        }
    }
    slug.trim_end_matches('-').to_string()
}
