use super::greenhouse::DETAIL_TEMPLATE;
use super::{endpoints_for, first_available, Endpoint, SourceAdapter, SourceError, MAX_PAGES};
use crate::config::OrganizationConfig;
use crate::harvest::http::{with_query, FetchError, PageRenderer, Throttle};
use crate::harvest::listing::RawListing;
use crate::harvest::normalizer::clean_text;
use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

const ENDPOINTS: &[(&str, bool)] = &[
    ("https://job-boards.greenhouse.io/embed/job_board?for={org}", true),
    ("https://boards.greenhouse.io/embed/job_board?for={org}", true),
];

/// Listings found on one rendered board page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoardPage {
    pub listings: Vec<RawListing>,
    /// The page offers a button to the following page.
    pub has_next: bool,
}

/// Reads `tr.job-post` rows from a rendered Greenhouse board. `page` is the
/// 1-based number of the page being parsed.
pub fn parse_board_page(html: &str, page_url: &str, page: usize) -> BoardPage {
    let document = Html::parse_document(html);
    let base = Url::parse(page_url).ok();

    let (Ok(row_selector), Ok(link_selector), Ok(text_selector), Ok(button_selector)) = (
        Selector::parse("tr.job-post"),
        Selector::parse("td a[href]"),
        Selector::parse("p"),
        Selector::parse("button.pagination__link"),
    ) else {
        return BoardPage::default();
    };

    let listings = document
        .select(&row_selector)
        .filter_map(|row| parse_row(row, &link_selector, &text_selector, base.as_ref()))
        .collect();

    let next_label = format!("Go to page {}", page + 1);
    let has_next = document
        .select(&button_selector)
        .any(|button| button.value().attr("aria-label") == Some(next_label.as_str()));

    BoardPage { listings, has_next }
}

fn parse_row(
    row: ElementRef<'_>,
    link_selector: &Selector,
    text_selector: &Selector,
    base: Option<&Url>,
) -> Option<RawListing> {
    let link = row.select(link_selector).next()?;
    let href = link.value().attr("href")?.trim();
    let url = match base {
        Some(base) => base.join(href).ok()?.to_string(),
        None => href.to_string(),
    };

    let paragraphs: Vec<String> = row
        .select(text_selector)
        .map(|paragraph| clean_text(&paragraph.text().collect::<String>()))
        .collect();

    let title = match paragraphs.first() {
        Some(title) if !title.is_empty() => title.clone(),
        _ => clean_text(&link.text().collect::<String>()),
    };
    if title.is_empty() {
        return None;
    }

    Some(RawListing {
        title,
        locations: paragraphs.get(1).cloned().into_iter().collect(),
        url,
        ..RawListing::default()
    })
}

/// Greenhouse's embeddable job board, rendered page by page. The board is
/// pre-filtered server-side with the organization's keywords and offices.
pub struct GreenhouseBoardAdapter {
    renderer: Arc<dyn PageRenderer>,
    throttle: Arc<Throttle>,
}

impl GreenhouseBoardAdapter {
    pub fn new(renderer: Arc<dyn PageRenderer>, throttle: Arc<Throttle>) -> Self {
        Self { renderer, throttle }
    }

    fn page_url(
        &self,
        org: &OrganizationConfig,
        endpoint: &Endpoint,
        page: usize,
    ) -> Result<String, FetchError> {
        let mut pairs: Vec<(&str, String)> = Vec::new();
        let keywords = org.board_query.keywords.join(" ");
        if !keywords.trim().is_empty() {
            pairs.push(("keyword", keywords));
        }
        for office in &org.board_query.office_ids {
            pairs.push(("offices[]", office.clone()));
        }
        if endpoint.paged {
            pairs.push(("page", page.to_string()));
        }
        with_query(&endpoint.url, &pairs)
    }

    async fn fetch_endpoint(
        &self,
        org: &OrganizationConfig,
        endpoint: Endpoint,
    ) -> Result<Vec<RawListing>, FetchError> {
        let mut listings = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        for page in 1..=MAX_PAGES {
            let url = self.page_url(org, &endpoint, page)?;

            self.throttle.wait().await;
            let html = match self.renderer.render(&url).await {
                Ok(html) => html,
                Err(error) if page == 1 => return Err(error),
                Err(error) => {
                    warn!(organization = %org.name, %url, %error, "stopping board pagination");
                    break;
                }
            };

            let parsed = parse_board_page(&html, &url, page);
            let mut fresh = 0;
            for listing in parsed.listings {
                if seen.insert(listing.url.clone()) {
                    fresh += 1;
                    listings.push(listing);
                }
            }
            debug!(organization = %org.name, page, fresh, "board page parsed");

            if fresh == 0 || !parsed.has_next || !endpoint.paged {
                break;
            }
        }

        Ok(listings)
    }
}

#[async_trait]
impl SourceAdapter for GreenhouseBoardAdapter {
    async fn fetch_raw_listings(
        &self,
        org: &OrganizationConfig,
    ) -> Result<Vec<RawListing>, SourceError> {
        let endpoints = endpoints_for(org, ENDPOINTS);
        first_available(org, endpoints, |endpoint| self.fetch_endpoint(org, endpoint)).await
    }

    fn detail_url(&self, org: &OrganizationConfig, token: &str) -> Option<String> {
        Some(org.expand(DETAIL_TEMPLATE).replace("{token}", token))
    }
}
