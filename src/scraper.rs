// src/scraper.rs
use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use tracing::{info, warn};

use crate::store::RawPost;

#[derive(Debug, Clone)]
pub struct ScrapedProfile {
    pub profile_url: String,
    pub username: String,
    pub name: String,
    pub headline: Option<String>,
    pub location: Option<String>,
    pub posts: Vec<RawPost>,
}

pub struct ProfileScraper {
    client: Client,
}

impl ProfileScraper {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent("Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36")
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }

    pub async fn scrape_profile(&self, url: &str) -> Result<ScrapedProfile> {
        info!("Fetching profile page: {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to fetch profile page")?;

        if !response.status().is_success() {
            anyhow::bail!("HTTP error: {}", response.status());
        }

        let html = response
            .text()
            .await
            .context("Failed to read response body")?;
        let document = Html::parse_document(&html);

        let username = username_from_url(url);
        let name = self
            .find_text_by_selectors(&document, &NAME_SELECTORS)
            .unwrap_or_else(|| username.replace('-', " "));
        let headline = self.find_text_by_selectors(&document, &HEADLINE_SELECTORS);
        let location = self.find_text_by_selectors(&document, &LOCATION_SELECTORS);

        let posts = self.parse_posts(&document);
        if posts.is_empty() {
            warn!("No posts extracted from {}", url);
        } else {
            info!("Extracted {} posts from {}", posts.len(), url);
        }

        Ok(ScrapedProfile {
            profile_url: url.to_string(),
            username,
            name,
            headline,
            location,
            posts,
        })
    }

    /// Extract raw post records from an activity page. Records come back in
    /// the scraped shape with everything optional; validation happens at the
    /// store boundary, not here.
    pub fn parse_posts(&self, document: &Html) -> Vec<RawPost> {
        let mut posts = Vec::new();

        for selector_str in POST_CONTAINER_SELECTORS {
            let selector = match Selector::parse(selector_str) {
                Ok(s) => s,
                Err(_) => continue,
            };

            for element in document.select(&selector) {
                if let Some(post) = self.parse_post_element(&element) {
                    posts.push(post);
                }
            }

            if !posts.is_empty() {
                break;
            }
        }

        posts
    }

    fn parse_post_element(&self, element: &ElementRef) -> Option<RawPost> {
        let text = self.find_text_in(element, &POST_TEXT_SELECTORS)?;

        let likes = self
            .find_text_in(element, &LIKE_COUNT_SELECTORS)
            .and_then(|s| parse_metric(&s));
        let comments = self
            .find_text_in(element, &COMMENT_COUNT_SELECTORS)
            .and_then(|s| parse_metric(&s));
        let shares = self
            .find_text_in(element, &SHARE_COUNT_SELECTORS)
            .and_then(|s| parse_metric(&s));

        let timestamp = self
            .find_text_in(element, &POST_AGE_SELECTORS)
            .and_then(|s| parse_relative_age(&s))
            .map(|ts| ts.format("%Y-%m-%dT%H:%M:%S").to_string());

        Some(RawPost {
            text: Some(text),
            content_type: Some(infer_content_type(element)),
            topic: None,
            timestamp,
            likes,
            comments,
            shares,
        })
    }

    fn find_text_by_selectors(&self, document: &Html, selectors: &[&str]) -> Option<String> {
        for selector_str in selectors {
            if let Ok(selector) = Selector::parse(selector_str) {
                if let Some(element) = document.select(&selector).next() {
                    let text = clean_text(&element.text().collect::<Vec<_>>().join(" "));
                    if !text.is_empty() {
                        return Some(text);
                    }
                }
            }
        }
        None
    }

    fn find_text_in(&self, element: &ElementRef, selectors: &[&str]) -> Option<String> {
        for selector_str in selectors {
            if let Ok(selector) = Selector::parse(selector_str) {
                if let Some(found) = element.select(&selector).next() {
                    let text = clean_text(&found.text().collect::<Vec<_>>().join(" "));
                    if !text.is_empty() {
                        return Some(text);
                    }
                }
            }
        }
        None
    }
}

const NAME_SELECTORS: [&str; 3] = [
    "h1.top-card-layout__title",
    ".pv-text-details__left-panel h1",
    "h1",
];

const HEADLINE_SELECTORS: [&str; 2] = [
    ".top-card-layout__headline",
    ".pv-text-details__left-panel .text-body-medium",
];

const LOCATION_SELECTORS: [&str; 2] = [
    ".top-card__subline-item",
    ".pv-text-details__left-panel .text-body-small",
];

const POST_CONTAINER_SELECTORS: [&str; 3] = [
    ".feed-shared-update-v2",
    "[data-urn*='activity']",
    "article",
];

const POST_TEXT_SELECTORS: [&str; 4] = [
    ".feed-shared-update-v2__description",
    ".update-components-text",
    "[class*='commentary']",
    "p",
];

const LIKE_COUNT_SELECTORS: [&str; 3] = [
    ".social-details-social-counts__reactions-count",
    "[class*='reactions-count']",
    "[aria-label*='reaction']",
];

const COMMENT_COUNT_SELECTORS: [&str; 2] = [
    "[class*='comments-count']",
    "[aria-label*='comment']",
];

const SHARE_COUNT_SELECTORS: [&str; 2] = ["[class*='reposts-count']", "[aria-label*='repost']"];

const POST_AGE_SELECTORS: [&str; 3] = [
    ".update-components-actor__sub-description",
    "[class*='sub-description']",
    "time",
];

/// Derive the profile slug from a URL like
/// `https://www.linkedin.com/in/some-person/`.
pub fn username_from_url(url: &str) -> String {
    url.split("/in/")
        .nth(1)
        .map(|rest| rest.trim_matches('/'))
        .and_then(|slug| slug.split(['/', '?']).next())
        .filter(|slug| !slug.is_empty())
        .unwrap_or("unknown")
        .to_string()
}

/// Parse counter labels like "12 likes", "1,234", "3K reactions". Returns
/// None when no leading number is found; the raw label then fails validation
/// at ingestion instead of being silently zeroed.
pub fn parse_metric(text: &str) -> Option<i64> {
    let token = text.split_whitespace().next()?;
    let cleaned: String = token.chars().filter(|c| *c != ',').collect();

    if let Some(body) = cleaned.strip_suffix(['K', 'k']) {
        return body.parse::<f64>().ok().map(|n| (n * 1_000.0) as i64);
    }
    if let Some(body) = cleaned.strip_suffix(['M', 'm']) {
        return body.parse::<f64>().ok().map(|n| (n * 1_000_000.0) as i64);
    }
    cleaned.parse::<i64>().ok()
}

/// Resolve relative ages like "3d ago" or "5h" against the current time.
pub fn parse_relative_age(text: &str) -> Option<chrono::NaiveDateTime> {
    let token = text.split_whitespace().next()?;
    let unit = token.chars().last()?;
    let digits = &token[..token.len() - unit.len_utf8()];
    let amount: i64 = digits.parse().ok()?;

    let delta = match unit {
        'h' => Duration::hours(amount),
        'd' => Duration::days(amount),
        'w' => Duration::weeks(amount),
        _ => return None,
    };
    Some(Utc::now().naive_utc() - delta)
}

fn infer_content_type(element: &ElementRef) -> String {
    for (selector_str, content_type) in [
        ("video", "video"),
        ("[class*='video']", "video"),
        ("img[class*='update']", "image"),
        ("[class*='image']", "image"),
        ("[class*='article']", "article"),
        ("[class*='document']", "document"),
        ("[class*='poll']", "poll"),
    ] {
        if let Ok(selector) = Selector::parse(selector_str) {
            if element.select(&selector).next().is_some() {
                return content_type.to_string();
            }
        }
    }
    "text".to_string()
}

fn clean_text(text: &str) -> String {
    text.lines()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
