// src/store.rs
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Engagement weights. Comments and shares cost the audience more than a
/// like, so they weigh more. Applied everywhere a score is derived.
pub const LIKE_WEIGHT: u64 = 1;
pub const COMMENT_WEIGHT: u64 = 2;
pub const SHARE_WEIGHT: u64 = 3;

/// Timestamp formats accepted at ingestion, tried in order.
const TIMESTAMP_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("unparseable timestamp: {0}")]
    BadTimestamp(String),
    #[error("negative {field}: {value}")]
    NegativeMetric { field: &'static str, value: i64 },
    #[error("{field} out of range: {value}")]
    MetricOutOfRange { field: &'static str, value: i64 },
}

/// One scraped or generated unit of content.
///
/// `timestamp` is `Option` because rows loaded back from storage may carry
/// empty or garbled time text; such posts stay valid for every ranking
/// except the time-based one. Fresh ingestion through [`PostStore::add`]
/// always requires a parseable timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: u64,
    pub text: String,
    pub content_type: String,
    pub topic: Option<String>,
    pub timestamp: Option<NaiveDateTime>,
    pub likes: u32,
    pub comments: u32,
    pub shares: u32,
}

impl Post {
    /// Character count of `text`. Derived on demand so it can never go
    /// stale when the text changes.
    pub fn length(&self) -> usize {
        self.text.chars().count()
    }

    pub fn engagement_score(&self) -> u64 {
        u64::from(self.likes) * LIKE_WEIGHT
            + u64::from(self.comments) * COMMENT_WEIGHT
            + u64::from(self.shares) * SHARE_WEIGHT
    }
}

/// Raw scraped shape, all fields optional. The scraper and CSV import both
/// produce this; validation happens once, at [`PostStore::add`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPost {
    pub text: Option<String>,
    pub content_type: Option<String>,
    pub topic: Option<String>,
    pub timestamp: Option<String>,
    pub likes: Option<i64>,
    pub comments: Option<i64>,
    pub shares: Option<i64>,
}

/// Collection of validated posts for one profile or session.
///
/// Consumed read-only by the analyzer; callers holding a mutable store must
/// hand the analyzer a snapshot (a clone) if they keep writing.
#[derive(Debug, Clone, Default)]
pub struct PostStore {
    posts: Vec<Post>,
    next_id: u64,
}

impl PostStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from posts already validated elsewhere (typically rows
    /// loaded from the database, which carry their own ids).
    pub fn from_posts(posts: Vec<Post>) -> Self {
        let next_id = posts.iter().map(|p| p.id + 1).max().unwrap_or(0);
        Self { posts, next_id }
    }

    /// Validate and insert a raw record. Malformed input is rejected, never
    /// clamped; the caller decides whether to skip or abort the batch.
    pub fn add(&mut self, raw: RawPost) -> Result<&Post, ValidationError> {
        let text = match raw.text {
            Some(t) if !t.trim().is_empty() => t,
            _ => return Err(ValidationError::MissingField("text")),
        };

        let timestamp = match raw.timestamp.as_deref() {
            Some(s) if !s.trim().is_empty() => parse_timestamp(s.trim())
                .ok_or_else(|| ValidationError::BadTimestamp(s.to_string()))?,
            _ => return Err(ValidationError::MissingField("timestamp")),
        };

        let likes = check_metric("likes", raw.likes)?;
        let comments = check_metric("comments", raw.comments)?;
        let shares = check_metric("shares", raw.shares)?;

        let post = Post {
            id: self.next_id,
            text,
            content_type: raw.content_type.unwrap_or_else(|| "text".to_string()),
            topic: raw.topic.filter(|t| !t.trim().is_empty()),
            timestamp: Some(timestamp),
            likes,
            comments,
            shares,
        };

        self.next_id += 1;
        self.posts.push(post);
        Ok(&self.posts[self.posts.len() - 1])
    }

    pub fn all(&self) -> &[Post] {
        &self.posts
    }

    pub fn filter<P>(&self, predicate: P) -> Vec<&Post>
    where
        P: Fn(&Post) -> bool,
    {
        self.posts.iter().filter(|p| predicate(p)).collect()
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }
}

pub(crate) fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

fn check_metric(field: &'static str, value: Option<i64>) -> Result<u32, ValidationError> {
    let value = value.unwrap_or(0);
    if value < 0 {
        return Err(ValidationError::NegativeMetric { field, value });
    }
    u32::try_from(value).map_err(|_| ValidationError::MetricOutOfRange { field, value })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(text: &str, ts: &str, likes: i64, comments: i64, shares: i64) -> RawPost {
        RawPost {
            text: Some(text.to_string()),
            content_type: None,
            topic: None,
            timestamp: Some(ts.to_string()),
            likes: Some(likes),
            comments: Some(comments),
            shares: Some(shares),
        }
    }

    #[test]
    fn test_add_valid_post() {
        let mut store = PostStore::new();
        let post = store
            .add(raw("Hello LinkedIn", "2024-01-01T09:00", 10, 5, 1))
            .unwrap();
        assert_eq!(post.id, 0);
        assert_eq!(post.content_type, "text");
        assert_eq!(post.engagement_score(), 10 + 2 * 5 + 3 * 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_add_rejects_missing_text() {
        let mut store = PostStore::new();
        let mut record = raw("  ", "2024-01-01T09:00", 1, 0, 0);
        assert_eq!(
            store.add(record.clone()).unwrap_err(),
            ValidationError::MissingField("text")
        );
        record.text = None;
        assert_eq!(
            store.add(record).unwrap_err(),
            ValidationError::MissingField("text")
        );
        assert!(store.is_empty());
    }

    #[test]
    fn test_add_rejects_missing_or_bad_timestamp() {
        let mut store = PostStore::new();
        let mut record = raw("post", "", 1, 0, 0);
        assert_eq!(
            store.add(record.clone()).unwrap_err(),
            ValidationError::MissingField("timestamp")
        );
        record.timestamp = Some("3d ago-ish".to_string());
        assert!(matches!(
            store.add(record).unwrap_err(),
            ValidationError::BadTimestamp(_)
        ));
    }

    #[test]
    fn test_add_rejects_negative_metrics() {
        let mut store = PostStore::new();
        let result = store.add(raw("post", "2024-01-01 09:00", 5, -1, 0));
        assert_eq!(
            result.unwrap_err(),
            ValidationError::NegativeMetric {
                field: "comments",
                value: -1
            }
        );
    }

    #[test]
    fn test_add_rejects_metric_beyond_u32() {
        let mut store = PostStore::new();
        let too_big = i64::from(u32::MAX) + 1;
        let result = store.add(raw("post", "2024-01-01 09:00", too_big, 0, 0));
        assert_eq!(
            result.unwrap_err(),
            ValidationError::MetricOutOfRange {
                field: "likes",
                value: too_big
            }
        );
    }

    #[test]
    fn test_ids_are_unique_and_sequential() {
        let mut store = PostStore::new();
        let a = store.add(raw("a", "2024-01-01T09:00", 0, 0, 0)).unwrap().id;
        let b = store.add(raw("b", "2024-01-01T10:00", 0, 0, 0)).unwrap().id;
        assert_ne!(a, b);
    }

    #[test]
    fn test_from_posts_continues_id_sequence() {
        let existing = Post {
            id: 7,
            text: "old".to_string(),
            content_type: "text".to_string(),
            topic: None,
            timestamp: None,
            likes: 1,
            comments: 0,
            shares: 0,
        };
        let mut store = PostStore::from_posts(vec![existing]);
        let added = store.add(raw("new", "2024-01-01T09:00", 0, 0, 0)).unwrap();
        assert_eq!(added.id, 8);
    }

    #[test]
    fn test_filter_does_not_mutate() {
        let mut store = PostStore::new();
        let mut record = raw("video post", "2024-01-01T09:00", 1, 0, 0);
        record.content_type = Some("video".to_string());
        store.add(record).unwrap();
        store.add(raw("text post", "2024-01-01T10:00", 2, 0, 0)).unwrap();

        let videos = store.filter(|p| p.content_type == "video");
        assert_eq!(videos.len(), 1);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_length_tracks_text() {
        let mut store = PostStore::new();
        let post = store.add(raw("héllo", "2024-01-01T09:00", 0, 0, 0)).unwrap();
        assert_eq!(post.length(), 5);
    }
}
