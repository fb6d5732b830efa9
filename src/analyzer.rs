// src/analyzer.rs
//! Engagement analysis over a post store snapshot: content-type, topic and
//! length rankings plus a posting-time recommendation. Pure function of the
//! snapshot; all orderings are deterministic (mean desc, count desc, key asc).

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::Timelike;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::{Post, PostStore};

const MAX_HASHTAGS: usize = 20;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("no posts available for analysis")]
    InsufficientData,
    #[error("invalid analyzer configuration: {0}")]
    InvalidConfig(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeGranularity {
    Hour,
    Weekday,
    HourAndWeekday,
}

impl FromStr for TimeGranularity {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hour" => Ok(Self::Hour),
            "weekday" => Ok(Self::Weekday),
            "hour_and_weekday" => Ok(Self::HourAndWeekday),
            other => Err(AnalysisError::InvalidConfig(format!(
                "unknown time granularity: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// Ordered upper boundaries of the length buckets, in characters.
    /// `[50, 150, 300]` yields 0-50, 51-150, 151-300 and 300+.
    pub length_buckets: Vec<usize>,
    pub time_granularity: TimeGranularity,
    /// How many time keys the recommendation returns.
    pub top_k: usize,
    /// Minimum posts a time key needs before it is eligible, so a single
    /// outlier post cannot dominate the recommendation.
    pub min_samples: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            length_buckets: vec![50, 150, 300],
            time_granularity: TimeGranularity::Hour,
            top_k: 3,
            min_samples: 2,
        }
    }
}

impl AnalyzerConfig {
    pub fn with_length_buckets(mut self, buckets: Vec<usize>) -> Self {
        self.length_buckets = buckets;
        self
    }

    pub fn with_time_granularity(mut self, granularity: TimeGranularity) -> Self {
        self.time_granularity = granularity;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_min_samples(mut self, min_samples: usize) -> Self {
        self.min_samples = min_samples;
        self
    }

    fn validate(&self) -> Result<(), AnalysisError> {
        if self.top_k == 0 {
            return Err(AnalysisError::InvalidConfig(
                "top_k must be positive".to_string(),
            ));
        }
        if self.length_buckets.is_empty() {
            return Err(AnalysisError::InvalidConfig(
                "length_buckets must not be empty".to_string(),
            ));
        }
        if self.length_buckets.windows(2).any(|w| w[0] >= w[1]) {
            return Err(AnalysisError::InvalidConfig(
                "length_buckets must be strictly increasing".to_string(),
            ));
        }
        Ok(())
    }
}

/// One row of a ranking: group key, mean engagement and how many posts
/// backed it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupStat {
    pub key: String,
    pub mean_score: f64,
    pub sample_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HashtagCount {
    pub tag: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct EngagementReport {
    pub content_type_ranking: Vec<GroupStat>,
    pub topic_ranking: Vec<GroupStat>,
    pub length_ranking: Vec<GroupStat>,
    pub time_ranking: Vec<GroupStat>,
    pub top_hashtags: Vec<HashtagCount>,
    pub overall_mean_score: f64,
    pub analyzed_posts: usize,
    pub time_granularity: TimeGranularity,
}

pub struct EngagementAnalyzer {
    config: AnalyzerConfig,
}

impl EngagementAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(AnalyzerConfig::default())
    }

    /// Analyze a read-only snapshot. Empty groups and under-threshold time
    /// keys are absent entries, not errors; only an empty store fails.
    pub fn analyze(&self, store: &PostStore) -> Result<EngagementReport, AnalysisError> {
        self.config.validate()?;

        let posts = store.all();
        if posts.is_empty() {
            return Err(AnalysisError::InsufficientData);
        }

        let total: u64 = posts.iter().map(Post::engagement_score).sum();
        let overall_mean_score = total as f64 / posts.len() as f64;

        let content_type_ranking =
            ranked(group_by(posts.iter(), |p| Some(p.content_type.clone())));
        let topic_ranking = ranked(group_by(posts.iter(), |p| p.topic.clone()));
        let length_ranking = ranked(group_by(posts.iter(), |p| {
            Some(bucket_label(p.length(), &self.config.length_buckets))
        }));

        let granularity = self.config.time_granularity;
        let mut time_ranking = ranked(group_by(posts.iter(), |p| {
            p.timestamp.map(|ts| time_key(&ts, granularity))
        }));
        time_ranking.retain(|stat| stat.sample_count >= self.config.min_samples);
        time_ranking.truncate(self.config.top_k);

        Ok(EngagementReport {
            content_type_ranking,
            topic_ranking,
            length_ranking,
            time_ranking,
            top_hashtags: top_hashtags(posts),
            overall_mean_score,
            analyzed_posts: posts.len(),
            time_granularity: granularity,
        })
    }
}

/// Sum engagement per group key; posts mapped to `None` are skipped for
/// that grouping only.
fn group_by<'a, I, F>(posts: I, key_fn: F) -> BTreeMap<String, (u64, usize)>
where
    I: Iterator<Item = &'a Post>,
    F: Fn(&Post) -> Option<String>,
{
    let mut groups: BTreeMap<String, (u64, usize)> = BTreeMap::new();
    for post in posts {
        if let Some(key) = key_fn(post) {
            let entry = groups.entry(key).or_insert((0, 0));
            entry.0 += post.engagement_score();
            entry.1 += 1;
        }
    }
    groups
}

fn ranked(groups: BTreeMap<String, (u64, usize)>) -> Vec<GroupStat> {
    let mut stats: Vec<GroupStat> = groups
        .into_iter()
        .map(|(key, (sum, count))| GroupStat {
            key,
            mean_score: sum as f64 / count as f64,
            sample_count: count,
        })
        .collect();

    stats.sort_by(|a, b| {
        b.mean_score
            .total_cmp(&a.mean_score)
            .then(b.sample_count.cmp(&a.sample_count))
            .then(a.key.cmp(&b.key))
    });
    stats
}

fn bucket_label(length: usize, boundaries: &[usize]) -> String {
    let mut lower = 0usize;
    for &upper in boundaries {
        if length <= upper {
            return format!("{}-{}", lower, upper);
        }
        lower = upper + 1;
    }
    format!("{}+", boundaries[boundaries.len() - 1])
}

fn time_key(ts: &chrono::NaiveDateTime, granularity: TimeGranularity) -> String {
    match granularity {
        TimeGranularity::Hour => format!("{:02}:00", ts.hour()),
        TimeGranularity::Weekday => ts.format("%A").to_string(),
        TimeGranularity::HourAndWeekday => format!("{} {:02}:00", ts.format("%A"), ts.hour()),
    }
}

fn top_hashtags(posts: &[Post]) -> Vec<HashtagCount> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for post in posts {
        for token in post.text.split_whitespace() {
            if let Some(tag) = normalize_hashtag(token) {
                *counts.entry(tag).or_insert(0) += 1;
            }
        }
    }

    let mut tags: Vec<HashtagCount> = counts
        .into_iter()
        .map(|(tag, count)| HashtagCount { tag, count })
        .collect();
    tags.sort_by(|a, b| b.count.cmp(&a.count).then(a.tag.cmp(&b.tag)));
    tags.truncate(MAX_HASHTAGS);
    tags
}

fn normalize_hashtag(token: &str) -> Option<String> {
    let token = token.strip_prefix('#')?;
    let tag: String = token
        .trim_end_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase();
    if tag.is_empty() {
        None
    } else {
        Some(format!("#{}", tag))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::RawPost;

    fn store_from(records: &[(&str, &str, &str, i64, i64, i64)]) -> PostStore {
        let mut store = PostStore::new();
        for (text, content_type, ts, likes, comments, shares) in records {
            store
                .add(RawPost {
                    text: Some(text.to_string()),
                    content_type: Some(content_type.to_string()),
                    topic: None,
                    timestamp: Some(ts.to_string()),
                    likes: Some(*likes),
                    comments: Some(*comments),
                    shares: Some(*shares),
                })
                .unwrap();
        }
        store
    }

    #[test]
    fn test_content_type_ranking_scenario() {
        // likes 10, comments 5, shares 1 -> 10 + 10 + 3 = 23
        // likes 50, comments 2, shares 0 -> 50 + 4 + 0 = 54
        let store = store_from(&[
            ("a text post", "text", "2024-01-01T09:00", 10, 5, 1),
            ("an image post", "image", "2024-01-01T09:00", 50, 2, 0),
        ]);
        let report = EngagementAnalyzer::with_defaults().analyze(&store).unwrap();

        assert_eq!(report.content_type_ranking.len(), 2);
        assert_eq!(report.content_type_ranking[0].key, "image");
        assert_eq!(report.content_type_ranking[0].mean_score, 54.0);
        assert_eq!(report.content_type_ranking[1].key, "text");
        assert_eq!(report.content_type_ranking[1].mean_score, 23.0);
    }

    #[test]
    fn test_ranking_means_non_increasing() {
        let store = store_from(&[
            ("a", "text", "2024-01-02T08:00", 5, 0, 0),
            ("b", "image", "2024-01-02T09:00", 90, 1, 2),
            ("c", "video", "2024-01-02T10:00", 40, 3, 1),
            ("d", "article", "2024-01-02T11:00", 12, 2, 0),
        ]);
        let report = EngagementAnalyzer::with_defaults().analyze(&store).unwrap();
        for pair in report.content_type_ranking.windows(2) {
            assert!(pair[0].mean_score >= pair[1].mean_score);
        }
    }

    #[test]
    fn test_ties_break_by_count_then_name() {
        // "video" and "image" both have mean 10, but video has two samples.
        // "text" and "article" both have mean 5 and one sample each.
        let store = store_from(&[
            ("v1", "video", "2024-01-01T09:00", 10, 0, 0),
            ("v2", "video", "2024-01-02T09:00", 10, 0, 0),
            ("i1", "image", "2024-01-03T09:00", 10, 0, 0),
            ("t1", "text", "2024-01-04T09:00", 5, 0, 0),
            ("a1", "article", "2024-01-05T09:00", 5, 0, 0),
        ]);
        let report = EngagementAnalyzer::with_defaults().analyze(&store).unwrap();
        let keys: Vec<&str> = report
            .content_type_ranking
            .iter()
            .map(|s| s.key.as_str())
            .collect();
        assert_eq!(keys, vec!["video", "image", "article", "text"]);
    }

    #[test]
    fn test_empty_store_is_insufficient_data() {
        let store = PostStore::new();
        let result = EngagementAnalyzer::with_defaults().analyze(&store);
        assert!(matches!(result, Err(AnalysisError::InsufficientData)));
    }

    #[test]
    fn test_single_post_has_rankings_but_no_time_recommendation() {
        let store = store_from(&[("only one", "text", "2024-01-01T09:00", 10, 0, 0)]);
        let report = EngagementAnalyzer::with_defaults().analyze(&store).unwrap();

        assert_eq!(report.content_type_ranking.len(), 1);
        assert_eq!(report.length_ranking.len(), 1);
        // min_samples defaults to 2, so the lone 09:00 bucket is excluded.
        assert!(report.time_ranking.is_empty());
    }

    #[test]
    fn test_time_ranking_respects_min_samples_and_top_k() {
        let store = store_from(&[
            ("a", "text", "2024-01-01T09:00", 100, 0, 0),
            ("b", "text", "2024-01-02T09:30", 80, 0, 0),
            ("c", "text", "2024-01-01T12:00", 50, 0, 0),
            ("d", "text", "2024-01-02T12:15", 40, 0, 0),
            ("e", "text", "2024-01-03T18:00", 999, 0, 0), // outlier, single sample
        ]);
        let config = AnalyzerConfig::default().with_top_k(1);
        let report = EngagementAnalyzer::new(config).analyze(&store).unwrap();

        assert_eq!(report.time_ranking.len(), 1);
        assert_eq!(report.time_ranking[0].key, "09:00");
        assert_eq!(report.time_ranking[0].sample_count, 2);
    }

    #[test]
    fn test_posts_without_timestamp_excluded_from_time_ranking_only() {
        let mut posts = store_from(&[
            ("a", "text", "2024-01-01T09:00", 10, 0, 0),
            ("b", "text", "2024-01-01T09:30", 20, 0, 0),
        ])
        .all()
        .to_vec();
        posts.push(Post {
            id: 99,
            text: "loaded from storage with garbled time".to_string(),
            content_type: "image".to_string(),
            topic: None,
            timestamp: None,
            likes: 5,
            comments: 0,
            shares: 0,
        });
        let store = PostStore::from_posts(posts);
        let report = EngagementAnalyzer::with_defaults().analyze(&store).unwrap();

        assert_eq!(report.analyzed_posts, 3);
        assert_eq!(report.content_type_ranking.len(), 2);
        let time_total: usize = report.time_ranking.iter().map(|s| s.sample_count).sum();
        assert_eq!(time_total, 2);
    }

    #[test]
    fn test_weekday_granularity_keys() {
        // 2024-01-01 was a Monday.
        let store = store_from(&[
            ("a", "text", "2024-01-01T09:00", 10, 0, 0),
            ("b", "text", "2024-01-01T18:00", 20, 0, 0),
        ]);
        let config = AnalyzerConfig::default().with_time_granularity(TimeGranularity::Weekday);
        let report = EngagementAnalyzer::new(config).analyze(&store).unwrap();
        assert_eq!(report.time_ranking[0].key, "Monday");
        assert_eq!(report.time_ranking[0].sample_count, 2);
    }

    #[test]
    fn test_length_bucket_boundaries() {
        assert_eq!(bucket_label(0, &[50, 150, 300]), "0-50");
        assert_eq!(bucket_label(50, &[50, 150, 300]), "0-50");
        assert_eq!(bucket_label(51, &[50, 150, 300]), "51-150");
        assert_eq!(bucket_label(300, &[50, 150, 300]), "151-300");
        assert_eq!(bucket_label(301, &[50, 150, 300]), "300+");
    }

    #[test]
    fn test_empty_length_buckets_are_absent_not_zero() {
        let store = store_from(&[("tiny", "text", "2024-01-01T09:00", 10, 0, 0)]);
        let report = EngagementAnalyzer::with_defaults().analyze(&store).unwrap();
        assert_eq!(report.length_ranking.len(), 1);
        assert_eq!(report.length_ranking[0].key, "0-50");
    }

    #[test]
    fn test_analyze_is_idempotent() {
        let store = store_from(&[
            ("a #Rust post", "text", "2024-01-01T09:00", 10, 5, 1),
            ("b #rust again", "image", "2024-01-01T09:05", 50, 2, 0),
        ]);
        let analyzer = EngagementAnalyzer::with_defaults();
        let first = analyzer.analyze(&store).unwrap();
        let second = analyzer.analyze(&store).unwrap();

        assert_eq!(first.content_type_ranking, second.content_type_ranking);
        assert_eq!(first.time_ranking, second.time_ranking);
        assert_eq!(first.top_hashtags, second.top_hashtags);
        assert_eq!(first.overall_mean_score, second.overall_mean_score);
    }

    #[test]
    fn test_hashtags_lowercased_and_stripped() {
        let store = store_from(&[
            ("Big news! #Launch #launch. #AI", "text", "2024-01-01T09:00", 1, 0, 0),
            ("More on #ai here", "text", "2024-01-01T10:00", 1, 0, 0),
        ]);
        let report = EngagementAnalyzer::with_defaults().analyze(&store).unwrap();
        assert_eq!(
            report.top_hashtags,
            vec![
                HashtagCount { tag: "#ai".to_string(), count: 2 },
                HashtagCount { tag: "#launch".to_string(), count: 2 },
            ]
        );
    }

    #[test]
    fn test_invalid_config_rejected() {
        let store = store_from(&[("a", "text", "2024-01-01T09:00", 1, 0, 0)]);
        let config = AnalyzerConfig::default().with_length_buckets(vec![300, 150]);
        let result = EngagementAnalyzer::new(config).analyze(&store);
        assert!(matches!(result, Err(AnalysisError::InvalidConfig(_))));

        let config = AnalyzerConfig::default().with_top_k(0);
        let result = EngagementAnalyzer::new(config).analyze(&store);
        assert!(matches!(result, Err(AnalysisError::InvalidConfig(_))));
    }
}
