// src/generator.rs
//! Client for the external post-generation service. The analyzer never calls
//! this; callers pass the historical insights string along with the request.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::analyzer::EngagementReport;

const GENERATE_ENDPOINT: &str = "/api/v1/generate-posts";
const HASHTAGS_ENDPOINT: &str = "/api/v1/suggest-hashtags";

const DEFAULT_TONE: &str = "Conversational";
const DEFAULT_MAX_LENGTH: u32 = 500;
const DEFAULT_VARIATION_COUNT: u32 = 3;
const DEFAULT_NUM_HASHTAGS: u32 = 3;

#[derive(Debug, Clone, Serialize)]
pub struct GenerationRequest {
    pub request_id: Uuid,
    pub topic: String,
    pub tone: String,
    pub max_length: u32,
    pub call_to_action: bool,
    pub hashtags: bool,
    pub num_hashtags: u32,
    pub variation_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insights: Option<String>,
}

impl GenerationRequest {
    pub fn new(topic: String) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            topic,
            tone: DEFAULT_TONE.to_string(),
            max_length: DEFAULT_MAX_LENGTH,
            call_to_action: true,
            hashtags: true,
            num_hashtags: DEFAULT_NUM_HASHTAGS,
            variation_count: DEFAULT_VARIATION_COUNT,
            insights: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedVariant {
    pub content: String,
    pub estimated_engagement: u32,
}

#[derive(Debug, Deserialize)]
struct GenerationResponse {
    posts: Vec<GeneratedVariant>,
}

#[derive(Debug, Deserialize)]
struct HashtagResponse {
    hashtags: Vec<String>,
}

pub struct GenerationClient {
    client: reqwest::Client,
    base_url: String,
}

impl GenerationClient {
    pub fn new(base_url: String, timeout_seconds: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, base_url })
    }

    pub async fn generate_posts(
        &self,
        request: &GenerationRequest,
    ) -> Result<Vec<GeneratedVariant>> {
        let url = format!("{}{}", self.base_url, GENERATE_ENDPOINT);

        info!(
            "Calling generation service: {} (topic: {}, request: {})",
            url, request.topic, request.request_id
        );

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .context("Failed to call generation service")?;

        let status = response.status();
        if status.is_success() {
            let body: GenerationResponse = response
                .json()
                .await
                .context("Failed to parse generation response")?;

            if body.posts.is_empty() {
                anyhow::bail!("Generation service returned no variants");
            }
            Ok(body.posts)
        } else {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            anyhow::bail!("Generation failed with status {}: {}", status, error_text)
        }
    }

    pub async fn suggest_hashtags(&self, topic: &str, count: u32) -> Result<Vec<String>> {
        let url = format!("{}{}", self.base_url, HASHTAGS_ENDPOINT);

        let payload = serde_json::json!({
            "topic": topic,
            "count": count,
        });

        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .context("Failed to call hashtag service")?;

        let status = response.status();
        if status.is_success() {
            let body: HashtagResponse = response
                .json()
                .await
                .context("Failed to parse hashtag response")?;
            Ok(body.hashtags)
        } else {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            anyhow::bail!(
                "Hashtag suggestion failed with status {}: {}",
                status,
                error_text
            )
        }
    }
}

/// Compact summary of historical performance for the generation prompt.
/// Returns None when the report carries nothing worth mentioning.
pub fn build_insights(report: &EngagementReport) -> Option<String> {
    let mut parts = Vec::new();

    let top_types: Vec<&str> = report
        .content_type_ranking
        .iter()
        .take(3)
        .map(|s| s.key.as_str())
        .collect();
    if !top_types.is_empty() {
        parts.push(format!(
            "Top performing content types: {}.",
            top_types.join(", ")
        ));
    }

    let top_topics: Vec<&str> = report
        .topic_ranking
        .iter()
        .take(3)
        .map(|s| s.key.as_str())
        .collect();
    if !top_topics.is_empty() {
        parts.push(format!("Top performing topics: {}.", top_topics.join(", ")));
    }

    if let Some(best_length) = report.length_ranking.first() {
        parts.push(format!(
            "Posts of {} characters perform best.",
            best_length.key
        ));
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}

/// Static variants used when the generation service is unavailable, so the
/// caller still gets something to edit.
pub fn fallback_variants(topic: &str) -> Vec<GeneratedVariant> {
    vec![
        GeneratedVariant {
            content: format!(
                "Here are my thoughts on {}. What do you think? #LinkedIn #Professional",
                topic
            ),
            estimated_engagement: 50,
        },
        GeneratedVariant {
            content: format!(
                "I've been thinking about {} lately and wanted to share my perspective. \
                 Would love to hear your thoughts! #Career #Insights",
                topic
            ),
            estimated_engagement: 45,
        },
    ]
}

/// Static hashtags used when the suggestion service is unavailable.
pub fn fallback_hashtags(topic: &str, count: u32) -> Vec<String> {
    let mut tags = vec![
        format!("#{}", topic.split_whitespace().collect::<String>()),
        "#LinkedIn".to_string(),
        "#Professional".to_string(),
    ];
    tags.truncate(count as usize);
    tags
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::{GroupStat, TimeGranularity};

    fn stat(key: &str, mean: f64, count: usize) -> GroupStat {
        GroupStat {
            key: key.to_string(),
            mean_score: mean,
            sample_count: count,
        }
    }

    #[test]
    fn test_build_insights_mentions_top_performers() {
        let report = EngagementReport {
            content_type_ranking: vec![stat("image", 54.0, 2), stat("text", 23.0, 3)],
            topic_ranking: vec![stat("leadership", 60.0, 2)],
            length_ranking: vec![stat("51-150", 40.0, 4)],
            time_ranking: vec![],
            top_hashtags: vec![],
            overall_mean_score: 38.0,
            analyzed_posts: 5,
            time_granularity: TimeGranularity::Hour,
        };

        let insights = build_insights(&report).unwrap();
        assert!(insights.contains("image, text"));
        assert!(insights.contains("leadership"));
        assert!(insights.contains("51-150"));
    }

    #[test]
    fn test_build_insights_empty_report_is_none() {
        let report = EngagementReport {
            content_type_ranking: vec![],
            topic_ranking: vec![],
            length_ranking: vec![],
            time_ranking: vec![],
            top_hashtags: vec![],
            overall_mean_score: 0.0,
            analyzed_posts: 0,
            time_granularity: TimeGranularity::Hour,
        };
        assert!(build_insights(&report).is_none());
    }

    #[test]
    fn test_fallback_variants_mention_topic() {
        let variants = fallback_variants("remote work");
        assert_eq!(variants.len(), 2);
        assert!(variants.iter().all(|v| v.content.contains("remote work")));
    }

    #[test]
    fn test_fallback_hashtags_respect_count() {
        let tags = fallback_hashtags("remote work", 2);
        assert_eq!(
            tags,
            vec!["#remotework".to_string(), "#LinkedIn".to_string()]
        );
    }
}
