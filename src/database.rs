// src/database.rs
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::path::PathBuf;
use tracing::info;

use crate::store::{parse_timestamp, Post};

pub const FEEDBACK_VALUES: [&str; 3] = ["positive", "negative", "neutral"];

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProfileRecord {
    pub profile_url: String,
    pub username: String,
    pub name: String,
    pub headline: Option<String>,
    pub location: Option<String>,
    pub avg_engagement: f64,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct StoredPost {
    pub id: i64,
    pub profile_url: String,
    pub content: String,
    pub content_type: String,
    pub topic: Option<String>,
    pub posted_at: Option<String>,
    pub likes: i64,
    pub comments: i64,
    pub shares: i64,
    pub engagement: i64,
}

impl StoredPost {
    /// Convert a stored row back into the analyzer's post shape. Rows with
    /// empty or garbled `posted_at` text keep `timestamp: None` and drop out
    /// of the time ranking only.
    pub fn to_post(&self) -> Post {
        Post {
            id: self.id as u64,
            text: self.content.clone(),
            content_type: self.content_type.clone(),
            topic: self.topic.clone(),
            timestamp: self.posted_at.as_deref().and_then(parse_timestamp),
            likes: self.likes.max(0) as u32,
            comments: self.comments.max(0) as u32,
            shares: self.shares.max(0) as u32,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct GeneratedPost {
    pub id: i64,
    pub content: String,
    pub topic: String,
    pub tone: String,
    pub include_cta: bool,
    pub include_hashtags: bool,
    pub feedback: String,
    pub generation_time: DateTime<Utc>,
    pub scheduled_time: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToneStat {
    pub tone: String,
    pub positive_rate: f64,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedbackStats {
    pub total_posts: usize,
    pub positive: usize,
    pub positive_rate: f64,
    pub tone_effectiveness: Vec<ToneStat>,
    pub preferred_tone: Option<String>,
}

#[derive(Debug)]
pub struct DatabaseConfig {
    pub database_path: PathBuf,
    pub pool: Option<SqlitePool>,
}

impl DatabaseConfig {
    pub fn new(database_path: PathBuf) -> Self {
        Self {
            database_path,
            pool: None,
        }
    }

    /// Initialize the database connection pool
    pub async fn init_pool(&mut self) -> Result<()> {
        if let Some(parent) = self.database_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .context("Failed to create database directory")?;
        }

        let database_url = format!("sqlite:{}?mode=rwc", self.database_path.display());

        let pool = SqlitePool::connect(&database_url)
            .await
            .context("Failed to connect to SQLite database")?;
        self.pool = Some(pool);

        info!("Database connection pool initialized: {}", database_url);
        Ok(())
    }

    /// Get the database pool
    pub fn pool(&self) -> Result<&SqlitePool> {
        self.pool.as_ref().ok_or_else(|| {
            anyhow::anyhow!("Database pool not initialized. Call init_pool() first.")
        })
    }

    /// Run database migrations
    pub async fn migrate(&self) -> Result<()> {
        run_migrations(self.pool()?).await
    }
}

pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS profiles (
            profile_url TEXT PRIMARY KEY,
            username TEXT NOT NULL,
            name TEXT NOT NULL,
            headline TEXT,
            location TEXT,
            avg_engagement REAL NOT NULL DEFAULT 0,
            last_updated TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS posts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            profile_url TEXT NOT NULL,
            content TEXT NOT NULL,
            content_type TEXT NOT NULL,
            topic TEXT,
            posted_at TEXT,
            likes INTEGER NOT NULL DEFAULT 0,
            comments INTEGER NOT NULL DEFAULT 0,
            shares INTEGER NOT NULL DEFAULT 0,
            engagement INTEGER NOT NULL DEFAULT 0,
            FOREIGN KEY (profile_url) REFERENCES profiles(profile_url)
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_posts_profile_url
        ON posts(profile_url);
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS generated_posts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            content TEXT NOT NULL,
            topic TEXT NOT NULL,
            tone TEXT NOT NULL,
            include_cta BOOLEAN NOT NULL,
            include_hashtags BOOLEAN NOT NULL,
            feedback TEXT NOT NULL DEFAULT 'neutral',
            generation_time TEXT NOT NULL,
            scheduled_time TEXT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    info!("Database migrations completed successfully");
    Ok(())
}

pub struct ProfileRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ProfileRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert or refresh a scraped profile.
    pub async fn upsert(&self, profile: &ProfileRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO profiles
            (profile_url, username, name, headline, location, avg_engagement, last_updated)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&profile.profile_url)
        .bind(&profile.username)
        .bind(&profile.name)
        .bind(&profile.headline)
        .bind(&profile.location)
        .bind(profile.avg_engagement)
        .bind(profile.last_updated)
        .execute(self.pool)
        .await?;

        info!("Saved profile: {}", profile.profile_url);
        Ok(())
    }

    pub async fn list(&self) -> Result<Vec<ProfileRecord>> {
        let profiles = sqlx::query_as::<_, ProfileRecord>(
            r#"
            SELECT profile_url, username, name, headline, location, avg_engagement, last_updated
            FROM profiles
            ORDER BY last_updated DESC
            "#,
        )
        .fetch_all(self.pool)
        .await?;

        Ok(profiles)
    }
}

pub struct PostRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> PostRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Replace the stored posts of one profile with a fresh scrape. Stored
    /// engagement is derived from the fixed weights at write time so a
    /// re-read always reproduces it.
    pub async fn replace_for_profile(&self, profile_url: &str, posts: &[Post]) -> Result<()> {
        sqlx::query("DELETE FROM posts WHERE profile_url = ?")
            .bind(profile_url)
            .execute(self.pool)
            .await?;

        for post in posts {
            sqlx::query(
                r#"
                INSERT INTO posts
                (profile_url, content, content_type, topic, posted_at,
                 likes, comments, shares, engagement)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(profile_url)
            .bind(&post.text)
            .bind(&post.content_type)
            .bind(&post.topic)
            .bind(
                post.timestamp
                    .map(|ts| ts.format("%Y-%m-%dT%H:%M:%S").to_string()),
            )
            .bind(i64::from(post.likes))
            .bind(i64::from(post.comments))
            .bind(i64::from(post.shares))
            .bind(post.engagement_score() as i64)
            .execute(self.pool)
            .await?;
        }

        info!("Stored {} posts for {}", posts.len(), profile_url);
        Ok(())
    }

    pub async fn list_all(&self) -> Result<Vec<StoredPost>> {
        let posts = sqlx::query_as::<_, StoredPost>(
            r#"
            SELECT id, profile_url, content, content_type, topic, posted_at,
                   likes, comments, shares, engagement
            FROM posts
            ORDER BY id ASC
            "#,
        )
        .fetch_all(self.pool)
        .await?;

        Ok(posts)
    }

    pub async fn list_for_profile(&self, profile_url: &str) -> Result<Vec<StoredPost>> {
        let posts = sqlx::query_as::<_, StoredPost>(
            r#"
            SELECT id, profile_url, content, content_type, topic, posted_at,
                   likes, comments, shares, engagement
            FROM posts
            WHERE profile_url = ?
            ORDER BY id ASC
            "#,
        )
        .bind(profile_url)
        .fetch_all(self.pool)
        .await?;

        Ok(posts)
    }
}

pub struct GeneratedPostRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> GeneratedPostRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        content: &str,
        topic: &str,
        tone: &str,
        include_cta: bool,
        include_hashtags: bool,
        feedback: &str,
    ) -> Result<i64> {
        check_feedback(feedback)?;

        let result = sqlx::query(
            r#"
            INSERT INTO generated_posts
            (content, topic, tone, include_cta, include_hashtags, feedback, generation_time)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(content)
        .bind(topic)
        .bind(tone)
        .bind(include_cta)
        .bind(include_hashtags)
        .bind(feedback)
        .bind(Utc::now())
        .execute(self.pool)
        .await?;

        let id = result.last_insert_rowid();
        info!("Saved generated post {} with feedback: {}", id, feedback);
        Ok(id)
    }

    pub async fn update_feedback(&self, post_id: i64, feedback: &str) -> Result<bool> {
        check_feedback(feedback)?;

        let result = sqlx::query(
            r#"
            UPDATE generated_posts
            SET feedback = ?
            WHERE id = ?
            "#,
        )
        .bind(feedback)
        .bind(post_id)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn schedule(&self, post_id: i64, scheduled_time: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE generated_posts
            SET scheduled_time = ?
            WHERE id = ?
            "#,
        )
        .bind(scheduled_time)
        .bind(post_id)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn list(&self) -> Result<Vec<GeneratedPost>> {
        let posts = sqlx::query_as::<_, GeneratedPost>(
            r#"
            SELECT id, content, topic, tone, include_cta, include_hashtags,
                   feedback, generation_time, scheduled_time
            FROM generated_posts
            ORDER BY generation_time DESC
            "#,
        )
        .fetch_all(self.pool)
        .await?;

        Ok(posts)
    }

    pub async fn list_scheduled(&self) -> Result<Vec<GeneratedPost>> {
        let posts = sqlx::query_as::<_, GeneratedPost>(
            r#"
            SELECT id, content, topic, tone, include_cta, include_hashtags,
                   feedback, generation_time, scheduled_time
            FROM generated_posts
            WHERE scheduled_time IS NOT NULL
            ORDER BY scheduled_time ASC
            "#,
        )
        .fetch_all(self.pool)
        .await?;

        Ok(posts)
    }

    /// Descriptive aggregates over stored feedback. Returns None when no
    /// generated posts exist yet.
    pub async fn feedback_stats(&self) -> Result<Option<FeedbackStats>> {
        let posts = self.list().await?;
        Ok(compute_feedback_stats(&posts))
    }
}

fn check_feedback(feedback: &str) -> Result<()> {
    if !FEEDBACK_VALUES.contains(&feedback) {
        anyhow::bail!(
            "Invalid feedback value: {}. Expected one of: {}",
            feedback,
            FEEDBACK_VALUES.join(", ")
        );
    }
    Ok(())
}

fn compute_feedback_stats(posts: &[GeneratedPost]) -> Option<FeedbackStats> {
    if posts.is_empty() {
        return None;
    }

    let total_posts = posts.len();
    let positive = posts.iter().filter(|p| p.feedback == "positive").count();
    let positive_rate = positive as f64 / total_posts as f64 * 100.0;

    let mut by_tone: std::collections::BTreeMap<&str, (usize, usize)> =
        std::collections::BTreeMap::new();
    for post in posts {
        let entry = by_tone.entry(post.tone.as_str()).or_insert((0, 0));
        entry.1 += 1;
        if post.feedback == "positive" {
            entry.0 += 1;
        }
    }

    let mut tone_effectiveness: Vec<ToneStat> = by_tone
        .into_iter()
        .map(|(tone, (pos, total))| ToneStat {
            tone: tone.to_string(),
            positive_rate: pos as f64 / total as f64 * 100.0,
            total,
        })
        .collect();
    tone_effectiveness.sort_by(|a, b| {
        b.positive_rate
            .total_cmp(&a.positive_rate)
            .then(a.tone.cmp(&b.tone))
    });

    let preferred_tone = tone_effectiveness.first().map(|t| t.tone.clone());

    Some(FeedbackStats {
        total_posts,
        positive,
        positive_rate,
        tone_effectiveness,
        preferred_tone,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    // In-memory SQLite needs a single connection, otherwise each pooled
    // connection sees its own empty database.
    async fn test_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        run_migrations(&pool).await.unwrap();
        pool
    }

    fn post(id: u64, text: &str, content_type: &str, likes: u32) -> Post {
        Post {
            id,
            text: text.to_string(),
            content_type: content_type.to_string(),
            topic: None,
            timestamp: parse_timestamp("2024-01-01T09:00"),
            likes,
            comments: 0,
            shares: 0,
        }
    }

    #[tokio::test]
    async fn test_post_round_trip_preserves_engagement() {
        let pool = test_pool().await;
        let profiles = ProfileRepository::new(&pool);
        let posts_repo = PostRepository::new(&pool);

        profiles
            .upsert(&ProfileRecord {
                profile_url: "https://www.linkedin.com/in/jane/".to_string(),
                username: "jane".to_string(),
                name: "Jane".to_string(),
                headline: None,
                location: None,
                avg_engagement: 0.0,
                last_updated: Utc::now(),
            })
            .await
            .unwrap();

        let original = vec![post(0, "hello", "text", 10), post(1, "img", "image", 50)];
        posts_repo
            .replace_for_profile("https://www.linkedin.com/in/jane/", &original)
            .await
            .unwrap();

        let stored = posts_repo.list_all().await.unwrap();
        assert_eq!(stored.len(), 2);
        for row in &stored {
            let rebuilt = row.to_post();
            assert_eq!(rebuilt.engagement_score() as i64, row.engagement);
            assert!(rebuilt.timestamp.is_some());
        }
    }

    #[tokio::test]
    async fn test_replace_for_profile_overwrites() {
        let pool = test_pool().await;
        let profiles = ProfileRepository::new(&pool);
        let posts_repo = PostRepository::new(&pool);
        let url = "https://www.linkedin.com/in/jane/";

        // posts.profile_url references profiles, so the parent row comes first
        profiles
            .upsert(&ProfileRecord {
                profile_url: url.to_string(),
                username: "jane".to_string(),
                name: "Jane".to_string(),
                headline: None,
                location: None,
                avg_engagement: 0.0,
                last_updated: Utc::now(),
            })
            .await
            .unwrap();

        posts_repo
            .replace_for_profile(url, &[post(0, "first", "text", 1)])
            .await
            .unwrap();
        posts_repo
            .replace_for_profile(url, &[post(0, "second", "text", 2)])
            .await
            .unwrap();

        let stored = posts_repo.list_for_profile(url).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].content, "second");
    }

    #[tokio::test]
    async fn test_generated_post_feedback_flow() {
        let pool = test_pool().await;
        let repo = GeneratedPostRepository::new(&pool);

        let id = repo
            .create(
                "a post",
                "leadership",
                "Professional",
                true,
                true,
                "neutral",
            )
            .await
            .unwrap();
        assert!(repo.update_feedback(id, "positive").await.unwrap());
        assert!(!repo.update_feedback(9999, "positive").await.unwrap());
        assert!(repo.update_feedback(id, "excellent").await.is_err());

        let posts = repo.list().await.unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].feedback, "positive");
    }

    #[tokio::test]
    async fn test_schedule_and_list_scheduled() {
        let pool = test_pool().await;
        let repo = GeneratedPostRepository::new(&pool);

        let id = repo
            .create("a post", "ai", "Educational", false, true, "neutral")
            .await
            .unwrap();
        assert!(repo.schedule(id, "2024-02-01T09:00").await.unwrap());

        let scheduled = repo.list_scheduled().await.unwrap();
        assert_eq!(scheduled.len(), 1);
        assert_eq!(
            scheduled[0].scheduled_time.as_deref(),
            Some("2024-02-01T09:00")
        );
    }

    #[test]
    fn test_feedback_stats_preferred_tone() {
        let base = GeneratedPost {
            id: 0,
            content: "c".to_string(),
            topic: "t".to_string(),
            tone: String::new(),
            include_cta: true,
            include_hashtags: true,
            feedback: String::new(),
            generation_time: Utc::now(),
            scheduled_time: None,
        };
        let mk = |tone: &str, feedback: &str| GeneratedPost {
            tone: tone.to_string(),
            feedback: feedback.to_string(),
            ..base.clone()
        };

        let posts = vec![
            mk("Professional", "positive"),
            mk("Professional", "positive"),
            mk("Conversational", "positive"),
            mk("Conversational", "negative"),
        ];
        let stats = compute_feedback_stats(&posts).unwrap();
        assert_eq!(stats.total_posts, 4);
        assert_eq!(stats.positive, 3);
        assert_eq!(stats.preferred_tone.as_deref(), Some("Professional"));

        assert!(compute_feedback_stats(&[]).is_none());
    }
}
