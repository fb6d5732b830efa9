// src/web/handlers/profile_handlers.rs
use crate::database::{
    DatabaseConfig, PostRepository, ProfileRecord, ProfileRepository,
};
use crate::scraper::ProfileScraper;
use crate::store::PostStore;
use crate::web::types::{
    DataResponse, ScrapeRequest, ScrapeSummary, StandardErrorResponse, StandardRequest,
    WithConversationId,
};

use chrono::Utc;
use rocket::serde::json::Json;
use rocket::State;
use tracing::{error, info, warn};

pub async fn scrape_profile_handler(
    request: Json<StandardRequest<ScrapeRequest>>,
    scraper: &State<ProfileScraper>,
    db_config: &State<DatabaseConfig>,
) -> Result<Json<DataResponse<ScrapeSummary>>, Json<StandardErrorResponse>> {
    let conversation_id = request.conversation_id();
    let profile_url = request.data.profile_url.trim().to_string();

    if !profile_url.contains("linkedin.com/in/") {
        return Err(Json(StandardErrorResponse::new(
            "Not a LinkedIn profile URL".to_string(),
            "INVALID_PROFILE_URL".to_string(),
            vec!["Expected a URL like https://www.linkedin.com/in/username/".to_string()],
            conversation_id,
        )));
    }

    info!("Scraping profile: {}", profile_url);

    let profile = match scraper.scrape_profile(&profile_url).await {
        Ok(profile) => profile,
        Err(e) => {
            error!("Scrape failed for {}: {}", profile_url, e);
            return Err(Json(StandardErrorResponse::new(
                format!("Failed to scrape profile: {}", e),
                "SCRAPE_ERROR".to_string(),
                vec![
                    "Verify the profile URL is publicly accessible".to_string(),
                    "Try again in a few moments".to_string(),
                ],
                conversation_id,
            )));
        }
    };

    // Validate each scraped record; bad rows are skipped, not fatal.
    let mut store = PostStore::new();
    let mut skipped = 0usize;
    for raw in &profile.posts {
        if let Err(e) = store.add(raw.clone()) {
            warn!("Skipping scraped post: {}", e);
            skipped += 1;
        }
    }

    if store.is_empty() {
        return Err(Json(StandardErrorResponse::new(
            "No usable posts found on this profile".to_string(),
            "NO_POSTS".to_string(),
            vec!["The profile may have no public activity".to_string()],
            conversation_id,
        )));
    }

    let posts = store.all();
    let avg_engagement = posts
        .iter()
        .map(|p| p.engagement_score() as f64)
        .sum::<f64>()
        / posts.len() as f64;

    let pool = match db_config.pool() {
        Ok(pool) => pool,
        Err(e) => {
            error!("Database connection failed: {}", e);
            return Err(Json(StandardErrorResponse::new(
                "Database connection failed".to_string(),
                "DATABASE_ERROR".to_string(),
                vec!["Try again in a few moments".to_string()],
                conversation_id,
            )));
        }
    };

    let record = ProfileRecord {
        profile_url: profile.profile_url.clone(),
        username: profile.username.clone(),
        name: profile.name.clone(),
        headline: profile.headline.clone(),
        location: profile.location.clone(),
        avg_engagement,
        last_updated: Utc::now(),
    };

    let save_result = async {
        ProfileRepository::new(pool).upsert(&record).await?;
        PostRepository::new(pool)
            .replace_for_profile(&profile.profile_url, posts)
            .await
    }
    .await;

    if let Err(e) = save_result {
        error!("Failed to persist scrape for {}: {}", profile_url, e);
        return Err(Json(StandardErrorResponse::new(
            "Failed to store scraped data".to_string(),
            "DATABASE_ERROR".to_string(),
            vec!["Try again in a few moments".to_string()],
            conversation_id,
        )));
    }

    info!(
        "Stored {} posts for {} ({} skipped)",
        posts.len(),
        profile.username,
        skipped
    );

    let summary = ScrapeSummary {
        profile_url: profile.profile_url,
        username: profile.username,
        name: profile.name,
        posts_stored: posts.len(),
        posts_skipped: skipped,
        avg_engagement,
    };

    Ok(Json(DataResponse::success(
        "Profile scraped successfully".to_string(),
        summary,
        conversation_id,
    )))
}

pub async fn list_profiles_handler(
    db_config: &State<DatabaseConfig>,
) -> Result<Json<DataResponse<Vec<ProfileRecord>>>, Json<StandardErrorResponse>> {
    let pool = match db_config.pool() {
        Ok(pool) => pool,
        Err(e) => {
            error!("Database connection failed: {}", e);
            return Err(Json(StandardErrorResponse::new(
                "Database connection failed".to_string(),
                "DATABASE_ERROR".to_string(),
                vec!["Try again in a few moments".to_string()],
                None,
            )));
        }
    };

    match ProfileRepository::new(pool).list().await {
        Ok(profiles) => Ok(Json(DataResponse::success(
            format!("Found {} profiles", profiles.len()),
            profiles,
            None,
        ))),
        Err(e) => {
            error!("Failed to list profiles: {}", e);
            Err(Json(StandardErrorResponse::new(
                "Failed to list profiles".to_string(),
                "DATABASE_ERROR".to_string(),
                vec!["Try again in a few moments".to_string()],
                None,
            )))
        }
    }
}
