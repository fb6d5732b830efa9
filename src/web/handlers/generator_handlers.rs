// src/web/handlers/generator_handlers.rs
use crate::analyzer::{AnalyzerConfig, EngagementAnalyzer};
use crate::database::{DatabaseConfig, GeneratedPost, GeneratedPostRepository, PostRepository};
use crate::generator::{
    build_insights, fallback_hashtags, fallback_variants, GenerationClient, GenerationRequest,
};
use crate::store::PostStore;
use crate::web::types::{
    ActionResponse, DataResponse, FeedbackUpdateRequest, GeneratePostsRequest,
    GeneratedVariantsData, HashtagSuggestions, SaveGeneratedPostRequest, ScheduleRequest,
    StandardErrorResponse, StandardRequest, SuggestHashtagsRequest, WithConversationId,
};

use rocket::serde::json::Json;
use rocket::State;
use tracing::{error, info, warn};

pub async fn generate_posts_handler(
    request: Json<StandardRequest<GeneratePostsRequest>>,
    client: &State<GenerationClient>,
    db_config: &State<DatabaseConfig>,
) -> Result<Json<DataResponse<GeneratedVariantsData>>, Json<StandardErrorResponse>> {
    let conversation_id = request.conversation_id();
    let params = &request.data;

    if params.topic.trim().is_empty() {
        return Err(Json(StandardErrorResponse::new(
            "Topic must not be empty".to_string(),
            "INVALID_TOPIC".to_string(),
            vec!["Provide a topic to generate posts about".to_string()],
            conversation_id,
        )));
    }

    let mut generation = GenerationRequest::new(params.topic.trim().to_string());
    if let Some(tone) = &params.tone {
        generation.tone = tone.clone();
    }
    if let Some(max_length) = params.max_length {
        generation.max_length = max_length;
    }
    if let Some(cta) = params.call_to_action {
        generation.call_to_action = cta;
    }
    if let Some(hashtags) = params.hashtags {
        generation.hashtags = hashtags;
    }
    if let Some(n) = params.num_hashtags {
        generation.num_hashtags = n;
    }
    if let Some(n) = params.variation_count {
        generation.variation_count = n;
    }

    // Feed historical performance into the prompt when stored posts exist.
    if params.use_insights.unwrap_or(true) {
        generation.insights = load_insights(db_config).await;
    }

    let (variants, fallback) = match client.generate_posts(&generation).await {
        Ok(variants) => (variants, false),
        Err(e) => {
            warn!("Generation service unavailable, using fallback: {}", e);
            (fallback_variants(&generation.topic), true)
        }
    };

    info!(
        "Generated {} variants for topic '{}' (fallback: {})",
        variants.len(),
        generation.topic,
        fallback
    );

    let data = GeneratedVariantsData {
        topic: generation.topic,
        tone: generation.tone,
        variants,
        fallback,
    };

    Ok(Json(DataResponse::success(
        "Post variants generated".to_string(),
        data,
        conversation_id,
    )))
}

async fn load_insights(db_config: &State<DatabaseConfig>) -> Option<String> {
    let pool = db_config.pool().ok()?;
    let stored = PostRepository::new(pool).list_all().await.ok()?;
    if stored.is_empty() {
        return None;
    }

    let store = PostStore::from_posts(stored.iter().map(|row| row.to_post()).collect());
    let analyzer = EngagementAnalyzer::new(AnalyzerConfig::default());
    match analyzer.analyze(&store) {
        Ok(report) => build_insights(&report),
        Err(e) => {
            warn!("Skipping insights for generation: {}", e);
            None
        }
    }
}

pub async fn suggest_hashtags_handler(
    request: Json<StandardRequest<SuggestHashtagsRequest>>,
    client: &State<GenerationClient>,
) -> Result<Json<DataResponse<HashtagSuggestions>>, Json<StandardErrorResponse>> {
    let conversation_id = request.conversation_id();
    let topic = request.data.topic.trim().to_string();
    let count = request.data.count.unwrap_or(3);

    if topic.is_empty() {
        return Err(Json(StandardErrorResponse::new(
            "Topic must not be empty".to_string(),
            "INVALID_TOPIC".to_string(),
            vec!["Provide a topic to suggest hashtags for".to_string()],
            conversation_id,
        )));
    }

    let (hashtags, fallback) = match client.suggest_hashtags(&topic, count).await {
        Ok(hashtags) => (hashtags, false),
        Err(e) => {
            warn!("Hashtag service unavailable, using fallback: {}", e);
            (fallback_hashtags(&topic, count), true)
        }
    };

    Ok(Json(DataResponse::success(
        "Hashtag suggestions ready".to_string(),
        HashtagSuggestions {
            topic,
            hashtags,
            fallback,
        },
        conversation_id,
    )))
}

pub async fn save_generated_post_handler(
    request: Json<StandardRequest<SaveGeneratedPostRequest>>,
    db_config: &State<DatabaseConfig>,
) -> Result<Json<ActionResponse>, Json<StandardErrorResponse>> {
    let conversation_id = request.conversation_id();
    let params = &request.data;

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

    let repo = GeneratedPostRepository::new(pool);
    let result = repo
        .create(
            &params.content,
            &params.topic,
            &params.tone,
            params.include_cta.unwrap_or(true),
            params.include_hashtags.unwrap_or(true),
            params.feedback.as_deref().unwrap_or("neutral"),
        )
        .await;

    match result {
        Ok(id) => Ok(Json(ActionResponse::success(
            format!("Generated post saved with id {}", id),
            "saved".to_string(),
            conversation_id,
        ))),
        Err(e) => {
            error!("Failed to save generated post: {}", e);
            Err(Json(StandardErrorResponse::new(
                format!("Failed to save generated post: {}", e),
                "SAVE_ERROR".to_string(),
                vec!["Feedback must be positive, negative or neutral".to_string()],
                conversation_id,
            )))
        }
    }
}

pub async fn update_feedback_handler(
    request: Json<StandardRequest<FeedbackUpdateRequest>>,
    db_config: &State<DatabaseConfig>,
) -> Result<Json<ActionResponse>, Json<StandardErrorResponse>> {
    let conversation_id = request.conversation_id();
    let params = &request.data;

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

    let repo = GeneratedPostRepository::new(pool);
    match repo.update_feedback(params.post_id, &params.feedback).await {
        Ok(true) => Ok(Json(ActionResponse::success(
            format!("Feedback recorded for post {}", params.post_id),
            "updated".to_string(),
            conversation_id,
        ))),
        Ok(false) => Err(Json(StandardErrorResponse::new(
            format!("No generated post with id {}", params.post_id),
            "POST_NOT_FOUND".to_string(),
            vec!["List generated posts to find a valid id".to_string()],
            conversation_id,
        ))),
        Err(e) => {
            error!("Failed to update feedback: {}", e);
            Err(Json(StandardErrorResponse::new(
                format!("Failed to update feedback: {}", e),
                "FEEDBACK_ERROR".to_string(),
                vec!["Feedback must be positive, negative or neutral".to_string()],
                conversation_id,
            )))
        }
    }
}

pub async fn feedback_stats_handler(
    db_config: &State<DatabaseConfig>,
) -> Result<Json<DataResponse<crate::database::FeedbackStats>>, Json<StandardErrorResponse>> {
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

    match GeneratedPostRepository::new(pool).feedback_stats().await {
        Ok(Some(stats)) => Ok(Json(DataResponse::success(
            "Feedback statistics computed".to_string(),
            stats,
            None,
        ))),
        Ok(None) => Err(Json(StandardErrorResponse::new(
            "No generated posts recorded yet".to_string(),
            "INSUFFICIENT_DATA".to_string(),
            vec!["Save a generated post first with POST /api/feedback".to_string()],
            None,
        ))),
        Err(e) => {
            error!("Failed to compute feedback stats: {}", e);
            Err(Json(StandardErrorResponse::new(
                "Failed to compute feedback statistics".to_string(),
                "DATABASE_ERROR".to_string(),
                vec!["Try again in a few moments".to_string()],
                None,
            )))
        }
    }
}

pub async fn schedule_post_handler(
    request: Json<StandardRequest<ScheduleRequest>>,
    db_config: &State<DatabaseConfig>,
) -> Result<Json<ActionResponse>, Json<StandardErrorResponse>> {
    let conversation_id = request.conversation_id();
    let params = &request.data;

    if crate::store::parse_timestamp(&params.scheduled_time).is_none() {
        return Err(Json(StandardErrorResponse::new(
            format!("Unparseable scheduled_time: {}", params.scheduled_time),
            "INVALID_TIMESTAMP".to_string(),
            vec!["Use a format like 2024-02-01T09:00".to_string()],
            conversation_id,
        )));
    }

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

    let repo = GeneratedPostRepository::new(pool);
    match repo.schedule(params.post_id, &params.scheduled_time).await {
        Ok(true) => Ok(Json(ActionResponse::success(
            format!(
                "Post {} scheduled for {}",
                params.post_id, params.scheduled_time
            ),
            "scheduled".to_string(),
            conversation_id,
        ))),
        Ok(false) => Err(Json(StandardErrorResponse::new(
            format!("No generated post with id {}", params.post_id),
            "POST_NOT_FOUND".to_string(),
            vec!["List generated posts to find a valid id".to_string()],
            conversation_id,
        ))),
        Err(e) => {
            error!("Failed to schedule post: {}", e);
            Err(Json(StandardErrorResponse::new(
                "Failed to schedule post".to_string(),
                "DATABASE_ERROR".to_string(),
                vec!["Try again in a few moments".to_string()],
                conversation_id,
            )))
        }
    }
}

pub async fn list_scheduled_handler(
    db_config: &State<DatabaseConfig>,
) -> Result<Json<DataResponse<Vec<GeneratedPost>>>, Json<StandardErrorResponse>> {
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

    match GeneratedPostRepository::new(pool).list_scheduled().await {
        Ok(posts) => Ok(Json(DataResponse::success(
            format!("Found {} scheduled posts", posts.len()),
            posts,
            None,
        ))),
        Err(e) => {
            error!("Failed to list scheduled posts: {}", e);
            Err(Json(StandardErrorResponse::new(
                "Failed to list scheduled posts".to_string(),
                "DATABASE_ERROR".to_string(),
                vec!["Try again in a few moments".to_string()],
                None,
            )))
        }
    }
}
