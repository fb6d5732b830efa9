// src/web/mod.rs
pub mod handlers;
pub mod types;

pub use handlers::*;
pub use types::*;

use crate::database::DatabaseConfig;
use crate::generator::GenerationClient;
use crate::scraper::ProfileScraper;
use anyhow::Result;
use rocket::fairing::{Fairing, Info, Kind};
use rocket::http::{Header, Status};
use rocket::serde::json::Json;
use rocket::{catchers, get, options, post, routes, Request, Response, State};
use std::path::PathBuf;
use tracing::{error, info};

// CORS Fairing
pub struct Cors;

#[rocket::async_trait]
impl Fairing for Cors {
    fn info(&self) -> Info {
        Info {
            name: "Add CORS headers to responses",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, _request: &'r Request<'_>, response: &mut Response<'r>) {
        response.set_header(Header::new("Access-Control-Allow-Origin", "*"));
        response.set_header(Header::new(
            "Access-Control-Allow-Methods",
            "POST, GET, PATCH, OPTIONS",
        ));
        response.set_header(Header::new("Access-Control-Allow-Headers", "*"));
        response.set_header(Header::new("Access-Control-Allow-Credentials", "true"));
    }
}

#[post("/scrape", data = "<request>")]
pub async fn scrape_profile(
    request: Json<StandardRequest<ScrapeRequest>>,
    scraper: &State<ProfileScraper>,
    db_config: &State<DatabaseConfig>,
) -> Result<Json<DataResponse<ScrapeSummary>>, Json<StandardErrorResponse>> {
    handlers::scrape_profile_handler(request, scraper, db_config).await
}

#[get("/profiles")]
pub async fn list_profiles(
    db_config: &State<DatabaseConfig>,
) -> Result<Json<DataResponse<Vec<crate::database::ProfileRecord>>>, Json<StandardErrorResponse>> {
    handlers::list_profiles_handler(db_config).await
}

#[get("/insights?<granularity>&<top_k>&<min_samples>")]
pub async fn get_insights(
    granularity: Option<String>,
    top_k: Option<usize>,
    min_samples: Option<usize>,
    db_config: &State<DatabaseConfig>,
) -> Result<Json<DataResponse<crate::presenter::InsightView>>, Json<StandardErrorResponse>> {
    handlers::get_insights_handler(granularity, top_k, min_samples, db_config).await
}

#[post("/generate", data = "<request>")]
pub async fn generate_posts(
    request: Json<StandardRequest<GeneratePostsRequest>>,
    client: &State<GenerationClient>,
    db_config: &State<DatabaseConfig>,
) -> Result<Json<DataResponse<GeneratedVariantsData>>, Json<StandardErrorResponse>> {
    handlers::generate_posts_handler(request, client, db_config).await
}

#[post("/hashtags", data = "<request>")]
pub async fn suggest_hashtags(
    request: Json<StandardRequest<SuggestHashtagsRequest>>,
    client: &State<GenerationClient>,
) -> Result<Json<DataResponse<HashtagSuggestions>>, Json<StandardErrorResponse>> {
    handlers::suggest_hashtags_handler(request, client).await
}

#[post("/feedback", data = "<request>")]
pub async fn save_generated_post(
    request: Json<StandardRequest<SaveGeneratedPostRequest>>,
    db_config: &State<DatabaseConfig>,
) -> Result<Json<ActionResponse>, Json<StandardErrorResponse>> {
    handlers::save_generated_post_handler(request, db_config).await
}

#[post("/feedback/update", data = "<request>")]
pub async fn update_feedback(
    request: Json<StandardRequest<FeedbackUpdateRequest>>,
    db_config: &State<DatabaseConfig>,
) -> Result<Json<ActionResponse>, Json<StandardErrorResponse>> {
    handlers::update_feedback_handler(request, db_config).await
}

#[get("/feedback/stats")]
pub async fn feedback_stats(
    db_config: &State<DatabaseConfig>,
) -> Result<Json<DataResponse<crate::database::FeedbackStats>>, Json<StandardErrorResponse>> {
    handlers::feedback_stats_handler(db_config).await
}

#[post("/schedule", data = "<request>")]
pub async fn schedule_post(
    request: Json<StandardRequest<ScheduleRequest>>,
    db_config: &State<DatabaseConfig>,
) -> Result<Json<ActionResponse>, Json<StandardErrorResponse>> {
    handlers::schedule_post_handler(request, db_config).await
}

#[get("/scheduled")]
pub async fn list_scheduled(
    db_config: &State<DatabaseConfig>,
) -> Result<Json<DataResponse<Vec<crate::database::GeneratedPost>>>, Json<StandardErrorResponse>> {
    handlers::list_scheduled_handler(db_config).await
}

#[get("/health")]
pub async fn health() -> Json<TextResponse> {
    Json(TextResponse::success("Service is healthy".to_string(), None))
}

#[options("/<_..>")]
pub async fn options() -> Status {
    Status::Ok
}

// Error catchers
#[rocket::catch(400)]
pub fn bad_request() -> Json<StandardErrorResponse> {
    Json(StandardErrorResponse::new(
        "Invalid request format".to_string(),
        "BAD_REQUEST".to_string(),
        vec![
            "Check your request JSON format".to_string(),
            "Verify all required fields are present".to_string(),
        ],
        None,
    ))
}

#[rocket::catch(500)]
pub fn internal_error() -> Json<StandardErrorResponse> {
    Json(StandardErrorResponse::new(
        "Internal server error".to_string(),
        "INTERNAL_ERROR".to_string(),
        vec![
            "Try again in a few moments".to_string(),
            "Contact support if the problem persists".to_string(),
        ],
        None,
    ))
}

// Main server start function
pub async fn start_web_server(
    database_path: PathBuf,
    port: u16,
    generation_url: String,
    request_timeout_seconds: u64,
) -> Result<()> {
    let mut db_config = DatabaseConfig::new(database_path);

    if let Err(e) = db_config.init_pool().await {
        error!("Failed to initialize database: {}", e);
        return Err(e);
    }

    if let Err(e) = db_config.migrate().await {
        error!("Failed to run database migrations: {}", e);
        return Err(e);
    }

    let scraper = ProfileScraper::new()?;
    let generation_client = GenerationClient::new(generation_url, request_timeout_seconds)?;

    info!("Starting content assistant API server");
    info!("Database: {}", db_config.database_path.display());
    info!("Server: http://0.0.0.0:{}", port);

    let figment = rocket::Config::figment()
        .merge(("port", port))
        .merge(("address", "0.0.0.0"));

    let _rocket = rocket::custom(figment)
        .attach(Cors)
        .manage(db_config)
        .manage(scraper)
        .manage(generation_client)
        .register("/api", catchers![bad_request, internal_error])
        .mount(
            "/api",
            routes![
                scrape_profile,
                list_profiles,
                get_insights,
                generate_posts,
                suggest_hashtags,
                save_generated_post,
                update_feedback,
                feedback_stats,
                schedule_post,
                list_scheduled,
                health,
                options,
            ],
        )
        .launch()
        .await;

    Ok(())
}
