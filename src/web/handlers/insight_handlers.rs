// src/web/handlers/insight_handlers.rs
use crate::analyzer::{AnalysisError, AnalyzerConfig, EngagementAnalyzer, TimeGranularity};
use crate::database::{DatabaseConfig, PostRepository};
use crate::presenter::{InsightPresenter, InsightView};
use crate::store::PostStore;
use crate::web::types::{DataResponse, StandardErrorResponse};

use rocket::serde::json::Json;
use rocket::State;
use tracing::{error, info};

pub async fn get_insights_handler(
    granularity: Option<String>,
    top_k: Option<usize>,
    min_samples: Option<usize>,
    db_config: &State<DatabaseConfig>,
) -> Result<Json<DataResponse<InsightView>>, Json<StandardErrorResponse>> {
    let mut config = AnalyzerConfig::default();

    if let Some(g) = granularity {
        match g.parse::<TimeGranularity>() {
            Ok(granularity) => config = config.with_time_granularity(granularity),
            Err(_) => {
                return Err(Json(StandardErrorResponse::new(
                    format!("Unknown time granularity: {}", g),
                    "INVALID_GRANULARITY".to_string(),
                    vec!["Use one of: hour, weekday, hour_and_weekday".to_string()],
                    None,
                )));
            }
        }
    }
    if let Some(k) = top_k {
        config = config.with_top_k(k);
    }
    if let Some(m) = min_samples {
        config = config.with_min_samples(m);
    }

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

    let stored = match PostRepository::new(pool).list_all().await {
        Ok(stored) => stored,
        Err(e) => {
            error!("Failed to load posts: {}", e);
            return Err(Json(StandardErrorResponse::new(
                "Failed to load posts".to_string(),
                "DATABASE_ERROR".to_string(),
                vec!["Try again in a few moments".to_string()],
                None,
            )));
        }
    };

    let store = PostStore::from_posts(stored.iter().map(|row| row.to_post()).collect());

    let analyzer = EngagementAnalyzer::new(config);
    let report = match analyzer.analyze(&store) {
        Ok(report) => report,
        Err(AnalysisError::InsufficientData) => {
            return Err(Json(StandardErrorResponse::new(
                "No posts available for analysis".to_string(),
                "INSUFFICIENT_DATA".to_string(),
                vec!["Scrape a profile first with POST /api/scrape".to_string()],
                None,
            )));
        }
        Err(AnalysisError::InvalidConfig(msg)) => {
            return Err(Json(StandardErrorResponse::new(
                msg,
                "INVALID_CONFIG".to_string(),
                vec!["Check the query parameters".to_string()],
                None,
            )));
        }
    };

    info!("Analyzed {} posts", report.analyzed_posts);

    let view = InsightPresenter::present(&report);

    Ok(Json(DataResponse::success(
        "Engagement insights computed".to_string(),
        view,
        None,
    )))
}
