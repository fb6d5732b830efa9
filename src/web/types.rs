// src/web/types.rs
use rocket::serde::{Deserialize, Serialize};

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct TextResponse {
    #[serde(rename = "type")]
    pub response_type: ResponseType,
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct DataResponse<T> {
    #[serde(rename = "type")]
    pub response_type: ResponseType,
    pub success: bool,
    pub message: String,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct ActionResponse {
    #[serde(rename = "type")]
    pub response_type: ResponseType,
    pub success: bool,
    pub message: String,
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct StandardErrorResponse {
    #[serde(rename = "type")]
    pub response_type: ResponseType,
    pub success: bool,
    pub error: String,
    pub error_code: String,
    pub suggestions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde", rename_all = "lowercase")]
pub enum ResponseType {
    Text,
    Data,
    Action,
    Error,
}

// Request wrapper with conversation_id support
#[derive(Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct StandardRequest<T> {
    #[serde(flatten)]
    pub data: T,
    pub conversation_id: Option<String>,
}

pub trait WithConversationId {
    fn conversation_id(&self) -> Option<String>;
}

impl<T> WithConversationId for StandardRequest<T> {
    fn conversation_id(&self) -> Option<String> {
        self.conversation_id.clone()
    }
}

impl TextResponse {
    pub fn success(message: String, conversation_id: Option<String>) -> Self {
        Self {
            response_type: ResponseType::Text,
            success: true,
            message,
            conversation_id,
        }
    }
}

impl<T> DataResponse<T> {
    pub fn success(message: String, data: T, conversation_id: Option<String>) -> Self {
        Self {
            response_type: ResponseType::Data,
            success: true,
            message,
            data,
            conversation_id,
        }
    }
}

impl ActionResponse {
    pub fn success(message: String, action: String, conversation_id: Option<String>) -> Self {
        Self {
            response_type: ResponseType::Action,
            success: true,
            message,
            action,
            conversation_id,
        }
    }
}

impl StandardErrorResponse {
    pub fn new(
        error: String,
        error_code: String,
        suggestions: Vec<String>,
        conversation_id: Option<String>,
    ) -> Self {
        Self {
            response_type: ResponseType::Error,
            success: false,
            error,
            error_code,
            suggestions,
            conversation_id,
        }
    }
}

// Request payloads

#[derive(Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct ScrapeRequest {
    pub profile_url: String,
}

#[derive(Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct GeneratePostsRequest {
    pub topic: String,
    pub tone: Option<String>,
    pub max_length: Option<u32>,
    pub call_to_action: Option<bool>,
    pub hashtags: Option<bool>,
    pub num_hashtags: Option<u32>,
    pub variation_count: Option<u32>,
    pub use_insights: Option<bool>,
}

#[derive(Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct SuggestHashtagsRequest {
    pub topic: String,
    pub count: Option<u32>,
}

#[derive(Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct SaveGeneratedPostRequest {
    pub content: String,
    pub topic: String,
    pub tone: String,
    pub include_cta: Option<bool>,
    pub include_hashtags: Option<bool>,
    pub feedback: Option<String>,
}

#[derive(Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct FeedbackUpdateRequest {
    pub post_id: i64,
    pub feedback: String,
}

#[derive(Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct ScheduleRequest {
    pub post_id: i64,
    pub scheduled_time: String,
}

// Response payloads

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct ScrapeSummary {
    pub profile_url: String,
    pub username: String,
    pub name: String,
    pub posts_stored: usize,
    pub posts_skipped: usize,
    pub avg_engagement: f64,
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct HashtagSuggestions {
    pub topic: String,
    pub hashtags: Vec<String>,
    pub fallback: bool,
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct GeneratedVariantsData {
    pub topic: String,
    pub tone: String,
    pub variants: Vec<crate::generator::GeneratedVariant>,
    pub fallback: bool,
}
