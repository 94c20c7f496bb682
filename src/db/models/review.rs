//! Review and reply models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Review {
    pub id: String,
    pub booking_id: String,
    pub property_id: String,
    pub user_id: String,
    pub rating: i64,
    pub comment: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ReviewReply {
    pub id: String,
    pub review_id: String,
    pub tenant_id: String,
    pub comment: String,
    pub created_at: String,
}

/// Review with author name and the tenant reply, for the public listing
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ReviewWithReply {
    pub id: String,
    pub booking_id: String,
    pub property_id: String,
    pub user_id: String,
    pub rating: i64,
    pub comment: Option<String>,
    pub created_at: String,
    pub reviewer_name: String,
    pub reply_comment: Option<String>,
    pub reply_created_at: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PropertyReviews {
    pub average_rating: Option<f64>,
    pub review_count: i64,
    pub reviews: Vec<ReviewWithReply>,
}

#[derive(Debug, Deserialize)]
pub struct CreateReviewRequest {
    pub booking_id: String,
    pub rating: i64,
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateReplyRequest {
    pub comment: String,
}
