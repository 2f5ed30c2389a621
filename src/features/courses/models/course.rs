use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Database model for a course, as seen from the category side.
///
/// Course authoring lives in a separate service; this model only carries
/// what category listings need.
#[derive(Debug, Clone, FromRow)]
pub struct Course {
    pub id: Uuid,
    pub category_id: Uuid,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
