use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Database model for a course category.
///
/// Categories form a parent-pointer forest: `parent_category_id` is
/// `None` for roots. A non-null `deleted_at` marks the row soft-deleted;
/// soft-deleted rows are excluded from every read unless explicitly
/// requested. `course_count` is a denormalized cache maintained by the
/// course ingestion pipeline and is never recomputed here.
#[derive(Debug, Clone, FromRow)]
pub struct Category {
    pub id: Uuid,
    pub parent_category_id: Option<Uuid>,
    pub name: String,
    pub slug: String,
    pub display_order: i32,
    pub is_active: bool,
    pub is_featured: bool,
    pub icon_url: Option<String>,
    pub image_url: Option<String>,
    pub color: Option<String>,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub meta_keywords: Option<String>,
    pub course_count: i32,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
