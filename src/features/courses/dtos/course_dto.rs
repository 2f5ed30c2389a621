use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::features::courses::models::Course;

/// Response DTO for a course in a category listing
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CourseResponseDto {
    pub id: Uuid,
    pub category_id: Uuid,
    pub title: String,
    pub slug: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Course> for CourseResponseDto {
    fn from(c: Course) -> Self {
        Self {
            id: c.id,
            category_id: c.category_id,
            title: c.title,
            slug: c.slug,
            description: c.description,
            is_published: c.is_published,
            created_at: c.created_at,
        }
    }
}
