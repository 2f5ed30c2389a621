use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::categories::dtos::CategoryCoursesQuery;
use crate::features::courses::dtos::CourseResponseDto;
use crate::features::courses::models::Course;

/// Service answering "courses directly tagged with category X" queries.
///
/// Only the direct association is consulted; rolling up descendant
/// categories is left to callers composing this with the category tree.
pub struct CourseService {
    pool: PgPool,
}

impl CourseService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// List courses associated with the given category, with optional
    /// publication-status filtering and pagination.
    pub async fn list_by_category(
        &self,
        category_id: Uuid,
        query: &CategoryCoursesQuery,
    ) -> Result<Vec<CourseResponseDto>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "SELECT id, category_id, title, slug, description, is_published, \
             created_at, updated_at FROM courses WHERE category_id = ",
        );
        builder.push_bind(category_id);

        if let Some(is_published) = query.is_published {
            builder.push(" AND is_published = ");
            builder.push_bind(is_published);
        }

        builder.push(" ORDER BY created_at DESC, id");
        builder.push(" LIMIT ");
        builder.push_bind(query.limit());
        builder.push(" OFFSET ");
        builder.push_bind(query.offset());

        let courses = builder
            .build_query_as::<Course>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to list courses for category {}: {:?}", category_id, e);
                AppError::Database(e)
            })?;

        Ok(courses.into_iter().map(|c| c.into()).collect())
    }
}
