use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::categories::dtos::{
    CategoryCoursesQuery, CategoryResponseDto, CategoryTreeDto, CreateCategoryDto,
    ListCategoriesQuery, ParentFilter, UpdateCategoryDto,
};
use crate::features::categories::models::Category;
use crate::features::courses::dtos::CourseResponseDto;
use crate::features::courses::CourseService;
use crate::shared::validation::{next_available_slug, slugify};

const CATEGORY_COLUMNS: &str = "id, parent_category_id, name, slug, display_order, is_active, \
     is_featured, icon_url, image_url, color, meta_title, meta_description, meta_keywords, \
     course_count, deleted_at, created_at, updated_at";

/// Service for category operations with tree-consistency guarantees.
///
/// Writes run their validation reads and the write inside one
/// transaction. The partial unique index on `slug` is the authoritative
/// uniqueness guard; the in-application pre-checks only exist to produce
/// a friendlier error than the raw constraint violation.
///
/// Two concurrent re-parent operations that would jointly create a cycle
/// (each validated against the other's pre-update state) are not closed
/// here; that race needs at least snapshot isolation at the store.
pub struct CategoryService {
    pool: PgPool,
    course_service: Arc<CourseService>,
}

impl CategoryService {
    pub fn new(pool: PgPool, course_service: Arc<CourseService>) -> Self {
        Self {
            pool,
            course_service,
        }
    }

    /// Create a category. The slug is derived from the name when omitted,
    /// taking a numeric suffix on collision; an explicit slug must be free
    /// among non-deleted rows. A supplied parent must be a live category.
    pub async fn create(&self, dto: CreateCategoryDto) -> Result<CategoryResponseDto> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        if let Some(parent_id) = dto.parent_category_id {
            let parent_exists = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM categories WHERE id = $1 AND deleted_at IS NULL)",
            )
            .bind(parent_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                tracing::error!("Failed to check parent category: {:?}", e);
                AppError::Database(e)
            })?;

            if !parent_exists {
                return Err(AppError::NotFound(format!(
                    "Parent category '{}' not found",
                    parent_id
                )));
            }
        }

        let slug = match &dto.slug {
            Some(slug) => {
                let taken = sqlx::query_scalar::<_, bool>(
                    "SELECT EXISTS(SELECT 1 FROM categories WHERE slug = $1 AND deleted_at IS NULL)",
                )
                .bind(slug)
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| {
                    tracing::error!("Failed to check slug uniqueness: {:?}", e);
                    AppError::Database(e)
                })?;

                if taken {
                    return Err(AppError::Validation(format!(
                        "Slug '{}' is already in use",
                        slug
                    )));
                }
                slug.clone()
            }
            None => {
                let base = slugify(&dto.name);
                if base.is_empty() {
                    return Err(AppError::Validation(format!(
                        "Cannot derive a slug from name '{}'; provide one explicitly",
                        dto.name
                    )));
                }

                let existing = sqlx::query_scalar::<_, String>(
                    "SELECT slug FROM categories \
                     WHERE deleted_at IS NULL AND (slug = $1 OR slug LIKE $2)",
                )
                .bind(&base)
                .bind(format!("{}-%", base))
                .fetch_all(&mut *tx)
                .await
                .map_err(|e| {
                    tracing::error!("Failed to load existing slugs: {:?}", e);
                    AppError::Database(e)
                })?;

                let taken: HashSet<String> = existing.into_iter().collect();
                next_available_slug(&base, &taken)
            }
        };

        let sql = format!(
            "INSERT INTO categories ( \
                 parent_category_id, name, slug, display_order, is_active, is_featured, \
                 icon_url, image_url, color, meta_title, meta_description, meta_keywords \
             ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
             RETURNING {}",
            CATEGORY_COLUMNS
        );
        let category = sqlx::query_as::<_, Category>(&sql)
            .bind(dto.parent_category_id)
            .bind(&dto.name)
            .bind(&slug)
            .bind(dto.display_order.unwrap_or(0))
            .bind(dto.is_active.unwrap_or(true))
            .bind(dto.is_featured.unwrap_or(false))
            .bind(&dto.icon_url)
            .bind(&dto.image_url)
            .bind(&dto.color)
            .bind(&dto.meta_title)
            .bind(&dto.meta_description)
            .bind(&dto.meta_keywords)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| Self::map_slug_conflict(e, &slug))?;

        tx.commit().await.map_err(AppError::Database)?;

        tracing::info!("Category created: id={}, slug={}", category.id, category.slug);

        Ok(category.into())
    }

    /// Get a non-deleted category by id
    pub async fn get_by_id(&self, id: Uuid) -> Result<CategoryResponseDto> {
        let sql = format!(
            "SELECT {} FROM categories WHERE id = $1 AND deleted_at IS NULL",
            CATEGORY_COLUMNS
        );
        let category = sqlx::query_as::<_, Category>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to get category by id: {:?}", e);
                AppError::Database(e)
            })?;

        category
            .map(|c| c.into())
            .ok_or_else(|| AppError::NotFound(format!("Category '{}' not found", id)))
    }

    /// Get a non-deleted category by slug
    pub async fn get_by_slug(&self, slug: &str) -> Result<CategoryResponseDto> {
        let sql = format!(
            "SELECT {} FROM categories WHERE slug = $1 AND deleted_at IS NULL",
            CATEGORY_COLUMNS
        );
        let category = sqlx::query_as::<_, Category>(&sql)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to get category by slug: {:?}", e);
                AppError::Database(e)
            })?;

        category
            .map(|c| c.into())
            .ok_or_else(|| AppError::NotFound(format!("Category '{}' not found", slug)))
    }

    /// Flat listing with optional active/featured/parent filters.
    /// Omitted filters impose no constraint; soft-deleted rows never appear.
    pub async fn list(&self, query: &ListCategoriesQuery) -> Result<Vec<CategoryResponseDto>> {
        let parent_filter = query.parent_filter().map_err(AppError::BadRequest)?;

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {} FROM categories WHERE deleted_at IS NULL",
            CATEGORY_COLUMNS
        ));

        if let Some(is_active) = query.is_active {
            builder.push(" AND is_active = ");
            builder.push_bind(is_active);
        }
        if let Some(is_featured) = query.is_featured {
            builder.push(" AND is_featured = ");
            builder.push_bind(is_featured);
        }
        match parent_filter {
            ParentFilter::Any => {}
            ParentFilter::Root => {
                builder.push(" AND parent_category_id IS NULL");
            }
            ParentFilter::Of(parent_id) => {
                builder.push(" AND parent_category_id = ");
                builder.push_bind(parent_id);
            }
        }

        builder.push(" ORDER BY parent_category_id, display_order, id");

        let categories = builder
            .build_query_as::<Category>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to list categories: {:?}", e);
                AppError::Database(e)
            })?;

        Ok(categories.into_iter().map(|c| c.into()).collect())
    }

    /// Reconstruct the category forest from one bulk read.
    /// No per-node queries; orphaned rows surface as extra roots.
    pub async fn list_tree(&self) -> Result<Vec<CategoryTreeDto>> {
        let sql = format!(
            "SELECT {} FROM categories WHERE deleted_at IS NULL ORDER BY display_order, id",
            CATEGORY_COLUMNS
        );
        let categories = sqlx::query_as::<_, Category>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to load categories for tree: {:?}", e);
                AppError::Database(e)
            })?;

        Ok(CategoryTreeDto::build_tree(categories))
    }

    /// Partially update a category. A changed parent is validated against
    /// the committed graph: the proposed parent must be live, and walking
    /// its ancestor chain must not reach the category being updated.
    pub async fn update(&self, id: Uuid, dto: UpdateCategoryDto) -> Result<CategoryResponseDto> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        let sql = format!(
            "SELECT {} FROM categories WHERE id = $1 AND deleted_at IS NULL",
            CATEGORY_COLUMNS
        );
        let current = sqlx::query_as::<_, Category>(&sql)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| {
                tracing::error!("Failed to load category for update: {:?}", e);
                AppError::Database(e)
            })?
            .ok_or_else(|| AppError::NotFound(format!("Category '{}' not found", id)))?;

        if let Some(Some(new_parent)) = dto.parent_category_id {
            if new_parent == id {
                return Err(AppError::Cycle(
                    "A category cannot be its own parent".to_string(),
                ));
            }

            let parent_exists = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM categories WHERE id = $1 AND deleted_at IS NULL)",
            )
            .bind(new_parent)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                tracing::error!("Failed to check new parent category: {:?}", e);
                AppError::Database(e)
            })?;

            if !parent_exists {
                return Err(AppError::NotFound(format!(
                    "Parent category '{}' not found",
                    new_parent
                )));
            }

            let rows = sqlx::query_as::<_, (Uuid, Option<Uuid>)>(
                "SELECT id, parent_category_id FROM categories WHERE deleted_at IS NULL",
            )
            .fetch_all(&mut *tx)
            .await
            .map_err(|e| {
                tracing::error!("Failed to load parent graph: {:?}", e);
                AppError::Database(e)
            })?;

            let parents: HashMap<Uuid, Option<Uuid>> = rows.into_iter().collect();
            if ancestor_chain_contains(new_parent, id, &parents) {
                return Err(AppError::Cycle(format!(
                    "Moving category '{}' under '{}' would create a cycle",
                    id, new_parent
                )));
            }
        }

        if let Some(new_slug) = &dto.slug {
            if *new_slug != current.slug {
                let taken = sqlx::query_scalar::<_, bool>(
                    "SELECT EXISTS(SELECT 1 FROM categories \
                     WHERE slug = $1 AND deleted_at IS NULL AND id <> $2)",
                )
                .bind(new_slug)
                .bind(id)
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| {
                    tracing::error!("Failed to check slug uniqueness: {:?}", e);
                    AppError::Database(e)
                })?;

                if taken {
                    return Err(AppError::Validation(format!(
                        "Slug '{}' is already in use",
                        new_slug
                    )));
                }
            }
        }

        let slug = dto.slug.unwrap_or(current.slug);
        let parent_category_id = match dto.parent_category_id {
            Some(parent) => parent,
            None => current.parent_category_id,
        };

        let sql = format!(
            "UPDATE categories SET \
                 name = $1, slug = $2, parent_category_id = $3, display_order = $4, \
                 is_active = $5, is_featured = $6, icon_url = $7, image_url = $8, \
                 color = $9, meta_title = $10, meta_description = $11, meta_keywords = $12, \
                 updated_at = NOW() \
             WHERE id = $13 AND deleted_at IS NULL \
             RETURNING {}",
            CATEGORY_COLUMNS
        );
        let updated = sqlx::query_as::<_, Category>(&sql)
            .bind(dto.name.unwrap_or(current.name))
            .bind(&slug)
            .bind(parent_category_id)
            .bind(dto.display_order.unwrap_or(current.display_order))
            .bind(dto.is_active.unwrap_or(current.is_active))
            .bind(dto.is_featured.unwrap_or(current.is_featured))
            .bind(dto.icon_url.unwrap_or(current.icon_url))
            .bind(dto.image_url.unwrap_or(current.image_url))
            .bind(dto.color.unwrap_or(current.color))
            .bind(dto.meta_title.unwrap_or(current.meta_title))
            .bind(dto.meta_description.unwrap_or(current.meta_description))
            .bind(dto.meta_keywords.unwrap_or(current.meta_keywords))
            .bind(id)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| Self::map_slug_conflict(e, &slug))?;

        tx.commit().await.map_err(AppError::Database)?;

        tracing::info!("Category updated: id={}, slug={}", updated.id, updated.slug);

        Ok(updated.into())
    }

    /// Soft-delete a category. Children and course associations are left
    /// untouched; children of a deleted parent surface as roots in the
    /// next tree rebuild.
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let deleted = sqlx::query_scalar::<_, Uuid>(
            "UPDATE categories SET deleted_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL RETURNING id",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete category: {:?}", e);
            AppError::Database(e)
        })?;

        if deleted.is_none() {
            return Err(AppError::NotFound(format!("Category '{}' not found", id)));
        }

        tracing::info!("Category soft-deleted: id={}", id);

        Ok(())
    }

    /// List courses directly tagged with the given category.
    /// Descendant categories are not rolled up.
    pub async fn list_courses(
        &self,
        id: Uuid,
        query: &CategoryCoursesQuery,
    ) -> Result<Vec<CourseResponseDto>> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM categories WHERE id = $1 AND deleted_at IS NULL)",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to check category: {:?}", e);
            AppError::Database(e)
        })?;

        if !exists {
            return Err(AppError::NotFound(format!("Category '{}' not found", id)));
        }

        self.course_service.list_by_category(id, query).await
    }

    /// Translate a unique-index violation on the slug into the same
    /// validation error the pre-check produces; the index is the
    /// authoritative guard against concurrent writers.
    fn map_slug_conflict(err: sqlx::Error, slug: &str) -> AppError {
        if is_unique_violation(&err) {
            return AppError::Validation(format!("Slug '{}' is already in use", slug));
        }
        tracing::error!("Failed to write category: {:?}", err);
        AppError::Database(err)
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => matches!(db.kind(), sqlx::error::ErrorKind::UniqueViolation),
        _ => false,
    }
}

/// Walk the parent chain from `start` and report whether `target`
/// appears in it. The walk is capped at the node count so a transiently
/// cyclic graph cannot loop forever.
fn ancestor_chain_contains(
    start: Uuid,
    target: Uuid,
    parents: &HashMap<Uuid, Option<Uuid>>,
) -> bool {
    let cap = parents.len();
    let mut current = Some(start);
    let mut hops = 0usize;

    while let Some(id) = current {
        if id == target {
            return true;
        }
        if hops >= cap {
            break;
        }
        hops += 1;
        current = parents.get(&id).copied().flatten();
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(pairs: &[(Uuid, Option<Uuid>)]) -> HashMap<Uuid, Option<Uuid>> {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_ancestor_chain_detects_target() {
        // grandparent -> parent -> child
        let grandparent = Uuid::new_v4();
        let parent = Uuid::new_v4();
        let child = Uuid::new_v4();
        let parents = chain(&[
            (grandparent, None),
            (parent, Some(grandparent)),
            (child, Some(parent)),
        ]);

        // Re-parenting grandparent under child: child's chain contains grandparent
        assert!(ancestor_chain_contains(child, grandparent, &parents));
        assert!(ancestor_chain_contains(parent, grandparent, &parents));
    }

    #[test]
    fn test_ancestor_chain_clean_for_sibling_move() {
        let root = Uuid::new_v4();
        let left = Uuid::new_v4();
        let right = Uuid::new_v4();
        let parents = chain(&[(root, None), (left, Some(root)), (right, Some(root))]);

        // Moving left under right is fine: right's chain is right -> root
        assert!(!ancestor_chain_contains(right, left, &parents));
    }

    #[test]
    fn test_ancestor_chain_start_is_target() {
        // Covers the self-parenting case
        let id = Uuid::new_v4();
        let parents = chain(&[(id, None)]);
        assert!(ancestor_chain_contains(id, id, &parents));
    }

    #[test]
    fn test_ancestor_chain_terminates_on_cyclic_graph() {
        // a <-> b can only exist mid-race; the walk must still terminate
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let unrelated = Uuid::new_v4();
        let parents = chain(&[(a, Some(b)), (b, Some(a)), (unrelated, None)]);

        assert!(!ancestor_chain_contains(a, unrelated, &parents));
        assert!(ancestor_chain_contains(a, b, &parents));
    }
}
