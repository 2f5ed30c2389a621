use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::core::extractor::AppJson;
use crate::features::categories::dtos::{
    CategoryCoursesQuery, CategoryResponseDto, CategoryTreeDto, CreateCategoryDto,
    ListCategoriesQuery, UpdateCategoryDto,
};
use crate::features::categories::services::CategoryService;
use crate::features::courses::dtos::CourseResponseDto;
use crate::shared::types::ApiResponse;

/// List categories (flat)
///
/// Omitted filters impose no constraint. Pass `parentId=null` to select
/// root categories only.
#[utoipa::path(
    get,
    path = "/api/categories",
    params(ListCategoriesQuery),
    responses(
        (status = 200, description = "List of categories", body = ApiResponse<Vec<CategoryResponseDto>>),
        (status = 400, description = "Invalid filter")
    ),
    tag = "categories"
)]
pub async fn list_categories(
    State(service): State<Arc<CategoryService>>,
    Query(query): Query<ListCategoriesQuery>,
) -> Result<Json<ApiResponse<Vec<CategoryResponseDto>>>> {
    let categories = service.list(&query).await?;
    Ok(Json(ApiResponse::success(Some(categories), None, None)))
}

/// Get the reconstructed category tree
///
/// Returns the forest of non-deleted categories; children are ordered by
/// display order.
#[utoipa::path(
    get,
    path = "/api/categories/tree",
    responses(
        (status = 200, description = "Category tree", body = ApiResponse<Vec<CategoryTreeDto>>),
    ),
    tag = "categories"
)]
pub async fn get_category_tree(
    State(service): State<Arc<CategoryService>>,
) -> Result<Json<ApiResponse<Vec<CategoryTreeDto>>>> {
    let tree = service.list_tree().await?;
    Ok(Json(ApiResponse::success(Some(tree), None, None)))
}

/// Get category by id
#[utoipa::path(
    get,
    path = "/api/categories/{id}",
    params(
        ("id" = Uuid, Path, description = "Category id")
    ),
    responses(
        (status = 200, description = "Category found", body = ApiResponse<CategoryResponseDto>),
        (status = 404, description = "Category not found")
    ),
    tag = "categories"
)]
pub async fn get_category_by_id(
    State(service): State<Arc<CategoryService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<CategoryResponseDto>>> {
    let category = service.get_by_id(id).await?;
    Ok(Json(ApiResponse::success(Some(category), None, None)))
}

/// Get category by slug
#[utoipa::path(
    get,
    path = "/api/categories/slug/{slug}",
    params(
        ("slug" = String, Path, description = "Category slug")
    ),
    responses(
        (status = 200, description = "Category found", body = ApiResponse<CategoryResponseDto>),
        (status = 404, description = "Category not found")
    ),
    tag = "categories"
)]
pub async fn get_category_by_slug(
    State(service): State<Arc<CategoryService>>,
    Path(slug): Path<String>,
) -> Result<Json<ApiResponse<CategoryResponseDto>>> {
    let category = service.get_by_slug(&slug).await?;
    Ok(Json(ApiResponse::success(Some(category), None, None)))
}

/// Create a category
#[utoipa::path(
    post,
    path = "/api/categories",
    request_body = CreateCategoryDto,
    responses(
        (status = 201, description = "Category created", body = ApiResponse<CategoryResponseDto>),
        (status = 400, description = "Validation error or duplicate slug"),
        (status = 404, description = "Parent category not found")
    ),
    tag = "categories"
)]
pub async fn create_category(
    State(service): State<Arc<CategoryService>>,
    AppJson(dto): AppJson<CreateCategoryDto>,
) -> Result<(StatusCode, Json<ApiResponse<CategoryResponseDto>>)> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let category = service.create(dto).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(Some(category), None, None)),
    ))
}

/// Update a category
///
/// Partial update; absent fields are left unchanged. Re-parenting is
/// rejected when it would make the category its own descendant.
#[utoipa::path(
    patch,
    path = "/api/categories/{id}",
    params(
        ("id" = Uuid, Path, description = "Category id")
    ),
    request_body = UpdateCategoryDto,
    responses(
        (status = 200, description = "Category updated", body = ApiResponse<CategoryResponseDto>),
        (status = 400, description = "Validation error, duplicate slug, or cycle"),
        (status = 404, description = "Category or parent not found")
    ),
    tag = "categories"
)]
pub async fn update_category(
    State(service): State<Arc<CategoryService>>,
    Path(id): Path<Uuid>,
    AppJson(dto): AppJson<UpdateCategoryDto>,
) -> Result<Json<ApiResponse<CategoryResponseDto>>> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let category = service.update(id, dto).await?;
    Ok(Json(ApiResponse::success(Some(category), None, None)))
}

/// Soft-delete a category
///
/// Children and course associations are not cascaded.
#[utoipa::path(
    delete,
    path = "/api/categories/{id}",
    params(
        ("id" = Uuid, Path, description = "Category id")
    ),
    responses(
        (status = 204, description = "Category deleted"),
        (status = 404, description = "Category not found")
    ),
    tag = "categories"
)]
pub async fn delete_category(
    State(service): State<Arc<CategoryService>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// List courses directly tagged with a category
#[utoipa::path(
    get,
    path = "/api/categories/{id}/courses",
    params(
        ("id" = Uuid, Path, description = "Category id"),
        CategoryCoursesQuery
    ),
    responses(
        (status = 200, description = "Courses in category", body = ApiResponse<Vec<CourseResponseDto>>),
        (status = 404, description = "Category not found")
    ),
    tag = "categories"
)]
pub async fn list_category_courses(
    State(service): State<Arc<CategoryService>>,
    Path(id): Path<Uuid>,
    Query(query): Query<CategoryCoursesQuery>,
) -> Result<Json<ApiResponse<Vec<CourseResponseDto>>>> {
    let courses = service.list_courses(id, &query).await?;
    Ok(Json(ApiResponse::success(Some(courses), None, None)))
}
