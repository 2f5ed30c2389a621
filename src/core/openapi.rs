use utoipa::{Modify, OpenApi};

use crate::features::categories::{dtos as categories_dtos, handlers as categories_handlers};
use crate::features::courses::dtos as courses_dtos;
use crate::shared::types::{ApiResponse, Meta};

#[derive(OpenApi)]
#[openapi(
    paths(
        // Categories
        categories_handlers::list_categories,
        categories_handlers::get_category_tree,
        categories_handlers::get_category_by_id,
        categories_handlers::get_category_by_slug,
        categories_handlers::create_category,
        categories_handlers::update_category,
        categories_handlers::delete_category,
        categories_handlers::list_category_courses,
    ),
    components(
        schemas(
            // Shared
            Meta,
            // Categories
            categories_dtos::CreateCategoryDto,
            categories_dtos::UpdateCategoryDto,
            categories_dtos::CategoryResponseDto,
            categories_dtos::CategoryTreeDto,
            ApiResponse<Vec<categories_dtos::CategoryResponseDto>>,
            ApiResponse<categories_dtos::CategoryResponseDto>,
            ApiResponse<Vec<categories_dtos::CategoryTreeDto>>,
            // Courses
            courses_dtos::CourseResponseDto,
            ApiResponse<Vec<courses_dtos::CourseResponseDto>>,
        )
    ),
    tags(
        (name = "categories", description = "Course category hierarchy"),
    ),
    info(
        title = "Edustack API",
        version = "0.1.0",
        description = "API documentation for the Edustack backend",
    )
)]
pub struct ApiDoc;

/// Modifier to override OpenAPI info from config
pub struct SwaggerInfoModifier {
    pub title: String,
    pub version: String,
    pub description: String,
}

impl Modify for SwaggerInfoModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.info.title = self.title.clone();
        openapi.info.version = self.version.clone();
        openapi.info.description = Some(self.description.clone());
    }
}
