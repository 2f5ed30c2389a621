mod category_dto;

pub use category_dto::{
    CategoryCoursesQuery, CategoryResponseDto, CategoryTreeDto, CreateCategoryDto,
    ListCategoriesQuery, ParentFilter, UpdateCategoryDto,
};
