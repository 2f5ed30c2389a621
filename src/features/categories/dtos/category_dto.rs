use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Deserializer, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::features::categories::models::Category;
use crate::shared::constants::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::shared::validation::SLUG_REGEX;

/// Deserializes a field that distinguishes "absent" from "explicitly null":
/// absent stays `None`, `null` becomes `Some(None)`, a value `Some(Some(v))`.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

/// Request DTO for creating a category
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCategoryDto {
    /// Display name (required)
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    /// URL-safe identifier; derived from `name` when omitted
    #[validate(regex(
        path = *SLUG_REGEX,
        message = "Slug must contain only lowercase letters, numbers, and hyphens"
    ))]
    pub slug: Option<String>,

    /// Parent category id; omit for a root category
    pub parent_category_id: Option<Uuid>,

    /// Sibling ordering position (default 0)
    #[validate(range(min = 0, message = "Display order must be non-negative"))]
    pub display_order: Option<i32>,

    pub is_active: Option<bool>,
    pub is_featured: Option<bool>,

    pub icon_url: Option<String>,
    pub image_url: Option<String>,
    pub color: Option<String>,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub meta_keywords: Option<String>,
}

/// Request DTO for partially updating a category
///
/// Absent fields are left unchanged. Nullable fields (`parentCategoryId`
/// and the presentation/meta attributes) distinguish absent (unchanged)
/// from explicit `null` (clear the field; for `parentCategoryId`,
/// re-root the category).
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCategoryDto {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,

    #[validate(regex(
        path = *SLUG_REGEX,
        message = "Slug must contain only lowercase letters, numbers, and hyphens"
    ))]
    pub slug: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<Uuid>)]
    pub parent_category_id: Option<Option<Uuid>>,

    #[validate(range(min = 0, message = "Display order must be non-negative"))]
    pub display_order: Option<i32>,

    pub is_active: Option<bool>,
    pub is_featured: Option<bool>,

    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub icon_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub image_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub color: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub meta_title: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub meta_description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub meta_keywords: Option<Option<String>>,
}

/// Response DTO for a category
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CategoryResponseDto {
    pub id: Uuid,
    pub parent_category_id: Option<Uuid>,
    pub name: String,
    pub slug: String,
    pub display_order: i32,
    pub is_active: bool,
    pub is_featured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta_keywords: Option<String>,
    pub course_count: i32,
}

impl From<Category> for CategoryResponseDto {
    fn from(c: Category) -> Self {
        Self {
            id: c.id,
            parent_category_id: c.parent_category_id,
            name: c.name,
            slug: c.slug,
            display_order: c.display_order,
            is_active: c.is_active,
            is_featured: c.is_featured,
            icon_url: c.icon_url,
            image_url: c.image_url,
            color: c.color,
            meta_title: c.meta_title,
            meta_description: c.meta_description,
            meta_keywords: c.meta_keywords,
            course_count: c.course_count,
        }
    }
}

/// Response DTO for the reconstructed category tree
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(no_recursion)]
pub struct CategoryTreeDto {
    pub id: Uuid,
    pub parent_category_id: Option<Uuid>,
    pub name: String,
    pub slug: String,
    pub display_order: i32,
    pub is_active: bool,
    pub is_featured: bool,
    pub course_count: i32,
    pub children: Vec<CategoryTreeDto>,
}

impl CategoryTreeDto {
    /// Reconstruct the forest from a flat list of (non-deleted) categories.
    ///
    /// Single pass to bucket children under their parent id, then assembly
    /// from the roots. Nodes whose declared parent is not in the loaded set
    /// are surfaced as additional roots rather than dropped. Each bucket is
    /// consumed at most once, so assembly terminates even if the stored
    /// graph transiently contains a cycle.
    pub fn build_tree(categories: Vec<Category>) -> Vec<CategoryTreeDto> {
        let ids: HashSet<Uuid> = categories.iter().map(|c| c.id).collect();

        let mut roots: Vec<Category> = Vec::new();
        let mut children_of: HashMap<Uuid, Vec<Category>> = HashMap::new();
        for category in categories {
            match category.parent_category_id {
                Some(parent_id) if ids.contains(&parent_id) => {
                    children_of.entry(parent_id).or_default().push(category);
                }
                _ => roots.push(category),
            }
        }

        roots.sort_by_key(|c| (c.display_order, c.id));
        for bucket in children_of.values_mut() {
            bucket.sort_by_key(|c| (c.display_order, c.id));
        }

        roots
            .into_iter()
            .map(|root| Self::assemble(root, &mut children_of))
            .collect()
    }

    fn assemble(category: Category, children_of: &mut HashMap<Uuid, Vec<Category>>) -> Self {
        let children = children_of
            .remove(&category.id)
            .unwrap_or_default()
            .into_iter()
            .map(|child| Self::assemble(child, children_of))
            .collect();

        CategoryTreeDto {
            id: category.id,
            parent_category_id: category.parent_category_id,
            name: category.name,
            slug: category.slug,
            display_order: category.display_order,
            is_active: category.is_active,
            is_featured: category.is_featured,
            course_count: category.course_count,
            children,
        }
    }
}

/// Filter on the parent column for category listings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentFilter {
    /// No constraint on the parent column
    Any,
    /// Root categories only (`parent_category_id IS NULL`)
    Root,
    /// Direct children of the given category
    Of(Uuid),
}

/// Query params for listing categories
///
/// Omitted filters impose no constraint; `isActive=false` and an omitted
/// `isActive` are different queries.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ListCategoriesQuery {
    /// Filter on the active flag
    pub is_active: Option<bool>,
    /// Filter on the featured flag
    pub is_featured: Option<bool>,
    /// Parent category id, or the literal `null` for roots only
    pub parent_id: Option<String>,
}

impl ListCategoriesQuery {
    pub fn parent_filter(&self) -> Result<ParentFilter, String> {
        match self.parent_id.as_deref() {
            None => Ok(ParentFilter::Any),
            Some("null") => Ok(ParentFilter::Root),
            Some(raw) => raw
                .parse::<Uuid>()
                .map(ParentFilter::Of)
                .map_err(|_| format!("Invalid parentId '{}': expected a UUID or 'null'", raw)),
        }
    }
}

/// Query params for listing a category's courses
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct CategoryCoursesQuery {
    /// Filter on publication status
    pub is_published: Option<bool>,
    /// Page size (default 10, max 100)
    pub limit: Option<i64>,
    /// Rows to skip
    pub offset: Option<i64>,
}

impl CategoryCoursesQuery {
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn category(name: &str, parent: Option<Uuid>, display_order: i32) -> Category {
        Category {
            id: Uuid::new_v4(),
            parent_category_id: parent,
            name: name.to_string(),
            slug: name.to_lowercase(),
            display_order,
            is_active: true,
            is_featured: false,
            icon_url: None,
            image_url: None,
            color: None,
            meta_title: None,
            meta_description: None,
            meta_keywords: None,
            course_count: 0,
            deleted_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn flatten(nodes: &[CategoryTreeDto], out: &mut Vec<Uuid>) {
        for node in nodes {
            out.push(node.id);
            flatten(&node.children, out);
        }
    }

    #[test]
    fn test_build_tree_three_generations() {
        let science = category("Science", None, 0);
        let physics = category("Physics", Some(science.id), 0);
        let mechanics = category("Mechanics", Some(physics.id), 0);

        let tree = CategoryTreeDto::build_tree(vec![
            mechanics.clone(),
            science.clone(),
            physics.clone(),
        ]);

        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].name, "Science");
        assert_eq!(tree[0].children.len(), 1);
        assert_eq!(tree[0].children[0].name, "Physics");
        assert_eq!(tree[0].children[0].children.len(), 1);
        assert_eq!(tree[0].children[0].children[0].name, "Mechanics");
    }

    #[test]
    fn test_build_tree_preserves_every_category() {
        let root_a = category("A", None, 1);
        let root_b = category("B", None, 0);
        let child_a1 = category("A1", Some(root_a.id), 0);
        let child_a2 = category("A2", Some(root_a.id), 1);
        let grandchild = category("A1x", Some(child_a1.id), 0);

        let input = vec![
            root_a.clone(),
            root_b.clone(),
            child_a1.clone(),
            child_a2.clone(),
            grandchild.clone(),
        ];
        let mut expected: Vec<Uuid> = input.iter().map(|c| c.id).collect();

        let tree = CategoryTreeDto::build_tree(input);
        let mut got = Vec::new();
        flatten(&tree, &mut got);

        expected.sort();
        got.sort();
        assert_eq!(got, expected);
    }

    #[test]
    fn test_build_tree_orders_siblings_by_display_order() {
        let root = category("Root", None, 0);
        let second = category("Second", Some(root.id), 5);
        let first = category("First", Some(root.id), 1);

        let tree = CategoryTreeDto::build_tree(vec![root, second, first]);

        let names: Vec<&str> = tree[0].children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["First", "Second"]);
    }

    #[test]
    fn test_build_tree_orphan_becomes_root() {
        // Parent was soft-deleted and is absent from the load; its child
        // must surface as a root instead of disappearing.
        let missing_parent = Uuid::new_v4();
        let root = category("Root", None, 0);
        let orphan = category("Orphan", Some(missing_parent), 0);

        let tree = CategoryTreeDto::build_tree(vec![root, orphan]);

        let names: Vec<&str> = tree.iter().map(|c| c.name.as_str()).collect();
        assert!(names.contains(&"Root"));
        assert!(names.contains(&"Orphan"));
    }

    #[test]
    fn test_build_tree_terminates_on_cyclic_data() {
        // Two rows referencing each other can only occur through a racing
        // write; assembly must still terminate.
        let mut a = category("A", None, 0);
        let mut b = category("B", None, 0);
        a.parent_category_id = Some(b.id);
        b.parent_category_id = Some(a.id);
        let root = category("Root", None, 0);

        let tree = CategoryTreeDto::build_tree(vec![a, b, root.clone()]);

        let names: Vec<&str> = tree.iter().map(|c| c.name.as_str()).collect();
        assert!(names.contains(&"Root"));
    }

    #[test]
    fn test_parent_filter_parsing() {
        let query = ListCategoriesQuery::default();
        assert_eq!(query.parent_filter().unwrap(), ParentFilter::Any);

        let query = ListCategoriesQuery {
            parent_id: Some("null".to_string()),
            ..Default::default()
        };
        assert_eq!(query.parent_filter().unwrap(), ParentFilter::Root);

        let id = Uuid::new_v4();
        let query = ListCategoriesQuery {
            parent_id: Some(id.to_string()),
            ..Default::default()
        };
        assert_eq!(query.parent_filter().unwrap(), ParentFilter::Of(id));

        let query = ListCategoriesQuery {
            parent_id: Some("not-a-uuid".to_string()),
            ..Default::default()
        };
        assert!(query.parent_filter().is_err());
    }

    #[test]
    fn test_courses_query_clamps_pagination() {
        let query = CategoryCoursesQuery::default();
        assert_eq!(query.limit(), 10);
        assert_eq!(query.offset(), 0);

        let query = CategoryCoursesQuery {
            limit: Some(5000),
            offset: Some(-3),
            ..Default::default()
        };
        assert_eq!(query.limit(), 100);
        assert_eq!(query.offset(), 0);
    }

    #[test]
    fn test_update_dto_distinguishes_absent_from_null_parent() {
        let patch: UpdateCategoryDto = serde_json::from_str(r#"{"name":"Algebra"}"#).unwrap();
        assert!(patch.parent_category_id.is_none());

        let patch: UpdateCategoryDto =
            serde_json::from_str(r#"{"parentCategoryId":null}"#).unwrap();
        assert_eq!(patch.parent_category_id, Some(None));

        let id = Uuid::new_v4();
        let patch: UpdateCategoryDto =
            serde_json::from_str(&format!(r#"{{"parentCategoryId":"{}"}}"#, id)).unwrap();
        assert_eq!(patch.parent_category_id, Some(Some(id)));
    }

    #[test]
    fn test_update_dto_can_clear_presentation_fields() {
        // Absent field: unchanged
        let patch: UpdateCategoryDto = serde_json::from_str(r#"{"name":"Algebra"}"#).unwrap();
        assert!(patch.icon_url.is_none());
        assert!(patch.meta_title.is_none());

        // Explicit null: clear the stored value
        let patch: UpdateCategoryDto =
            serde_json::from_str(r#"{"iconUrl":null,"color":null}"#).unwrap();
        assert_eq!(patch.icon_url, Some(None));
        assert_eq!(patch.color, Some(None));

        // Value: replace
        let patch: UpdateCategoryDto =
            serde_json::from_str(r#"{"iconUrl":"https://cdn.example.com/math.svg"}"#).unwrap();
        assert_eq!(
            patch.icon_url,
            Some(Some("https://cdn.example.com/math.svg".to_string()))
        );
    }
}
