//! Course category hierarchy.
//!
//! Categories form a self-referential tree (parent pointer, `null` for
//! roots) with soft deletion, slug lookup, and visibility flags. Writes
//! enforce the forest invariants (no cycles, unique slugs among live
//! rows); reads expose both flat listings and the reconstructed tree,
//! plus the courses directly tagged with a category.
//!
//! ## Endpoints
//!
//! | Method | Endpoint | Description |
//! |--------|----------|-------------|
//! | GET | `/api/categories` | Flat listing with optional filters |
//! | GET | `/api/categories/tree` | Reconstructed category forest |
//! | GET | `/api/categories/{id}` | Category by id |
//! | GET | `/api/categories/slug/{slug}` | Category by slug |
//! | GET | `/api/categories/{id}/courses` | Courses tagged with a category |
//! | POST | `/api/categories` | Create a category |
//! | PATCH | `/api/categories/{id}` | Partial update / re-parent |
//! | DELETE | `/api/categories/{id}` | Soft delete (no cascade) |

pub mod dtos;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;

pub use services::CategoryService;
