/// Default number of courses returned per page
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Maximum number of courses returned per page
pub const MAX_PAGE_SIZE: i64 = 100;
