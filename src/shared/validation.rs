use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Regex for validating category slugs
    /// Must be lowercase alphanumeric with hyphens
    /// - Valid: "math", "computer-science", "grade-10"
    /// - Invalid: "Math", "math_basics", "math basics", ""
    pub static ref SLUG_REGEX: Regex = Regex::new(r"^[a-z0-9-]+$").unwrap();
}

/// Derive a URL-safe slug from a display name: lowercase, runs of
/// non-alphanumeric characters collapsed to single hyphens, no leading
/// or trailing hyphen. Returns an empty string when the name contains
/// no usable characters; callers must reject that case.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_was_hyphen = true; // suppress a leading hyphen

    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.extend(c.to_lowercase());
            last_was_hyphen = false;
        } else if !last_was_hyphen {
            slug.push('-');
            last_was_hyphen = true;
        }
    }

    while slug.ends_with('-') {
        slug.pop();
    }

    slug
}

/// Pick the first slug not already taken: the base itself, then
/// "base-1", "base-2", and so on.
pub fn next_available_slug(base: &str, taken: &HashSet<String>) -> String {
    if !taken.contains(base) {
        return base.to_string();
    }

    let mut n = 1u32;
    loop {
        let candidate = format!("{}-{}", base, n);
        if !taken.contains(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_regex_valid() {
        assert!(SLUG_REGEX.is_match("math"));
        assert!(SLUG_REGEX.is_match("computer-science"));
        assert!(SLUG_REGEX.is_match("grade-10"));
        assert!(SLUG_REGEX.is_match("a"));
        assert!(SLUG_REGEX.is_match("-math-")); // pattern itself allows edge hyphens
    }

    #[test]
    fn test_slug_regex_invalid() {
        assert!(!SLUG_REGEX.is_match("Math")); // uppercase
        assert!(!SLUG_REGEX.is_match("math_basics")); // underscore
        assert!(!SLUG_REGEX.is_match("math basics")); // space
        assert!(!SLUG_REGEX.is_match("")); // empty
        assert!(!SLUG_REGEX.is_match("math!")); // punctuation
    }

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("Math"), "math");
        assert_eq!(slugify("Computer Science"), "computer-science");
        assert_eq!(slugify("Grade 10 / Advanced"), "grade-10-advanced");
    }

    #[test]
    fn test_slugify_collapses_and_trims() {
        assert_eq!(slugify("  Arts & Crafts  "), "arts-crafts");
        assert_eq!(slugify("--weird---name--"), "weird-name");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_next_available_slug_no_collision() {
        let taken = HashSet::new();
        assert_eq!(next_available_slug("math", &taken), "math");
    }

    #[test]
    fn test_next_available_slug_takes_first_free_suffix() {
        let taken: HashSet<String> = ["math", "math-1", "math-2"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(next_available_slug("math", &taken), "math-3");

        let taken: HashSet<String> =
            ["math", "math-2"].iter().map(|s| s.to_string()).collect();
        assert_eq!(next_available_slug("math", &taken), "math-1");
    }
}
