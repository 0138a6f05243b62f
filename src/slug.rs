//! URL-safe slug derivation for display names.
//!
//! Slugs are lowercase, hyphen-separated, and lossy. Uniqueness is scoped to
//! the parent entity by the database indexes, not by this function.

/// Derive a slug from a display name.
///
/// Lowercases, drops everything but ASCII alphanumerics, turns whitespace and
/// underscore runs into single hyphens, and trims hyphens at the ends. The
/// result matches `^[a-z0-9]+(-[a-z0-9]+)*$` or is empty, and the function is
/// idempotent over its own output.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_hyphen = false;

    for ch in text.trim().chars() {
        let ch = ch.to_ascii_lowercase();
        if ch.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            slug.push(ch);
            pending_hyphen = false;
        } else if ch.is_whitespace() || ch == '_' || ch == '-' {
            pending_hyphen = true;
        }
        // Other characters are dropped without breaking a word.
    }

    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_slugs() {
        assert_eq!(slugify("Computer Science"), "computer-science");
        assert_eq!(slugify("  Data   Structures  "), "data-structures");
        assert_eq!(slugify("B.Tech (Hons.)"), "btech-hons");
        assert_eq!(slugify("semester-3"), "semester-3");
        assert_eq!(slugify("snake_case_name"), "snake-case-name");
    }

    #[test]
    fn test_edge_cases() {
        assert_eq!(slugify(""), "");
        assert_eq!(slugify("---"), "");
        assert_eq!(slugify("!!!"), "");
        assert_eq!(slugify("- leading and trailing -"), "leading-and-trailing");
    }

    #[test]
    fn test_idempotent() {
        for input in [
            "Computer Science",
            "B.Tech (Hons.)",
            "a--b__c  d",
            "Операционные системы 101",
            "",
        ] {
            let once = slugify(input);
            assert_eq!(slugify(&once), once, "not idempotent for {:?}", input);
        }
    }

    #[test]
    fn test_output_shape() {
        for input in ["Hello, World!", "a_b-c d", "  x  ", "42", "--a--"] {
            let slug = slugify(input);
            if slug.is_empty() {
                continue;
            }
            assert!(!slug.starts_with('-') && !slug.ends_with('-'), "{:?}", slug);
            assert!(!slug.contains("--"), "{:?}", slug);
            assert!(
                slug.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'),
                "{:?}",
                slug
            );
        }
    }
}
