//! Slug derivation and validation.
//!
//! A slug is the public lookup key for a blog item: derived from the title,
//! URL-safe, and globally unique. Uniqueness here is a fast path only; the
//! unique index on blogs.slug is the real guard and a lost race surfaces as
//! a conflict on write.

use std::future::Future;

use regex::Regex;

use crate::error::ApiError;

lazy_static::lazy_static! {
    /// Valid slug pattern: lowercase letters, numbers, and hyphens
    static ref SLUG_REGEX: Regex = Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").unwrap();
}

pub fn is_valid_slug(slug: &str) -> bool {
    SLUG_REGEX.is_match(slug)
}

/// Normalize a title into a URL-safe slug: ASCII alphanumerics lowercased,
/// every other run of characters collapsed into a single hyphen.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_hyphen = false;
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }
    if slug.is_empty() {
        // Drafts may be created without a title; they still need a lookup key.
        "draft".to_string()
    } else {
        slug
    }
}

/// Derive a free slug from `title`: try the base, then `-1`, `-2`, ... until
/// `exists` reports a miss. Generic over the existence probe so the sequence
/// is testable without a store.
pub async fn unique_slug<F, Fut>(title: &str, mut exists: F) -> Result<String, ApiError>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<bool, ApiError>>,
{
    let base = slugify(title);
    let mut candidate = base.clone();
    let mut counter = 1u32;
    while exists(candidate.clone()).await? {
        candidate = format!("{base}-{counter}");
        counter += 1;
    }
    Ok(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_slugify_normalizes_title() {
        assert_eq!(slugify("My Post"), "my-post");
        assert_eq!(slugify("  Hello,   World!  "), "hello-world");
        assert_eq!(slugify("Already-Slugged-42"), "already-slugged-42");
        assert_eq!(slugify("CAPS AND 123"), "caps-and-123");
    }

    #[test]
    fn test_slugify_empty_title_falls_back() {
        assert_eq!(slugify(""), "draft");
        assert_eq!(slugify("!!!"), "draft");
    }

    #[test]
    fn test_slugify_output_is_valid() {
        for title in ["My Post", "a--b", "-lead and trail-", "x"] {
            assert!(is_valid_slug(&slugify(title)), "invalid slug for {title:?}");
        }
    }

    #[test]
    fn test_is_valid_slug_rejects_uppercase_and_edges() {
        assert!(is_valid_slug("my-post-2"));
        assert!(!is_valid_slug("My-Post"));
        assert!(!is_valid_slug("-leading"));
        assert!(!is_valid_slug("trailing-"));
        assert!(!is_valid_slug(""));
    }

    #[tokio::test]
    async fn test_unique_slug_appends_counter_on_collision() {
        let taken: HashSet<String> = ["my-post", "my-post-1"]
            .into_iter()
            .map(String::from)
            .collect();
        let slug = unique_slug("My Post", |candidate| {
            let hit = taken.contains(&candidate);
            async move { Ok(hit) }
        })
        .await
        .unwrap();
        assert_eq!(slug, "my-post-2");
    }

    #[tokio::test]
    async fn test_unique_slug_sequence_is_idempotent_across_collisions() {
        let mut taken: HashSet<String> = HashSet::new();
        for expected in ["my-post", "my-post-1", "my-post-2"] {
            let slug = unique_slug("My Post", |candidate| {
                let hit = taken.contains(&candidate);
                async move { Ok(hit) }
            })
            .await
            .unwrap();
            assert_eq!(slug, expected);
            taken.insert(slug);
        }
    }

    #[tokio::test]
    async fn test_unique_slug_propagates_probe_errors() {
        let result = unique_slug("My Post", |_| async {
            Err(ApiError::Unexpected("probe failed".to_string()))
        })
        .await;
        assert!(result.is_err());
    }
}
