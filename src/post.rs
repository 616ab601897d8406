//! Post record schema
//!
//! Frontmatter is only published when it describes a post. Validation never
//! fails the caller: it yields a [`SchemaResult`] that the copier branches on
//! to skip notes that are not blog posts.

use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use thiserror::Error;

/// Frontmatter fields every published note must carry
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub title: String,
    pub slug: String,
    pub published: bool,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("frontmatter does not match the post schema: {0}")]
    Shape(#[from] serde_yaml::Error),
    #[error("invalid slug {0:?}: must be a single non-empty path segment")]
    Slug(String),
}

/// Outcome of checking a frontmatter mapping against the post schema
pub type SchemaResult = Result<Post, SchemaError>;

impl Post {
    /// Check a frontmatter mapping without failing the caller
    pub fn safe_parse(data: &Mapping) -> SchemaResult {
        let post: Post = serde_yaml::from_value(Value::Mapping(data.clone()))?;
        if !is_valid_slug(&post.slug) {
            return Err(SchemaError::Slug(post.slug));
        }
        Ok(post)
    }
}

fn is_valid_slug(slug: &str) -> bool {
    !slug.trim().is_empty()
        && slug != "."
        && slug != ".."
        && !slug.contains(['/', '\\'])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping(yaml: &str) -> Mapping {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_valid_post() {
        let post = Post::safe_parse(&mapping(
            "title: Hello\nslug: hello\npublished: false\ncreatedAt: '2024-01-01T00:00:00.000Z'\ntags: [a]",
        ))
        .unwrap();

        assert_eq!(post.title, "Hello");
        assert_eq!(post.slug, "hello");
        assert!(!post.published);
        assert_eq!(post.created_at.as_deref(), Some("2024-01-01T00:00:00.000Z"));
        assert_eq!(post.updated_at, None);
    }

    #[test]
    fn test_missing_required_field() {
        let result = Post::safe_parse(&mapping("title: Hello\nslug: hello"));
        assert!(matches!(result, Err(SchemaError::Shape(_))));
    }

    #[test]
    fn test_wrong_type() {
        let result = Post::safe_parse(&mapping("title: Hello\nslug: hello\npublished: 'yes'"));
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_path_like_slugs() {
        for slug in ["../escape", "a/b", "..", "''"] {
            let yaml = format!("title: x\nslug: {slug}\npublished: true");
            let result = Post::safe_parse(&mapping(&yaml));
            assert!(
                matches!(result, Err(SchemaError::Slug(_))),
                "slug {slug} should be rejected"
            );
        }
    }
}
