//! Frontmatter documents
//!
//! Splits a Markdown file into its YAML frontmatter mapping and body, writes
//! it back in the same `---` delimited convention, and merges freshly parsed
//! source frontmatter with what was previously written to the destination.

use serde_yaml::{Mapping, Value};
use thiserror::Error;

const DELIMITER: &str = "---";

/// Creation timestamp managed by the merger
pub const CREATED_AT: &str = "createdAt";

/// Last content change timestamp managed by the merger
pub const UPDATED_AT: &str = "updatedAt";

#[derive(Debug, Error)]
pub enum FrontmatterError {
    #[error("frontmatter block is not closed with '---'")]
    Unterminated,
    #[error("frontmatter is not valid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("frontmatter must be a key/value mapping")]
    NotAMapping,
}

/// A Markdown document split into frontmatter and body
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub data: Mapping,
    pub body: String,
}

impl Document {
    /// Parse a document. Text without a leading `---` line has no frontmatter.
    pub fn parse(text: &str) -> Result<Self, FrontmatterError> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let mut lines = text.split_inclusive('\n');

        let Some(first) = lines.next() else {
            return Ok(Self::default());
        };
        if first.trim_end() != DELIMITER {
            return Ok(Self {
                data: Mapping::new(),
                body: text.to_string(),
            });
        }

        let mut offset = first.len();
        for line in lines {
            if line.trim_end() == DELIMITER {
                let data = parse_mapping(&text[first.len()..offset])?;
                let body = text[offset + line.len()..].to_string();
                return Ok(Self { data, body });
            }
            offset += line.len();
        }

        Err(FrontmatterError::Unterminated)
    }

    /// Serialize back to `---\n<yaml>---\n<body>`, body newline terminated
    pub fn render(&self) -> Result<String, FrontmatterError> {
        let yaml = if self.data.is_empty() {
            String::new()
        } else {
            serde_yaml::to_string(&self.data)?
        };

        let mut out = String::with_capacity(yaml.len() + self.body.len() + 8);
        out.push_str(DELIMITER);
        out.push('\n');
        out.push_str(&yaml);
        out.push_str(DELIMITER);
        out.push('\n');
        out.push_str(&self.body);
        if !out.ends_with('\n') {
            out.push('\n');
        }
        Ok(out)
    }

    /// String value of a top-level field, if present
    pub fn field_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }
}

fn parse_mapping(yaml: &str) -> Result<Mapping, FrontmatterError> {
    if yaml.trim().is_empty() {
        return Ok(Mapping::new());
    }
    match serde_yaml::from_str::<Value>(yaml)? {
        Value::Mapping(mapping) => Ok(mapping),
        Value::Null => Ok(Mapping::new()),
        _ => Err(FrontmatterError::NotAMapping),
    }
}

/// Merge a source document over the current destination document.
///
/// Source fields win over destination fields, except the timestamps:
/// `createdAt` survives from the destination, and `updatedAt` only moves to
/// `now` when the trimmed body changed. Null values are dropped.
pub fn merge(source: &Document, existing: Option<&Document>, slug: &str, now: &str) -> Document {
    let mut data = existing.map(|d| d.data.clone()).unwrap_or_default();

    for (key, value) in &source.data {
        if matches!(key.as_str(), Some(CREATED_AT | UPDATED_AT)) {
            continue;
        }
        data.insert(key.clone(), value.clone());
    }
    data.insert(Value::from("slug"), Value::from(slug));

    let now = Value::from(now);
    let previous = |key: &str| {
        existing
            .and_then(|d| d.data.get(key))
            .filter(|v| !v.is_null())
            .cloned()
    };

    let body_changed = existing.is_none_or(|d| d.body.trim() != source.body.trim());
    let updated_at = if body_changed {
        now.clone()
    } else {
        previous(UPDATED_AT).unwrap_or_else(|| now.clone())
    };
    let created_at = previous(CREATED_AT).unwrap_or(now);

    data.insert(Value::from(UPDATED_AT), updated_at);
    data.insert(Value::from(CREATED_AT), created_at);

    Document {
        data: data.into_iter().filter(|(_, v)| !v.is_null()).collect(),
        body: source.body.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EARLIER: &str = "2024-01-01T00:00:00.000Z";
    const NOW: &str = "2025-06-01T12:00:00.000Z";

    fn doc(text: &str) -> Document {
        Document::parse(text).unwrap()
    }

    #[test]
    fn test_parse_splits_frontmatter_and_body() {
        let d = doc("---\ntitle: Hello\nslug: hello\npublished: true\n---\nBody text\n");

        assert_eq!(d.field_str("title"), Some("Hello"));
        assert_eq!(d.data.get("published"), Some(&Value::Bool(true)));
        assert_eq!(d.body, "Body text\n");
    }

    #[test]
    fn test_parse_without_frontmatter() {
        let d = doc("# Just a heading\n");
        assert!(d.data.is_empty());
        assert_eq!(d.body, "# Just a heading\n");
    }

    #[test]
    fn test_parse_handles_crlf_and_bom() {
        let d = doc("\u{feff}---\r\ntitle: Win\r\n---\r\nBody");
        assert_eq!(d.field_str("title"), Some("Win"));
        assert_eq!(d.body, "Body");
    }

    #[test]
    fn test_parse_unterminated_block() {
        let err = Document::parse("---\ntitle: Oops\nno end").unwrap_err();
        assert!(matches!(err, FrontmatterError::Unterminated));
    }

    #[test]
    fn test_parse_rejects_non_mapping() {
        let err = Document::parse("---\n- a\n- b\n---\nbody").unwrap_err();
        assert!(matches!(err, FrontmatterError::NotAMapping));
    }

    #[test]
    fn test_render_reparses_to_same_document() {
        let original = doc("---\ntitle: Hello\ntags:\n- a\n- b\n---\nBody");
        let rendered = original.render().unwrap();

        assert!(rendered.starts_with("---\ntitle: Hello\n"));
        assert!(rendered.ends_with("---\nBody\n"));

        let reparsed = doc(&rendered);
        assert_eq!(reparsed.data, original.data);
        assert_eq!(reparsed.body.trim(), original.body.trim());
    }

    #[test]
    fn test_merge_new_document_sets_both_timestamps() {
        let source = doc("---\ntitle: T\nslug: t\npublished: true\n---\nHello");

        let merged = merge(&source, None, "t", NOW);

        assert_eq!(merged.field_str(CREATED_AT), Some(NOW));
        assert_eq!(merged.field_str(UPDATED_AT), Some(NOW));
        assert_eq!(merged.field_str("slug"), Some("t"));
        assert_eq!(merged.body, "Hello");
    }

    #[test]
    fn test_merge_unchanged_body_keeps_timestamps() {
        let source = doc("---\ntitle: T\nslug: t\npublished: true\n---\nHello");
        let existing = doc(&format!(
            "---\ntitle: Old\nslug: t\npublished: true\nupdatedAt: '{EARLIER}'\ncreatedAt: '{EARLIER}'\n---\nHello\n"
        ));

        let merged = merge(&source, Some(&existing), "t", NOW);

        assert_eq!(merged.field_str("title"), Some("T"));
        assert_eq!(merged.field_str(CREATED_AT), Some(EARLIER));
        assert_eq!(merged.field_str(UPDATED_AT), Some(EARLIER));
    }

    #[test]
    fn test_merge_changed_body_refreshes_updated_at_only() {
        let source = doc("---\ntitle: T\nslug: t\npublished: true\n---\nNew text");
        let existing = doc(&format!(
            "---\ntitle: T\nslug: t\npublished: true\nupdatedAt: '{EARLIER}'\ncreatedAt: '{EARLIER}'\n---\nOld text\n"
        ));

        let merged = merge(&source, Some(&existing), "t", NOW);

        assert_eq!(merged.field_str(CREATED_AT), Some(EARLIER));
        assert_eq!(merged.field_str(UPDATED_AT), Some(NOW));
    }

    #[test]
    fn test_merge_fills_missing_timestamps_on_existing() {
        let source = doc("---\ntitle: T\nslug: t\npublished: true\n---\nSame");
        let existing = doc("---\ntitle: T\nslug: t\npublished: true\n---\nSame\n");

        let merged = merge(&source, Some(&existing), "t", NOW);

        assert_eq!(merged.field_str(CREATED_AT), Some(NOW));
        assert_eq!(merged.field_str(UPDATED_AT), Some(NOW));
    }

    #[test]
    fn test_merge_ignores_source_timestamps_and_drops_nulls() {
        let source = doc(
            "---\ntitle: T\nslug: t\npublished: true\ncreatedAt: '1999-01-01'\nsummary:\n---\nBody",
        );
        let existing = doc("---\ntitle: T\nslug: t\nextra: kept\n---\nBody\n");

        let merged = merge(&source, Some(&existing), "t-1", NOW);

        assert_eq!(merged.field_str(CREATED_AT), Some(NOW));
        assert_eq!(merged.field_str("extra"), Some("kept"));
        assert_eq!(merged.field_str("slug"), Some("t-1"));
        assert!(merged.data.get("summary").is_none());
    }
}
