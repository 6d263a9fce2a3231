//! Document records handed to the retrieval index.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::constants::code::CODE_EXTENSIONS;

/// Unit ingested by an [`IndexGateway`](crate::index::IndexGateway)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// File path, directory path (or `$ROOT`), or dependency entry name
    pub id: String,
    pub text: String,
    pub metadata: DocumentMetadata,
}

impl Document {
    pub fn new(id: impl Into<String>, text: impl Into<String>, metadata: DocumentMetadata) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            metadata,
        }
    }

    /// Summary document with a small front-matter header naming its path and type
    pub fn with_front_matter(path: &str, summary: &str, metadata: DocumentMetadata) -> Self {
        let text = format!(
            "---\npath: \"{}\"\ntype: \"{}\"\n---\n{}",
            path, metadata.doc_type, summary
        );
        Self::new(path, text, metadata)
    }
}

/// Document metadata. `doc_type` is always present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// `file` | `directory` | `code` | `doc` | dependency entry name
    #[serde(rename = "type")]
    pub doc_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filepath: Option<String>,
    /// Source modification time in ms since epoch; stored, not yet compared
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mtime: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl DocumentMetadata {
    pub fn file(filepath: impl Into<String>, mtime: Option<i64>) -> Self {
        Self::tagged(DocumentKind::File, filepath, mtime)
    }

    pub fn directory(dirpath: impl Into<String>) -> Self {
        Self::tagged(DocumentKind::Directory, dirpath, None)
    }

    pub fn tagged(kind: DocumentKind, filepath: impl Into<String>, mtime: Option<i64>) -> Self {
        Self {
            doc_type: kind.as_str().to_string(),
            filepath: Some(filepath.into()),
            mtime,
            name: None,
        }
    }

    /// Usage-guide metadata; the entry name doubles as the type tag
    pub fn dependency(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            doc_type: name.clone(),
            filepath: None,
            mtime: None,
            name: Some(name),
        }
    }
}

/// Codebase document tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    File,
    Directory,
    Code,
    Doc,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Directory => "directory",
            Self::Code => "code",
            Self::Doc => "doc",
        }
    }

    /// `Code` for known source extensions, `Doc` for everything else
    pub fn classify(path: &str) -> Self {
        let is_code = Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .map(|ext| CODE_EXTENSIONS.contains(&ext))
            .unwrap_or(false);
        if is_code { Self::Code } else { Self::Doc }
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_front_matter() {
        let doc = Document::with_front_matter(
            "src/main.ts",
            "Entry point.",
            DocumentMetadata::file("src/main.ts", Some(42)),
        );
        assert_eq!(doc.id, "src/main.ts");
        assert_eq!(
            doc.text,
            "---\npath: \"src/main.ts\"\ntype: \"file\"\n---\nEntry point."
        );
        assert_eq!(doc.metadata.mtime, Some(42));
    }

    #[test]
    fn test_classify_by_extension() {
        assert_eq!(DocumentKind::classify("src/app.tsx"), DocumentKind::Code);
        assert_eq!(DocumentKind::classify("lib/util.rs"), DocumentKind::Code);
        assert_eq!(DocumentKind::classify("README.md"), DocumentKind::Doc);
        assert_eq!(DocumentKind::classify("Makefile"), DocumentKind::Doc);
    }

    #[test]
    fn test_dependency_metadata_serializes_type_tag() {
        let meta = DocumentMetadata::dependency("zod");
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["type"], "zod");
        assert_eq!(json["name"], "zod");
        assert!(json.get("filepath").is_none());
    }
}
