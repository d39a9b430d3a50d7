//! Serialization module for converting API documents to YAML or JSON format.
//!
//! This module provides functions to serialize the assembled document list into standard
//! formats, to write them to files, and to pretty-print the JSON examples embedded in the
//! documents.

use crate::api_doc::ApiDoc;
use anyhow::{Context, Result};
use log::debug;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Indentation of JSON examples.
const EXAMPLE_INDENT: &[u8] = b"    ";

/// Serializes the document list to YAML format.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn serialize_yaml(docs: &[ApiDoc]) -> Result<String> {
    debug!("Serializing {} API documents to YAML", docs.len());
    serde_yaml::to_string(docs).context("Failed to serialize API documents to YAML")
}

/// Serializes the document list to JSON format with pretty printing.
///
/// The output is formatted with indentation for readability, making it suitable
/// for human review and version control.
///
/// # Errors
///
/// Returns an error if serialization fails.
///
/// # Example
///
/// ```
/// use apidoc_from_source::api_doc::ApiDoc;
/// use apidoc_from_source::serializer::serialize_json;
///
/// let json = serialize_json(&[ApiDoc::new()]).unwrap();
/// assert!(json.starts_with('['));
/// ```
pub fn serialize_json(docs: &[ApiDoc]) -> Result<String> {
    debug!("Serializing {} API documents to JSON", docs.len());
    serde_json::to_string_pretty(docs).context("Failed to serialize API documents to JSON")
}

/// Pretty-prints a JSON example with a 4-space indent.
pub fn format_json(value: &Value) -> String {
    let mut buf = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(EXAMPLE_INDENT));
    if value.serialize(&mut serializer).is_err() {
        return String::new();
    }
    String::from_utf8(buf).unwrap_or_default()
}

/// Writes string content to a file.
///
/// Creates the file if it doesn't exist, or overwrites it if it does.
/// Parent directories are created automatically.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written to.
pub fn write_to_file(content: &str, path: &Path) -> Result<()> {
    debug!("Writing content to file: {}", path.display());

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    fs::write(path, content)
        .with_context(|| format!("Failed to write to file: {}", path.display()))?;

    debug!("Successfully wrote {} bytes to {}", content.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api_doc::{RequestParam, ResponseParam};
    use serde_json::json;
    use tempfile::TempDir;

    fn create_test_document() -> ApiDoc {
        let mut doc = ApiDoc::new();
        doc.title = "获取书籍列表".to_string();
        doc.catalog = "测试文档/书籍".to_string();
        doc.request.method = "get".to_string();
        doc.request.url = "/api/v1/book/list".to_string();
        doc.request
            .query
            .push(RequestParam::new("page", "int", "true", "", "第几页"));
        doc.response
            .params
            .push(ResponseParam::new("total_count", "i32", "总条数"));
        doc
    }

    #[test]
    fn test_serialize_yaml() {
        let yaml = serialize_yaml(&[create_test_document()]).unwrap();

        assert!(yaml.contains("title: 获取书籍列表"));
        assert!(yaml.contains("method: get"));
        assert!(yaml.contains("type: int"));
    }

    #[test]
    fn test_serialize_json() {
        let json = serialize_json(&[create_test_document()]).unwrap();

        let parsed: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed[0]["title"], "获取书籍列表");
        assert_eq!(parsed[0]["order"], 99);
        assert_eq!(parsed[0]["request"]["query"][0]["type"], "int");
        assert_eq!(parsed[0]["response"]["params"][0]["type"], "int");
        assert!(json.contains('\n'));
    }

    #[test]
    fn test_roundtrip_json_serialization() {
        let docs = vec![create_test_document()];
        let json = serialize_json(&docs).unwrap();
        let parsed: Vec<ApiDoc> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, docs);
    }

    #[test]
    fn test_format_json_keeps_order_and_indent() {
        let value = json!({"errcode": 0, "errmsg": "错误说明", "data": {"items": [1]}});
        let formatted = format_json(&value);

        assert_eq!(
            formatted,
            "{\n    \"errcode\": 0,\n    \"errmsg\": \"错误说明\",\n    \"data\": {\n        \"items\": [\n            1\n        ]\n    }\n}"
        );
    }

    #[test]
    fn test_write_to_file_creates_directories() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("nested/dir/docs.json");

        write_to_file("[]", &file_path).unwrap();
        assert_eq!(fs::read_to_string(&file_path).unwrap(), "[]");

        write_to_file("[{}]", &file_path).unwrap();
        assert_eq!(fs::read_to_string(&file_path).unwrap(), "[{}]");
    }
}
