//! JSON output helpers shared by array extraction and the manifest.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};

const INDENT: &[u8] = b"    ";

/// Serializes `value` as JSON indented by four spaces.
///
/// # Errors
///
/// Returns an error if `value` cannot be represented as JSON.
pub fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let mut serializer = Serializer::with_formatter(&mut buffer, PrettyFormatter::with_indent(INDENT));
    value.serialize(&mut serializer)?;
    buffer.push(b'\n');
    Ok(buffer)
}

/// Writes `value` to `path` as four-space indented JSON, replacing any existing file.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written, or if `value` cannot be
/// represented as JSON.
pub fn write_pretty_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> io::Result<()> {
    let bytes = to_pretty_json(value).map_err(io::Error::other)?;
    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(&bytes)?;
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_four_space_indent() {
        let bytes = to_pretty_json(&json!({"name": "x", "data": [1.0]})).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("\n    \"name\": \"x\""));
        assert!(text.contains("\n        1.0\n"));
        assert!(text.ends_with("}\n"));
    }

    #[test]
    fn test_write_and_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("value.json");
        write_pretty_json(&path, &json!({"a": 1})).unwrap();
        write_pretty_json(&path, &json!({"b": 2})).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value, json!({"b": 2}));
    }

    #[test]
    fn test_missing_parent_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("value.json");
        assert!(write_pretty_json(&path, &json!(null)).is_err());
    }
}
