//! Document paths and entity file naming.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// The field name that addresses an entire document.
///
/// A change whose `field` equals this constant replaces or diffs the whole
/// document; any other field is a dotted path inside it.
pub const ROOT_FIELD: &str = "entity";

const JSON_EXT: &str = ".json";

/// One step of a path into a JSON-like document.
///
/// Serialises as a bare string (object key) or a bare number (array index).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathStep {
    Index(usize),
    Key(String),
}

impl PathStep {
    /// Returns `true` for integer steps.
    pub fn is_index(&self) -> bool {
        matches!(self, Self::Index(_))
    }

    /// The key, if this is a key step.
    pub fn as_key(&self) -> Option<&str> {
        match self {
            Self::Key(k) => Some(k),
            Self::Index(_) => None,
        }
    }
}

impl From<&str> for PathStep {
    fn from(key: &str) -> Self {
        Self::Key(key.to_string())
    }
}

impl From<String> for PathStep {
    fn from(key: String) -> Self {
        Self::Key(key)
    }
}

impl From<usize> for PathStep {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

impl fmt::Display for PathStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(i) => write!(f, "{i}"),
            Self::Key(k) => write!(f, "{k}"),
        }
    }
}

/// Render a path as a dotted string (`stats.hp`, `drops.2`); `<root>` when empty.
pub fn format_path(path: &[PathStep]) -> String {
    if path.is_empty() {
        return "<root>".to_string();
    }
    path.iter()
        .map(|step| step.to_string())
        .collect::<Vec<_>>()
        .join(".")
}

/// Returns `true` if `field` addresses the whole document.
pub fn is_root_field(field: &str) -> bool {
    field == ROOT_FIELD
}

/// Split a dotted field path (`stats.hp`, `items.0.name`) into steps.
///
/// Purely numeric segments become [`PathStep::Index`]. The root field maps
/// to the empty path.
pub fn field_path(field: &str) -> Result<Vec<PathStep>, TypeError> {
    if is_root_field(field) {
        return Ok(Vec::new());
    }
    if field.is_empty() {
        return Err(TypeError::InvalidFieldPath("empty field".into()));
    }
    field
        .split('.')
        .map(|segment| {
            if segment.is_empty() {
                return Err(TypeError::InvalidFieldPath(format!(
                    "empty segment in {field:?}"
                )));
            }
            Ok(match segment.parse::<usize>() {
                Ok(i) => PathStep::Index(i),
                Err(_) => PathStep::Key(segment.to_string()),
            })
        })
        .collect()
}

/// Normalise a target id to the entity's file name (always `*.json`).
pub fn entity_file_name(target_id: &str) -> String {
    if target_id.ends_with(JSON_EXT) {
        target_id.to_string()
    } else {
        format!("{target_id}{JSON_EXT}")
    }
}

/// Loose target matching: `id`, `id + ".json"`, or `id` without `.json`.
pub fn target_matches(candidate: &str, id: &str) -> bool {
    if candidate == id {
        return true;
    }
    if candidate == format!("{id}{JSON_EXT}") {
        return true;
    }
    matches!(id.strip_suffix(JSON_EXT), Some(stem) if candidate == stem)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_step_serializes_bare() {
        let steps = vec![PathStep::from("items"), PathStep::from(2usize)];
        let json = serde_json::to_string(&steps).unwrap();
        assert_eq!(json, r#"["items",2]"#);
        let back: Vec<PathStep> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, steps);
    }

    #[test]
    fn format_path_dotted() {
        assert_eq!(format_path(&[PathStep::from("drops"), PathStep::from(2usize)]), "drops.2");
        assert_eq!(format_path(&[]), "<root>");
    }

    #[test]
    fn root_field_is_empty_path() {
        assert!(field_path(ROOT_FIELD).unwrap().is_empty());
    }

    #[test]
    fn dotted_field_with_index() {
        let path = field_path("items.0.name").unwrap();
        assert_eq!(
            path,
            vec![
                PathStep::Key("items".into()),
                PathStep::Index(0),
                PathStep::Key("name".into()),
            ]
        );
    }

    #[test]
    fn empty_segment_rejected() {
        assert!(field_path("stats..hp").is_err());
        assert!(field_path("").is_err());
    }

    #[test]
    fn entity_file_name_appends_extension_once() {
        assert_eq!(entity_file_name("u1"), "u1.json");
        assert_eq!(entity_file_name("u1.json"), "u1.json");
    }

    #[test]
    fn loose_target_matching() {
        assert!(target_matches("u1.json", "u1.json"));
        assert!(target_matches("u1.json", "u1"));
        assert!(target_matches("u1", "u1.json"));
        assert!(!target_matches("u10.json", "u1"));
    }
}
