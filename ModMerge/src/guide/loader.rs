//! Loading diff guides from TOML or JSON
//!
//! TOML files hold an array of `[[guide]]` tables:
//!
//! ```toml
//! [[guide]]
//! root_tag = "Objects"
//! float_list_to_round = ["Pos"]
//!
//! [[guide.unique_signatures]]
//! tag = "Object"
//! unique_keys = ["Name"]
//! ```
//!
//! JSON files hold either `{ "guide": [...] }` or a bare array of guides.

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::DiffGuide;
use crate::error::{Error, Result};

#[derive(Debug, Default, Serialize, Deserialize)]
struct GuideFile {
    #[serde(default)]
    guide: Vec<DiffGuide>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum JsonGuides {
    List(Vec<DiffGuide>),
    Table(GuideFile),
}

/// Validated guides keyed by root tag, in file order.
#[derive(Debug, Clone, Default)]
pub struct GuideSet {
    guides: IndexMap<String, DiffGuide>,
}

impl GuideSet {
    /// Build a set, validating every guide.
    ///
    /// # Errors
    /// Returns [`Error::IncorrectDiffGuide`] if a guide is invalid or a root tag repeats.
    pub fn from_guides<I: IntoIterator<Item = DiffGuide>>(guides: I) -> Result<Self> {
        let mut set = Self::default();
        for guide in guides {
            guide.validate()?;
            if set.guides.contains_key(&guide.root_tag) {
                return Err(Error::IncorrectDiffGuide {
                    root_tag: guide.root_tag,
                    message: "root tag defined more than once".to_string(),
                });
            }
            set.guides.insert(guide.root_tag.clone(), guide);
        }
        Ok(set)
    }

    /// Load guides from a file; `.json` is read as JSON, anything else as TOML.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));

        tracing::debug!("Loading diff guides from {}", path.display());
        if is_json {
            Self::from_json_str(&content)
        } else {
            Self::from_toml_str(&content)
        }
    }

    /// # Errors
    /// Returns an error if the TOML is malformed or a guide is invalid.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: GuideFile = toml::from_str(content)?;
        Self::from_guides(file.guide)
    }

    /// # Errors
    /// Returns an error if the JSON is malformed or a guide is invalid.
    pub fn from_json_str(content: &str) -> Result<Self> {
        let guides = match serde_json::from_str(content)? {
            JsonGuides::List(list) => list,
            JsonGuides::Table(file) => file.guide,
        };
        Self::from_guides(guides)
    }

    /// Render the set back to TOML.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_toml_string(&self) -> Result<String> {
        let file = GuideFile {
            guide: self.guides.values().cloned().collect(),
        };
        Ok(toml::to_string_pretty(&file)?)
    }

    #[must_use]
    pub fn get(&self, root_tag: &str) -> Option<&DiffGuide> {
        self.guides.get(root_tag)
    }

    /// The guide for a root tag.
    ///
    /// # Errors
    /// Returns [`Error::NoGuideForRoot`] if none is registered.
    pub fn for_root(&self, root_tag: &str) -> Result<&DiffGuide> {
        self.get(root_tag)
            .ok_or_else(|| Error::NoGuideForRoot(root_tag.to_string()))
    }

    pub fn root_tags(&self) -> impl Iterator<Item = &str> {
        self.guides.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DiffGuide> {
        self.guides.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.guides.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.guides.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guide::NodeSignature;
    use pretty_assertions::assert_eq;

    const TOML: &str = r#"
[[guide]]
root_tag = "Objects"
float_list_to_round = ["Pos", "Rot"]

[[guide.unique_signatures]]
tag = "Object"
unique_keys = ["Name"]

[[guide.unique_signatures]]
tag = "Trigger"
unique_keys = ["Name"]
children_tags = ["event"]

[[guide.non_unique_signatures]]
tag = "Prop"
significant_keys = ["Model"]

[[guide]]
root_tag = "Dialogs"
"#;

    #[test]
    fn test_load_toml() {
        let set = GuideSet::from_toml_str(TOML).unwrap();
        assert_eq!(set.root_tags().collect::<Vec<_>>(), vec!["Objects", "Dialogs"]);

        let guide = set.for_root("Objects").unwrap();
        assert!(guide.is_float_list("Rot"));
        assert_eq!(
            guide.unique_signatures[1],
            NodeSignature::for_tag("Trigger")
                .with_unique_keys(&["Name"])
                .with_children_tags(&["event"])
        );
        assert_eq!(guide.non_unique_signatures.len(), 1);
        assert!(matches!(set.for_root("Nope"), Err(Error::NoGuideForRoot(_))));
    }

    #[test]
    fn test_load_json_both_shapes() {
        let list = r#"[{"root_tag": "R", "unique_signatures": [{"tag": "A", "unique_keys": ["x"]}]}]"#;
        let table = r#"{"guide": [{"root_tag": "R"}]}"#;
        assert_eq!(GuideSet::from_json_str(list).unwrap().len(), 1);
        assert_eq!(GuideSet::from_json_str(table).unwrap().len(), 1);
    }

    #[test]
    fn test_invalid_guide_rejected() {
        let bad = r#"
[[guide]]
root_tag = "R"
[[guide.unique_signatures]]
tag = "L"
children = [{ tag = "E" }]
"#;
        assert!(matches!(
            GuideSet::from_toml_str(bad),
            Err(Error::IncorrectDiffGuide { .. })
        ));

        let dup = "[[guide]]\nroot_tag = \"R\"\n[[guide]]\nroot_tag = \"R\"\n";
        assert!(GuideSet::from_toml_str(dup).is_err());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let typo = "[[guide]]\nroot_tag = \"R\"\n[[guide.unique_signatures]]\ntag = \"A\"\nunique_key = [\"x\"]\n";
        assert!(matches!(GuideSet::from_toml_str(typo), Err(Error::TomlError(_))));
    }

    #[test]
    fn test_load_file_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let toml_path = dir.path().join("guides.toml");
        fs::write(&toml_path, TOML).unwrap();
        let set = GuideSet::load(&toml_path).unwrap();
        assert_eq!(set.len(), 2);

        let json_path = dir.path().join("guides.json");
        fs::write(&json_path, r#"[{"root_tag": "R"}]"#).unwrap();
        assert_eq!(GuideSet::load(&json_path).unwrap().root_tags().next(), Some("R"));

        let roundtrip = GuideSet::from_toml_str(&set.to_toml_string().unwrap()).unwrap();
        assert_eq!(roundtrip.get("Objects"), set.get("Objects"));
    }
}
