//! The project's class registry.
//!
//! Class identity is positional: `class_id` in an annotation file is an index
//! into this list. Reordering or renaming classes changes the meaning of every
//! stored id, so edits go through [`ClassRegistry::remap_to`] to migrate
//! annotations by name.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::BoxlabelError;

/// File name of the registry inside a workspace.
pub const CLASSES_FILE: &str = "classes.txt";

/// Ordered list of class names for the active project.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClassRegistry {
    names: Vec<String>,
}

impl ClassRegistry {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        warn_on_duplicates(&names);
        Self { names }
    }

    /// Parses one class per line, trimming whitespace and ignoring blank lines.
    pub fn from_lines(text: &str) -> Self {
        Self::new(
            text.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty()),
        )
    }

    /// Reads a `classes.txt` file.
    pub fn read(path: &Path) -> Result<Self, BoxlabelError> {
        let text = fs::read_to_string(path).map_err(BoxlabelError::Io)?;
        Ok(Self::from_lines(&text))
    }

    /// Writes the registry as `classes.txt`, one name per line.
    pub fn write(&self, path: &Path) -> Result<(), BoxlabelError> {
        let mut text = String::new();
        for name in &self.names {
            text.push_str(name);
            text.push('\n');
        }
        fs::write(path, text).map_err(BoxlabelError::Io)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Returns the name at `class_id`, if it is in range.
    pub fn name(&self, class_id: usize) -> Option<&str> {
        self.names.get(class_id).map(String::as_str)
    }

    /// Finds the first position holding exactly `name` (case-sensitive).
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    pub fn contains_id(&self, class_id: usize) -> bool {
        class_id < self.names.len()
    }

    /// Checks that `class_id` addresses a class in this registry.
    pub fn validate_id(&self, class_id: usize) -> Result<(), BoxlabelError> {
        if self.contains_id(class_id) {
            Ok(())
        } else {
            Err(BoxlabelError::InvalidClassId {
                class_id,
                class_count: self.names.len(),
            })
        }
    }

    /// Resolves a CLI-style class reference: an exact name first, then a numeric id.
    pub fn resolve(&self, reference: &str) -> Result<usize, BoxlabelError> {
        if let Some(idx) = self.index_of(reference) {
            return Ok(idx);
        }
        match reference.parse::<usize>() {
            Ok(id) => {
                self.validate_id(id)?;
                Ok(id)
            }
            Err(_) => Err(BoxlabelError::UnknownClass(reference.to_string())),
        }
    }

    /// Maps every index of `self` to the index of the same name in `new`.
    ///
    /// `None` marks classes that no longer exist in `new`.
    pub fn remap_to(&self, new: &ClassRegistry) -> Vec<Option<usize>> {
        self.names.iter().map(|name| new.index_of(name)).collect()
    }
}

fn warn_on_duplicates(names: &[String]) {
    let mut seen: BTreeMap<&str, usize> = BTreeMap::new();
    for (idx, name) in names.iter().enumerate() {
        if let Some(first) = seen.get(name.as_str()) {
            log::warn!(
                "class '{}' appears at positions {} and {}; lookups resolve to {}",
                name,
                first,
                idx,
                first
            );
        } else {
            seen.insert(name, idx);
        }
    }
}

#[derive(Debug, Deserialize)]
struct DataYaml {
    names: DataYamlNames,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DataYamlNames {
    Sequence(Vec<String>),
    Mapping(BTreeMap<usize, String>),
}

/// Largest index span accepted from a `names` mapping, whatever its size.
const MIN_NAME_INDEX_LIMIT: usize = 1024;

/// Reads class names from a `data.yaml` (`names` as list or index map) or a
/// plain one-name-per-line file.
pub fn read_names_file(path: &Path) -> Result<Vec<String>, BoxlabelError> {
    let is_yaml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"))
        .unwrap_or(false);

    let data = fs::read_to_string(path).map_err(BoxlabelError::Io)?;
    if !is_yaml {
        return Ok(ClassRegistry::from_lines(&data).names);
    }

    let parsed: DataYaml =
        serde_yaml::from_str(&data).map_err(|source| BoxlabelError::NamesFileParse {
            path: path.to_path_buf(),
            message: source.to_string(),
        })?;

    let names = match parsed.names {
        DataYamlNames::Sequence(names) => names,
        DataYamlNames::Mapping(mapping) => {
            let Some(max_index) = mapping.keys().max().copied() else {
                return Ok(Vec::new());
            };
            // Gaps are filled with placeholders, so the index range must stay
            // proportional to the number of named classes.
            let limit = mapping.len().saturating_mul(4).max(MIN_NAME_INDEX_LIMIT);
            let len = max_index
                .checked_add(1)
                .filter(|len| *len <= limit)
                .ok_or_else(|| BoxlabelError::NamesFileParse {
                    path: path.to_path_buf(),
                    message: format!(
                        "class index {} is too large for {} named class(es)",
                        max_index,
                        mapping.len()
                    ),
                })?;
            let mut names = vec![String::new(); len];
            for (index, name) in mapping {
                names[index] = name;
            }
            for (index, name) in names.iter_mut().enumerate() {
                if name.trim().is_empty() {
                    *name = format!("class_{}", index);
                }
            }
            names
        }
    };

    Ok(names)
}

/// Writes an Ultralytics-style `data.yaml` describing the workspace.
///
/// `images_dir` is written for both `train` and `val`; splitting is left to
/// the training pipeline. Each line of `header` becomes a leading `#` comment.
pub fn write_data_yaml(
    path: &Path,
    registry: &ClassRegistry,
    dataset_root: &Path,
    images_dir: &str,
    header: Option<&str>,
) -> Result<(), BoxlabelError> {
    let mut yaml = String::new();
    for line in header.into_iter().flat_map(str::lines) {
        yaml.push_str(&format!("# {}\n", line));
    }
    yaml.push_str(&format!(
        "path: {}\n",
        yaml_single_quoted(&dataset_root.to_string_lossy())
    ));
    yaml.push_str(&format!("train: {}\n", yaml_single_quoted(images_dir)));
    yaml.push_str(&format!("val: {}\n", yaml_single_quoted(images_dir)));
    yaml.push_str(&format!("nc: {}\n", registry.len()));
    yaml.push_str("names:\n");
    for (idx, name) in registry.names.iter().enumerate() {
        yaml.push_str(&format!("  {}: {}\n", idx, yaml_single_quoted(name)));
    }

    fs::write(path, yaml).map_err(BoxlabelError::Io)
}

fn yaml_single_quoted(raw: &str) -> String {
    format!("'{}'", raw.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_lines_trims_and_skips_blanks() {
        let registry = ClassRegistry::from_lines("  cat \n\n dog\n   \nbird");
        assert_eq!(registry.names(), ["cat", "dog", "bird"]);
    }

    #[test]
    fn lookup_is_exact_and_case_sensitive() {
        let registry = ClassRegistry::new(["Dog", "dog"]);
        assert_eq!(registry.index_of("dog"), Some(1));
        assert_eq!(registry.index_of("DOG"), None);
        assert_eq!(registry.name(0), Some("Dog"));
        assert_eq!(registry.name(2), None);
    }

    #[test]
    fn validate_id_reports_registry_size() {
        let registry = ClassRegistry::new(["a", "b"]);
        assert!(registry.validate_id(1).is_ok());
        match registry.validate_id(2) {
            Err(BoxlabelError::InvalidClassId {
                class_id,
                class_count,
            }) => {
                assert_eq!(class_id, 2);
                assert_eq!(class_count, 2);
            }
            other => panic!("expected InvalidClassId, got {other:?}"),
        }
    }

    #[test]
    fn resolve_prefers_names_over_numbers() {
        let registry = ClassRegistry::new(["1", "car"]);
        assert_eq!(registry.resolve("car").unwrap(), 1);
        assert_eq!(registry.resolve("1").unwrap(), 0);
        assert_eq!(registry.resolve("0").unwrap(), 0);
        assert!(matches!(
            registry.resolve("truck"),
            Err(BoxlabelError::UnknownClass(_))
        ));
        assert!(matches!(
            registry.resolve("5"),
            Err(BoxlabelError::InvalidClassId { .. })
        ));
    }

    #[test]
    fn remap_follows_names() {
        let old = ClassRegistry::new(["cat", "dog", "bird"]);
        let new = ClassRegistry::new(["bird", "dog"]);
        assert_eq!(old.remap_to(&new), vec![None, Some(1), Some(0)]);
    }

    #[test]
    fn classes_file_roundtrip() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let path = temp.path().join(CLASSES_FILE);
        let registry = ClassRegistry::new(["person", "bicycle"]);

        registry.write(&path).expect("write classes");
        assert_eq!(ClassRegistry::read(&path).expect("read classes"), registry);
    }

    #[test]
    fn names_file_accepts_sequence_and_mapping_yaml() {
        let temp = tempfile::tempdir().expect("create temp dir");

        let seq = temp.path().join("seq.yaml");
        fs::write(&seq, "names:\n  - cat\n  - dog\n").unwrap();
        assert_eq!(read_names_file(&seq).unwrap(), vec!["cat", "dog"]);

        let map = temp.path().join("map.yml");
        fs::write(&map, "names:\n  0: person\n  2: car\n").unwrap();
        assert_eq!(
            read_names_file(&map).unwrap(),
            vec!["person", "class_1", "car"]
        );

        let txt = temp.path().join("names.txt");
        fs::write(&txt, "cat\ndog\n").unwrap();
        assert_eq!(read_names_file(&txt).unwrap(), vec!["cat", "dog"]);
    }

    #[test]
    fn names_file_rejects_yaml_without_names() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let path = temp.path().join("data.yaml");
        fs::write(&path, "nc: 3\n").unwrap();
        assert!(matches!(
            read_names_file(&path),
            Err(BoxlabelError::NamesFileParse { .. })
        ));
    }

    #[test]
    fn names_file_rejects_huge_mapping_indices() {
        let temp = tempfile::tempdir().expect("create temp dir");

        for index in ["18446744073709551615", "1000000000000", "1024"] {
            let path = temp.path().join("data.yaml");
            fs::write(&path, format!("names:\n  0: dog\n  {}: cat\n", index)).unwrap();
            assert!(
                matches!(
                    read_names_file(&path),
                    Err(BoxlabelError::NamesFileParse { .. })
                ),
                "index {index} should be rejected"
            );
        }

        let path = temp.path().join("data.yaml");
        fs::write(&path, "names:\n  0: dog\n  1023: cat\n").unwrap();
        let names = read_names_file(&path).unwrap();
        assert_eq!(names.len(), 1024);
        assert_eq!(names[1023], "cat");
    }

    #[test]
    fn data_yaml_lists_names_by_index() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let path = temp.path().join("data.yaml");
        let registry = ClassRegistry::new(["cat", "o'neil"]);

        write_data_yaml(
            &path,
            &registry,
            temp.path(),
            "uploads",
            Some("first note\nsecond note"),
        )
        .expect("write yaml");

        let yaml = fs::read_to_string(&path).unwrap();
        assert!(yaml.starts_with("# first note\n# second note\npath: "));
        assert!(yaml.contains("train: 'uploads'"));
        assert!(yaml.contains("nc: 2"));
        assert!(yaml.contains("  0: 'cat'"));
        assert!(yaml.contains("  1: 'o''neil'"));
        assert_eq!(read_names_file(&path).unwrap(), vec!["cat", "o'neil"]);
    }
}
