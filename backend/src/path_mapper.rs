//! Path Mapper
//!
//! Decides where a transformed artifact lands in the target repository.
//! A table of rules maps (target-language keyword, source extension) to a
//! destination directory, extension and file-name case. No matching rule
//! means the path is kept as-is.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// How the destination file stem is cased
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileNameCase {
    /// Keep the source stem
    #[default]
    Preserve,
    /// `my_app` -> `MyApp`
    Pascal,
    /// `MyApp` -> `my_app`
    Snake,
}

impl FileNameCase {
    /// Apply this case to a file stem
    pub fn apply(self, stem: &str) -> String {
        match self {
            FileNameCase::Preserve => stem.to_string(),
            FileNameCase::Pascal => to_pascal_case(stem),
            FileNameCase::Snake => to_snake_case(stem),
        }
    }
}

/// One row of the mapping table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathRule {
    /// Display name of the target language
    pub language: String,
    /// Words in the instructions that select this rule (matched whole-word)
    pub keywords: Vec<String>,
    /// Extension of source files this rule applies to, without the dot
    pub source_extension: String,
    /// Destination directory, relative to the repository root
    #[serde(default)]
    pub target_dir: String,
    /// Destination extension, without the dot
    pub target_extension: String,
    /// Casing of the destination file stem
    #[serde(default)]
    pub file_name_case: FileNameCase,
}

impl PathRule {
    fn matches(&self, extension: &str, words: &[String]) -> bool {
        self.source_extension.eq_ignore_ascii_case(extension)
            && self
                .keywords
                .iter()
                .any(|keyword| words.iter().any(|word| word.eq_ignore_ascii_case(keyword)))
    }

    fn destination(&self, stem: &str) -> String {
        let file_name = format!("{}.{}", self.file_name_case.apply(stem), self.target_extension);
        let dir = self.target_dir.trim_matches('/');
        if dir.is_empty() {
            file_name
        } else {
            format!("{}/{}", dir, file_name)
        }
    }
}

/// Errors loading a mapping table
#[derive(Error, Debug)]
pub enum PathMappingError {
    /// The table file could not be read
    #[error("Failed to read path mapping file '{path}': {source}")]
    Io {
        /// File that failed
        path: String,
        /// Underlying error
        source: std::io::Error,
    },

    /// The table file is not a valid rule list
    #[error("Invalid path mapping file '{path}': {source}")]
    Parse {
        /// File that failed
        path: String,
        /// Underlying error
        source: serde_json::Error,
    },

    /// A rule cannot match anything
    #[error("Path mapping rule '{0}' needs at least one keyword and a source extension")]
    InvalidRule(String),
}

/// Table-driven path mapping policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathMapper {
    rules: Vec<PathRule>,
}

impl Default for PathMapper {
    fn default() -> Self {
        Self {
            rules: default_rules(),
        }
    }
}

impl PathMapper {
    /// Build a mapper from rules, evaluated in order
    pub fn new(rules: Vec<PathRule>) -> Result<Self, PathMappingError> {
        let rules = rules
            .into_iter()
            .map(|mut rule| {
                rule.source_extension = rule.source_extension.trim_start_matches('.').to_string();
                rule.target_extension = rule.target_extension.trim_start_matches('.').to_string();
                rule.keywords.retain(|k| !k.trim().is_empty());
                if rule.keywords.is_empty() || rule.source_extension.is_empty() {
                    return Err(PathMappingError::InvalidRule(rule.language));
                }
                Ok(rule)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    /// Load rules from a JSON array file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, PathMappingError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let raw = std::fs::read_to_string(path).map_err(|source| PathMappingError::Io {
            path: display.clone(),
            source,
        })?;
        let rules: Vec<PathRule> =
            serde_json::from_str(&raw).map_err(|source| PathMappingError::Parse {
                path: display,
                source,
            })?;
        Self::new(rules)
    }

    /// Rules in evaluation order
    pub fn rules(&self) -> &[PathRule] {
        &self.rules
    }

    /// Destination path for `original_path` under `instructions`
    ///
    /// The first rule whose keyword appears in the instructions and whose
    /// source extension matches wins. Only the file stem survives; source
    /// directories are dropped. Without a match the path is unchanged.
    pub fn map_path(&self, original_path: &str, instructions: &str) -> String {
        let path = Path::new(original_path);
        let (Some(extension), Some(stem)) = (
            path.extension().and_then(|e| e.to_str()),
            path.file_stem().and_then(|s| s.to_str()),
        ) else {
            return original_path.to_string();
        };

        let words = instruction_words(instructions);
        match self.rules.iter().find(|rule| rule.matches(extension, &words)) {
            Some(rule) => rule.destination(stem),
            None => original_path.to_string(),
        }
    }
}

fn default_rules() -> Vec<PathRule> {
    vec![
        PathRule {
            language: "Java".to_string(),
            keywords: vec!["java".to_string()],
            source_extension: "py".to_string(),
            target_dir: "src/main/java/com/app".to_string(),
            target_extension: "java".to_string(),
            file_name_case: FileNameCase::Pascal,
        },
        PathRule {
            language: "Kotlin".to_string(),
            keywords: vec!["kotlin".to_string()],
            source_extension: "py".to_string(),
            target_dir: "src/main/kotlin/com/app".to_string(),
            target_extension: "kt".to_string(),
            file_name_case: FileNameCase::Pascal,
        },
        PathRule {
            language: "TypeScript".to_string(),
            keywords: vec!["typescript".to_string(), "ts".to_string()],
            source_extension: "js".to_string(),
            target_dir: "src".to_string(),
            target_extension: "ts".to_string(),
            file_name_case: FileNameCase::Preserve,
        },
        PathRule {
            language: "Rust".to_string(),
            keywords: vec!["rust".to_string()],
            source_extension: "py".to_string(),
            target_dir: "src".to_string(),
            target_extension: "rs".to_string(),
            file_name_case: FileNameCase::Snake,
        },
    ]
}

/// Lower-cased words of the instructions; `+` and `#` count as word
/// characters so that "c++" and "c#" survive
fn instruction_words(instructions: &str) -> Vec<String> {
    instructions
        .to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '+' || c == '#'))
        .filter(|word| !word.is_empty())
        .map(str::to_string)
        .collect()
}

fn to_pascal_case(stem: &str) -> String {
    stem.split(['_', '-', ' ', '.'])
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

fn to_snake_case(stem: &str) -> String {
    let mut out = String::with_capacity(stem.len() + 4);
    let mut prev_lower = false;
    for c in stem.chars() {
        if c == '-' || c == ' ' || c == '.' {
            out.push('_');
            prev_lower = false;
        } else if c.is_uppercase() {
            if prev_lower {
                out.push('_');
            }
            out.extend(c.to_lowercase());
            prev_lower = false;
        } else {
            out.push(c);
            prev_lower = c.is_lowercase() || c.is_ascii_digit();
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Write;

    #[test]
    fn test_java_hint_maps_python_file() {
        let mapper = PathMapper::default();
        assert_eq!(
            mapper.map_path("app.py", "convert to Java"),
            "src/main/java/com/app/App.java"
        );
        assert_eq!(
            mapper.map_path("src/my_service.py", "Rewrite this in JAVA please"),
            "src/main/java/com/app/MyService.java"
        );
    }

    #[test]
    fn test_javascript_does_not_select_java() {
        let mapper = PathMapper::default();
        assert_eq!(mapper.map_path("app.py", "convert to javascript"), "app.py");
    }

    #[test]
    fn test_unmatched_extension_is_identity() {
        let mapper = PathMapper::default();
        assert_eq!(
            mapper.map_path("requirements.txt", "convert to Java"),
            "requirements.txt"
        );
        assert_eq!(mapper.map_path("Dockerfile", "convert to Java"), "Dockerfile");
    }

    #[test]
    fn test_first_matching_rule_wins() {
        let mapper = PathMapper::default();
        assert_eq!(
            mapper.map_path("app.py", "java or kotlin, whichever"),
            "src/main/java/com/app/App.java"
        );
        assert_eq!(
            mapper.map_path("app.py", "port to kotlin"),
            "src/main/kotlin/com/app/App.kt"
        );
    }

    #[test]
    fn test_other_default_rules() {
        let mapper = PathMapper::default();
        assert_eq!(mapper.map_path("index.js", "use TypeScript"), "src/index.ts");
        assert_eq!(mapper.map_path("MyApp.py", "port to rust"), "src/my_app.rs");
    }

    #[test]
    fn test_name_casing() {
        assert_eq!(to_pascal_case("my_app-v2"), "MyAppV2");
        assert_eq!(to_pascal_case("app"), "App");
        assert_eq!(to_snake_case("HttpServer"), "http_server");
        assert_eq!(to_snake_case("main"), "main");
    }

    #[test]
    fn test_new_rejects_rule_without_keywords() {
        let rule = PathRule {
            language: "Go".to_string(),
            keywords: vec!["  ".to_string()],
            source_extension: "py".to_string(),
            target_dir: String::new(),
            target_extension: "go".to_string(),
            file_name_case: FileNameCase::Preserve,
        };
        assert!(matches!(
            PathMapper::new(vec![rule]),
            Err(PathMappingError::InvalidRule(lang)) if lang == "Go"
        ));
    }

    #[test]
    fn test_from_json_file_loads_custom_table() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{
                "language": "Go",
                "keywords": ["golang"],
                "source_extension": ".py",
                "target_dir": "cmd/app/",
                "target_extension": "go"
            }}]"#
        )
        .unwrap();

        let mapper = PathMapper::from_json_file(file.path()).unwrap();
        assert_eq!(mapper.rules().len(), 1);
        assert_eq!(mapper.map_path("main.py", "port to golang"), "cmd/app/main.go");
        assert_eq!(mapper.map_path("main.py", "convert to Java"), "main.py");
    }

    #[test]
    fn test_from_json_file_reports_errors() {
        let missing = PathMapper::from_json_file("/nonexistent/path-mapping.json");
        assert!(matches!(missing, Err(PathMappingError::Io { .. })));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(
            PathMapper::from_json_file(file.path()),
            Err(PathMappingError::Parse { .. })
        ));
    }

    proptest! {
        /// Same input, same output
        #[test]
        fn prop_map_path_is_pure(
            path in "[a-zA-Z_/]{1,12}(\\.(py|js|txt|json))?",
            instructions in "[a-zA-Z ]{0,30}",
        ) {
            let mapper = PathMapper::default();
            prop_assert_eq!(
                mapper.map_path(&path, &instructions),
                mapper.map_path(&path, &instructions)
            );
        }

        /// Without a language keyword the path is untouched
        #[test]
        fn prop_no_keyword_is_identity(
            path in "[a-zA-Z_/]{1,12}(\\.(py|js|txt|json))?",
            instructions in "[0-9 ,.!?]{0,30}",
        ) {
            let mapper = PathMapper::default();
            prop_assert_eq!(mapper.map_path(&path, &instructions), path);
        }
    }
}
