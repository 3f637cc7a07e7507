//! Records handed over by external analyzers.
//!
//! These mirror what the crawler, the per-language analyzers and the
//! pattern detectors emit. Kinds are plain strings and every field has a
//! default, so a record with missing fields still decodes and is then
//! rejected (or not) by the builder's own checks.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Explicit file-to-file dependency map: `source -> [targets]`.
pub type DependencyMap = BTreeMap<String, Vec<String>>;

/// A discovered source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub extension: String,
    #[serde(default)]
    pub size_bytes: u64,
    #[serde(default)]
    pub line_count: u32,
    #[serde(default)]
    pub language: Option<String>,
}

impl FileRecord {
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        let extension = std::path::Path::new(&path)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_string();
        Self {
            path,
            extension,
            size_bytes: 0,
            line_count: 0,
            language: None,
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// The final path component.
    pub fn file_name(&self) -> &str {
        self.path
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(self.path.as_str())
    }
}

/// The analysis result for one file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    #[serde(default)]
    pub file_path: String,
    #[serde(default)]
    pub code_units: Vec<CodeUnit>,
    #[serde(default)]
    pub imports: Vec<ImportRecord>,
    /// Set when the analyzer failed on this file.
    #[serde(default)]
    pub error: Option<String>,
}

impl AnalysisRecord {
    pub fn new(file_path: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            ..Self::default()
        }
    }

    pub fn with_units(mut self, units: Vec<CodeUnit>) -> Self {
        self.code_units = units;
        self
    }

    pub fn with_imports(mut self, imports: Vec<ImportRecord>) -> Self {
        self.imports = imports;
        self
    }
}

/// A function, class, method or similar unit found in a file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CodeUnit {
    /// Kind tag as reported by the analyzer, e.g. `"function"`.
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub line_start: u32,
    #[serde(default)]
    pub line_end: u32,
    #[serde(default)]
    pub parameters: Vec<String>,
    #[serde(default)]
    pub return_type: Option<String>,
    #[serde(default)]
    pub decorators: Vec<String>,
    #[serde(default)]
    pub is_async: bool,
    #[serde(default)]
    pub visibility: Option<String>,
    #[serde(default)]
    pub docstring: Option<String>,
    /// Base classes named in the declaration.
    #[serde(default)]
    pub bases: Vec<String>,
    /// Interfaces / traits named in the declaration.
    #[serde(default)]
    pub implements: Vec<String>,
    /// Names this unit refers to (calls, attribute access, ...).
    #[serde(default)]
    pub references: Vec<String>,
}

impl CodeUnit {
    pub fn new(kind: impl Into<String>, name: impl Into<String>, start: u32, end: u32) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
            line_start: start,
            line_end: end,
            ..Self::default()
        }
    }

    pub fn with_references(mut self, references: Vec<String>) -> Self {
        self.references = references;
        self
    }

    pub fn with_bases(mut self, bases: Vec<String>) -> Self {
        self.bases = bases;
        self
    }

    pub fn with_implements(mut self, implements: Vec<String>) -> Self {
        self.implements = implements;
        self
    }

    /// Number of lines spanned, inclusive.
    pub fn span(&self) -> u32 {
        self.line_end.saturating_sub(self.line_start) + 1
    }

    /// Whether `other` lies strictly inside this unit.
    pub fn encloses(&self, other: &CodeUnit) -> bool {
        self.line_start <= other.line_start
            && other.line_end <= self.line_end
            && (self.line_start, self.line_end) != (other.line_start, other.line_end)
    }
}

/// One import statement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportRecord {
    #[serde(default)]
    pub module: String,
    #[serde(default)]
    pub names: Vec<String>,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub is_relative: bool,
}

impl ImportRecord {
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            ..Self::default()
        }
    }
}

/// A pattern/smell/security finding from a detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternFinding {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub severity: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub file_path: String,
    #[serde(default)]
    pub line_number: Option<u32>,
}

/// Everything one analysis run produced, ready for ingestion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisBundle {
    #[serde(default)]
    pub files: Vec<FileRecord>,
    #[serde(default)]
    pub analyses: Vec<AnalysisRecord>,
    #[serde(default)]
    pub dependencies: Option<DependencyMap>,
    #[serde(default)]
    pub findings: Vec<PatternFinding>,
}
