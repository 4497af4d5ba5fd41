//! Core types for manifest dumping

use crate::{Error, Result};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};

/// How a module reference argument is interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReferenceMode {
    /// An existing file is loaded by path, anything else by name.
    #[default]
    Auto,
    /// Always a filesystem path; the search path is never consulted.
    Path,
    /// Always a dotted module name resolved against the search path.
    Name,
}

/// Source format of a module file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceFormat {
    /// gclient-style DEPS file (declarative Python subset)
    Deps,
    /// JSON document
    Json,
    /// TOML document
    Toml,
    /// YAML document
    Yaml,
}

impl SourceFormat {
    /// Infers the format from a file extension.
    ///
    /// Files without a recognised extension (including `DEPS` and `*.py`)
    /// are treated as DEPS files.
    pub fn from_path(path: &Path) -> Self {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());

        match extension.as_deref() {
            Some("json") => SourceFormat::Json,
            Some("toml") => SourceFormat::Toml,
            Some("yaml" | "yml") => SourceFormat::Yaml,
            _ => SourceFormat::Deps,
        }
    }

    /// Lowercase name of the format.
    pub fn name(self) -> &'static str {
        match self {
            SourceFormat::Deps => "deps",
            SourceFormat::Json => "json",
            SourceFormat::Toml => "toml",
            SourceFormat::Yaml => "yaml",
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A manifest attribute read from a module, ready to be written as JSON.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Manifest {
    /// Module the manifest was read from.
    #[serde(skip)]
    pub module: String,
    /// Attribute that holds the manifest.
    #[serde(skip)]
    pub attribute: String,
    /// The manifest itself.
    pub value: Value,
}

impl Manifest {
    /// Number of top-level entries (0 when the manifest is not a mapping).
    pub fn entry_count(&self) -> usize {
        self.value.as_object().map_or(0, |map| map.len())
    }

    /// Serializes the manifest with `indent` spaces per nesting level.
    ///
    /// Keys keep the order in which the module defined them.
    ///
    /// # Errors
    /// Returns [`Error::NotSerializable`] if the value cannot be encoded.
    pub fn to_json_string(&self, indent: usize) -> Result<String> {
        let indent = vec![b' '; indent];
        let formatter = PrettyFormatter::with_indent(&indent);
        let mut buf = Vec::new();
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.value
            .serialize(&mut serializer)
            .map_err(|e| self.not_serializable(e.to_string()))?;
        String::from_utf8(buf).map_err(|e| self.not_serializable(e.to_string()))
    }

    fn not_serializable(&self, message: String) -> Error {
        Error::NotSerializable {
            attribute: self.attribute.clone(),
            message,
        }
    }
}

/// Outcome of a successful dump.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpReport {
    /// Module reference as given.
    pub module: String,
    /// Module file that was loaded, when loaded from a file.
    pub module_path: Option<PathBuf>,
    /// File that was written.
    pub output: PathBuf,
    /// Number of top-level manifest entries.
    pub entries: usize,
    /// Size of the written file.
    pub bytes: usize,
}

impl fmt::Display for DumpReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} entries from {} written to {} ({} bytes)",
            self.entries,
            self.module,
            self.output.display(),
            self.bytes
        )
    }
}
