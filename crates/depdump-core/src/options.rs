//! Dump configuration

use crate::types::{ReferenceMode, SourceFormat};
use std::path::PathBuf;

/// Attribute read from a module when none is configured.
pub const DEFAULT_ATTRIBUTE: &str = "deps";

/// Indentation width of the written JSON when none is configured.
pub const DEFAULT_INDENT: usize = 2;

/// External program used to load a module out of process.
///
/// The program is run as `program args... <reference>` without a shell and
/// must print the module's attributes as a JSON object on stdout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Program to run.
    pub program: String,
    /// Arguments passed before the module reference.
    pub args: Vec<String>,
}

impl CommandSpec {
    /// Create a command spec with no extra arguments
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }
}

/// Options controlling how a manifest is loaded and written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpOptions {
    /// Attribute holding the manifest (default: `deps`).
    pub attribute: String,

    /// How the module reference is interpreted.
    pub mode: ReferenceMode,

    /// Forces the module format instead of inferring it from the extension.
    pub format: Option<SourceFormat>,

    /// Directories searched, in order, when loading by name.
    /// Empty means the current directory.
    pub search_paths: Vec<PathBuf>,

    /// Loads the module through an external program instead of reading it.
    pub command: Option<CommandSpec>,

    /// Spaces per indentation level in the output (default: 2).
    pub indent: usize,
}

impl Default for DumpOptions {
    fn default() -> Self {
        Self {
            attribute: DEFAULT_ATTRIBUTE.to_string(),
            mode: ReferenceMode::Auto,
            format: None,
            search_paths: Vec::new(),
            command: None,
            indent: DEFAULT_INDENT,
        }
    }
}
