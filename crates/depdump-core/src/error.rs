//! Error types for depdump-core

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using depdump-core Error
pub type Result<T> = std::result::Result<T, Error>;

/// Broad failure classes, one per way a dump can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The module could not be found, read, parsed or evaluated.
    Load,
    /// The module loaded but lacks the requested attribute.
    Attribute,
    /// The attribute value has no JSON representation.
    Serialization,
    /// The output file could not be written.
    Io,
}

impl ErrorCategory {
    /// Process exit code reported for this category.
    pub fn exit_code(self) -> u8 {
        match self {
            ErrorCategory::Load => 3,
            ErrorCategory::Attribute => 4,
            ErrorCategory::Serialization => 5,
            ErrorCategory::Io => 6,
        }
    }
}

/// Errors that can occur while dumping a manifest
#[derive(Debug, Error)]
pub enum Error {
    /// No module file exists for the reference.
    #[error("module '{reference}' not found{}", searched_suffix(.searched))]
    ModuleNotFound {
        /// Reference as given by the caller.
        reference: String,
        /// Candidate files that were tried.
        searched: Vec<PathBuf>,
    },

    /// A by-name reference is not a valid dotted module name.
    #[error("invalid module name '{name}': {reason}")]
    InvalidModuleName {
        /// The rejected name.
        name: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The module file exists but could not be read.
    #[error("failed to read module {path}: {source}")]
    ModuleRead {
        /// Module file path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The module source is malformed.
    #[error("failed to parse module {path} as {format}: {message}")]
    ModuleParse {
        /// Module file path.
        path: PathBuf,
        /// Format the module was parsed as.
        format: String,
        /// Parser diagnostic.
        message: String,
    },

    /// Evaluating a DEPS module failed.
    #[error("failed to load module {path}: {source}")]
    ModuleEval {
        /// Module file path.
        path: PathBuf,
        /// Position and cause of the failure.
        #[source]
        source: crate::deps_file::DepsFileError,
    },

    /// The loader command could not be started.
    #[error("failed to run loader command '{program}' for module '{reference}': {source}")]
    CommandSpawn {
        /// Program that was spawned.
        program: String,
        /// Reference passed to the program.
        reference: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The loader command ran but did not produce a module.
    #[error("loader command '{program}' failed for module '{reference}' ({status}){}", stderr_suffix(.stderr))]
    CommandFailed {
        /// Program that was run.
        program: String,
        /// Reference passed to the program.
        reference: String,
        /// Exit status or output problem.
        status: String,
        /// Captured standard error, trimmed.
        stderr: String,
    },

    /// The module has no attribute with the requested name.
    #[error("module '{module}' has no attribute '{attribute}'")]
    MissingAttribute {
        /// Module that was loaded.
        module: String,
        /// Requested attribute.
        attribute: String,
    },

    /// The attribute value cannot be represented as JSON.
    #[error("attribute '{attribute}' is not JSON serializable: {message}")]
    NotSerializable {
        /// Attribute being serialized.
        attribute: String,
        /// What could not be represented.
        message: String,
    },

    /// Writing the output file failed.
    #[error("failed to write {path}: {source}")]
    Write {
        /// Output file path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// The failure class of this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::ModuleNotFound { .. }
            | Error::InvalidModuleName { .. }
            | Error::ModuleRead { .. }
            | Error::ModuleParse { .. }
            | Error::ModuleEval { .. }
            | Error::CommandSpawn { .. }
            | Error::CommandFailed { .. } => ErrorCategory::Load,
            Error::MissingAttribute { .. } => ErrorCategory::Attribute,
            Error::NotSerializable { .. } => ErrorCategory::Serialization,
            Error::Write { .. } => ErrorCategory::Io,
        }
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        self.category().exit_code()
    }
}

fn searched_suffix(searched: &[PathBuf]) -> String {
    if searched.is_empty() {
        return String::new();
    }
    let paths: Vec<String> = searched.iter().map(|p| p.display().to_string()).collect();
    format!(" (searched: {})", paths.join(", "))
}

fn stderr_suffix(stderr: &str) -> String {
    if stderr.is_empty() {
        String::new()
    } else {
        format!(": {stderr}")
    }
}
