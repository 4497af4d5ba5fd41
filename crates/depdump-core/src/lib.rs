//! # depdump-core
//!
//! Loads a module that defines a dependency manifest (a mapping named `deps`)
//! and writes that mapping to disk as indented JSON.
//!
//! The crate provides functionality to:
//! - Resolve module references given as file paths or dotted module names
//! - Evaluate gclient-style DEPS files without executing them
//! - Read JSON, TOML and YAML modules
//! - Load modules out of process through an external command
//! - Serialize the manifest with stable key order and write it atomically
//!
//! The manifest itself is never validated or transformed: what goes in is what
//! comes out, in the order the module defined it.
//!
//! ## Example
//!
//! ```rust,no_run
//! use depdump_core::{DumpOptions, Dumper};
//! use std::path::Path;
//!
//! # fn example() -> depdump_core::Result<()> {
//! let dumper = Dumper::new(DumpOptions::default());
//! let report = dumper.dump("chromium_deps", Path::new("chromium_deps.json"))?;
//! println!("{report}");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod deps_file;
pub mod dump;
pub mod error;
pub mod loader;
pub mod options;
pub mod reference;
pub mod types;

// Re-export main types
pub use dump::{dump, Dumper};
pub use error::{Error, ErrorCategory, Result};
pub use loader::{CommandLoader, FileModuleLoader, LoadedModule, ModuleLoader};
pub use options::{CommandSpec, DumpOptions, DEFAULT_ATTRIBUTE, DEFAULT_INDENT};
pub use reference::{ModuleReference, ReferenceKind, ResolvedModule};
pub use types::{DumpReport, Manifest, ReferenceMode, SourceFormat};
