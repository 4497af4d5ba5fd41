//! Module loaders
//!
//! A loader turns a [`ModuleReference`] into a [`LoadedModule`]: a namespace of
//! named attributes from which the manifest is read. Files are parsed
//! according to their [`SourceFormat`]; modules that can only be produced by
//! running code are loaded out of process by [`CommandLoader`].

mod command;
mod structured;

pub use command::CommandLoader;

use crate::deps_file::{self, Namespace};
use crate::reference::{ModuleReference, ResolvedModule};
use crate::types::SourceFormat;
use crate::{Error, Result};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Loads modules from references.
pub trait ModuleLoader {
    /// Load the module identified by `reference`
    ///
    /// # Errors
    /// Returns a load-category [`Error`] if the module cannot be found, read,
    /// parsed or evaluated.
    fn load(&self, reference: &ModuleReference) -> Result<LoadedModule>;
}

/// Attributes of a loaded module, kept in their source representation until
/// one is read.
#[derive(Debug, Clone)]
enum Attributes {
    Json(Map<String, Value>),
    Toml(toml::Table),
    Yaml(serde_yaml::Mapping),
    Deps(Namespace),
}

/// A module whose top-level attributes can be read as JSON.
#[derive(Debug, Clone)]
pub struct LoadedModule {
    name: String,
    path: Option<PathBuf>,
    attributes: Attributes,
}

impl LoadedModule {
    /// Build a module from a JSON object of attributes
    pub fn from_json(name: impl Into<String>, path: Option<PathBuf>, attributes: Map<String, Value>) -> Self {
        Self {
            name: name.into(),
            path,
            attributes: Attributes::Json(attributes),
        }
    }

    /// The module reference this module was loaded from.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The file the module was read from, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Names of all attributes, in source order.
    pub fn attribute_names(&self) -> Vec<String> {
        match &self.attributes {
            Attributes::Json(map) => map.keys().cloned().collect(),
            Attributes::Toml(table) => table.keys().cloned().collect(),
            Attributes::Yaml(mapping) => mapping
                .keys()
                .filter_map(|key| key.as_str().map(str::to_string))
                .collect(),
            Attributes::Deps(namespace) => namespace.names().map(str::to_string).collect(),
        }
    }

    /// Reads attribute `name` as JSON.
    ///
    /// # Errors
    /// Returns [`Error::MissingAttribute`] if the module does not define
    /// `name`, or [`Error::NotSerializable`] if its value has no JSON form.
    pub fn attribute(&self, name: &str) -> Result<Value> {
        let converted = match &self.attributes {
            Attributes::Json(map) => map.get(name).map(|value| Ok(value.clone())),
            Attributes::Toml(table) => table.get(name).map(structured::toml_to_json),
            Attributes::Yaml(mapping) => mapping.get(name).map(structured::yaml_to_json),
            Attributes::Deps(namespace) => namespace.get(name).map(|value| value.to_json()),
        };

        match converted {
            Some(Ok(value)) => Ok(value),
            Some(Err(message)) => Err(Error::NotSerializable {
                attribute: name.to_string(),
                message,
            }),
            None => Err(Error::MissingAttribute {
                module: self.name.clone(),
                attribute: name.to_string(),
            }),
        }
    }
}

/// Loads modules from files, resolving names against a search path.
#[derive(Debug, Clone, Default)]
pub struct FileModuleLoader {
    search_paths: Vec<PathBuf>,
    format: Option<SourceFormat>,
}

impl FileModuleLoader {
    /// Create a loader searching `search_paths` for by-name references
    pub fn new(search_paths: Vec<PathBuf>) -> Self {
        Self {
            search_paths,
            format: None,
        }
    }

    /// Parse every module as `format` regardless of its extension
    pub fn with_format(mut self, format: Option<SourceFormat>) -> Self {
        self.format = format;
        self
    }
}

impl ModuleLoader for FileModuleLoader {
    fn load(&self, reference: &ModuleReference) -> Result<LoadedModule> {
        let resolved = reference.resolve(&self.search_paths, self.format)?;
        load_file(&resolved)
    }
}

/// Reads and parses a resolved module file.
///
/// # Errors
/// Returns a load-category [`Error`] if the file cannot be read or parsed.
pub fn load_file(module: &ResolvedModule) -> Result<LoadedModule> {
    let source = std::fs::read_to_string(&module.path).map_err(|source| Error::ModuleRead {
        path: module.path.clone(),
        source,
    })?;

    let attributes = match module.format {
        SourceFormat::Deps => {
            let namespace = deps_file::evaluate(&source).map_err(|source| Error::ModuleEval {
                path: module.path.clone(),
                source,
            })?;
            Attributes::Deps(namespace)
        }
        SourceFormat::Json => Attributes::Json(structured::parse_json(&source, &module.path)?),
        SourceFormat::Toml => Attributes::Toml(structured::parse_toml(&source, &module.path)?),
        SourceFormat::Yaml => Attributes::Yaml(structured::parse_yaml(&source, &module.path)?),
    };

    let module = LoadedModule {
        name: module.reference.clone(),
        path: Some(module.path.clone()),
        attributes,
    };
    tracing::debug!(
        module = %module.name,
        attributes = module.attribute_names().len(),
        "Loaded module"
    );
    Ok(module)
}
