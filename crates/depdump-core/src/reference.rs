//! Module reference parsing and resolution

use crate::types::{ReferenceMode, SourceFormat};
use crate::{Error, Result};
use std::fmt;
use std::path::{Path, PathBuf};

/// Extensions tried, in order, when resolving a module name.
const NAME_EXTENSIONS: &[&str] = &["py", "json", "toml", "yaml", "yml"];

/// What a module reference points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceKind {
    /// Explicit file location.
    Path(PathBuf),
    /// Dotted module name, resolved against the search path.
    Name(String),
}

/// A reference to a manifest-defining module, as given by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleReference {
    raw: String,
    kind: ReferenceKind,
}

/// A module reference resolved to a concrete file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedModule {
    /// Reference as given.
    pub reference: String,
    /// File the module is read from.
    pub path: PathBuf,
    /// Format the file is parsed as.
    pub format: SourceFormat,
}

impl ModuleReference {
    /// Interprets `raw` according to `mode`.
    ///
    /// In [`ReferenceMode::Auto`] an existing file is taken by path and
    /// anything else that is a valid module name is taken by name.
    ///
    /// # Errors
    /// Returns [`Error::InvalidModuleName`] if `mode` is
    /// [`ReferenceMode::Name`] and `raw` is not a dotted module name.
    pub fn new(raw: impl Into<String>, mode: ReferenceMode) -> Result<Self> {
        let raw = raw.into();
        let kind = match mode {
            ReferenceMode::Path => ReferenceKind::Path(PathBuf::from(&raw)),
            ReferenceMode::Name => {
                validate_module_name(&raw)?;
                ReferenceKind::Name(raw.clone())
            }
            ReferenceMode::Auto => {
                if Path::new(&raw).is_file() || validate_module_name(&raw).is_err() {
                    ReferenceKind::Path(PathBuf::from(&raw))
                } else {
                    ReferenceKind::Name(raw.clone())
                }
            }
        };
        Ok(Self { raw, kind })
    }

    /// The reference exactly as given.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether this is a path or a name.
    pub fn kind(&self) -> &ReferenceKind {
        &self.kind
    }

    /// Locates the module file.
    ///
    /// Paths are used as-is. Names are looked up in each of `search_paths` in
    /// order (the current directory if empty); the first matching file wins.
    /// `format` overrides the format inferred from the file extension.
    ///
    /// # Errors
    /// Returns [`Error::ModuleNotFound`] listing every candidate tried.
    pub fn resolve(
        &self,
        search_paths: &[PathBuf],
        format: Option<SourceFormat>,
    ) -> Result<ResolvedModule> {
        let path = match &self.kind {
            ReferenceKind::Path(path) => {
                if !path.is_file() {
                    return Err(Error::ModuleNotFound {
                        reference: self.raw.clone(),
                        searched: vec![path.clone()],
                    });
                }
                path.clone()
            }
            ReferenceKind::Name(name) => self.find_by_name(name, search_paths)?,
        };

        let format = format.unwrap_or_else(|| SourceFormat::from_path(&path));
        tracing::debug!(module = %self.raw, path = %path.display(), %format, "Resolved module");

        Ok(ResolvedModule {
            reference: self.raw.clone(),
            path,
            format,
        })
    }

    fn find_by_name(&self, name: &str, search_paths: &[PathBuf]) -> Result<PathBuf> {
        let default_search_path = [PathBuf::from(".")];
        let search_paths = if search_paths.is_empty() {
            &default_search_path[..]
        } else {
            search_paths
        };

        let mut searched = Vec::new();
        for dir in search_paths {
            for candidate in name_candidates(dir, name) {
                tracing::trace!(candidate = %candidate.display(), "Trying module candidate");
                if candidate.is_file() {
                    return Ok(candidate);
                }
                searched.push(candidate);
            }
        }

        Err(Error::ModuleNotFound {
            reference: self.raw.clone(),
            searched,
        })
    }
}

impl fmt::Display for ModuleReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Candidate files for module `name` inside `dir`, in lookup order.
fn name_candidates(dir: &Path, name: &str) -> Vec<PathBuf> {
    let stem = name.split('.').fold(dir.to_path_buf(), |path, part| path.join(part));

    let mut candidates = Vec::with_capacity(NAME_EXTENSIONS.len() + 2);
    candidates.push(stem.clone());
    for extension in NAME_EXTENSIONS {
        let mut file_name = stem.as_os_str().to_os_string();
        file_name.push(".");
        file_name.push(extension);
        candidates.push(PathBuf::from(file_name));
    }
    candidates.push(stem.join("__init__.py"));
    candidates
}

/// Checks that `name` is a dotted module name such as `chromium_deps` or
/// `third_party.deps`.
///
/// # Errors
/// Returns [`Error::InvalidModuleName`] describing the first problem.
pub fn validate_module_name(name: &str) -> Result<()> {
    let invalid = |reason: &str| Error::InvalidModuleName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.is_empty() {
        return Err(invalid("name is empty"));
    }

    for segment in name.split('.') {
        let mut chars = segment.chars();
        match chars.next() {
            None => return Err(invalid("empty segment")),
            Some(c) if !(c == '_' || c.is_alphabetic()) => {
                return Err(invalid("segments must start with a letter or underscore"))
            }
            Some(_) => {}
        }
        if !chars.all(|c| c == '_' || c.is_alphanumeric()) {
            return Err(invalid(
                "segments may only contain letters, digits and underscores",
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_validate_module_name() {
        assert!(validate_module_name("chromium_deps").is_ok());
        assert!(validate_module_name("third_party.deps").is_ok());
        assert!(validate_module_name("_private").is_ok());

        assert!(validate_module_name("").is_err());
        assert!(validate_module_name("a..b").is_err());
        assert!(validate_module_name("1deps").is_err());
        assert!(validate_module_name("deps.py").is_ok());
        assert!(validate_module_name("dir/deps.py").is_err());
        assert!(validate_module_name("my-deps").is_err());
    }

    #[test]
    fn test_auto_mode_prefers_existing_file() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("deps.py");
        std::fs::write(&file, "deps = {}").unwrap();

        let reference = ModuleReference::new(file.to_string_lossy(), ReferenceMode::Auto).unwrap();
        assert_eq!(reference.kind(), &ReferenceKind::Path(file.clone()));

        let reference = ModuleReference::new("chromium_deps", ReferenceMode::Auto).unwrap();
        assert_eq!(reference.kind(), &ReferenceKind::Name("chromium_deps".to_string()));

        let reference = ModuleReference::new("missing/dir/DEPS", ReferenceMode::Auto).unwrap();
        assert!(matches!(reference.kind(), ReferenceKind::Path(_)));
    }

    #[test]
    fn test_name_mode_rejects_paths() {
        let err = ModuleReference::new("some/file.py", ReferenceMode::Name).unwrap_err();
        assert!(matches!(err, Error::InvalidModuleName { .. }));
    }

    #[test]
    fn test_path_mode_never_searches() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("chromium_deps.py"), "deps = {}").unwrap();

        let reference = ModuleReference::new("chromium_deps", ReferenceMode::Path).unwrap();
        let err = reference
            .resolve(&[temp_dir.path().to_path_buf()], None)
            .unwrap_err();
        match err {
            Error::ModuleNotFound { searched, .. } => {
                assert_eq!(searched, vec![PathBuf::from("chromium_deps")]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_name_resolution_order() {
        let temp_dir = TempDir::new().unwrap();
        let first = temp_dir.path().join("first");
        let second = temp_dir.path().join("second");
        std::fs::create_dir_all(&first).unwrap();
        std::fs::create_dir_all(&second).unwrap();
        std::fs::write(first.join("chromium_deps.json"), "{}").unwrap();
        std::fs::write(second.join("chromium_deps.py"), "deps = {}").unwrap();

        let reference = ModuleReference::new("chromium_deps", ReferenceMode::Name).unwrap();

        let resolved = reference.resolve(&[first.clone(), second.clone()], None).unwrap();
        assert_eq!(resolved.path, first.join("chromium_deps.json"));
        assert_eq!(resolved.format, SourceFormat::Json);

        let resolved = reference.resolve(&[second.clone(), first], None).unwrap();
        assert_eq!(resolved.path, second.join("chromium_deps.py"));
        assert_eq!(resolved.format, SourceFormat::Deps);
    }

    #[test]
    fn test_dotted_name_and_package_init() {
        let temp_dir = TempDir::new().unwrap();
        let package = temp_dir.path().join("third_party").join("deps");
        std::fs::create_dir_all(&package).unwrap();
        std::fs::write(package.join("__init__.py"), "deps = {}").unwrap();

        let reference = ModuleReference::new("third_party.deps", ReferenceMode::Name).unwrap();
        let resolved = reference.resolve(&[temp_dir.path().to_path_buf()], None).unwrap();
        assert_eq!(resolved.path, package.join("__init__.py"));
    }

    #[test]
    fn test_extensionless_deps_file_and_forced_format() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("DEPS"), "{}").unwrap();

        let reference = ModuleReference::new("DEPS", ReferenceMode::Name).unwrap();
        let resolved = reference.resolve(&[temp_dir.path().to_path_buf()], None).unwrap();
        assert_eq!(resolved.format, SourceFormat::Deps);

        let resolved = reference
            .resolve(&[temp_dir.path().to_path_buf()], Some(SourceFormat::Json))
            .unwrap();
        assert_eq!(resolved.format, SourceFormat::Json);
    }

    #[test]
    fn test_not_found_lists_candidates() {
        let temp_dir = TempDir::new().unwrap();
        let reference = ModuleReference::new("nope", ReferenceMode::Name).unwrap();
        let err = reference.resolve(&[temp_dir.path().to_path_buf()], None).unwrap_err();

        let Error::ModuleNotFound { reference, searched } = err else {
            panic!("expected ModuleNotFound");
        };
        assert_eq!(reference, "nope");
        assert_eq!(searched.len(), 7);
        assert_eq!(searched[0], temp_dir.path().join("nope"));
        assert_eq!(searched[1], temp_dir.path().join("nope.py"));
        assert_eq!(searched[6], temp_dir.path().join("nope").join("__init__.py"));
    }
}
