//! Loading a manifest and writing it as JSON

use crate::loader::{CommandLoader, FileModuleLoader, ModuleLoader};
use crate::options::DumpOptions;
use crate::reference::ModuleReference;
use crate::types::{DumpReport, Manifest};
use crate::{Error, Result};
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

/// Loads manifests from modules and writes them to JSON files.
#[derive(Debug, Clone, Default)]
pub struct Dumper {
    options: DumpOptions,
}

impl Dumper {
    /// Create a dumper with the given options
    pub fn new(options: DumpOptions) -> Self {
        Self { options }
    }

    /// The options this dumper was built with.
    pub fn options(&self) -> &DumpOptions {
        &self.options
    }

    fn loader(&self) -> Box<dyn ModuleLoader> {
        match &self.options.command {
            Some(spec) => Box::new(CommandLoader::new(spec.clone())),
            None => Box::new(
                FileModuleLoader::new(self.options.search_paths.clone())
                    .with_format(self.options.format),
            ),
        }
    }

    /// Loads the module and reads its manifest attribute without writing
    /// anything.
    ///
    /// # Errors
    /// Returns a load, attribute or serialization [`Error`].
    pub fn load_manifest(&self, reference: &str) -> Result<Manifest> {
        self.read(reference).map(|(manifest, _)| manifest)
    }

    /// Loads the manifest from `reference` and writes it to `output`.
    ///
    /// The JSON text is produced in full before the output is touched and is
    /// then moved into place, so a failed run never leaves a partial or empty
    /// file and an existing output is only replaced on success.
    ///
    /// # Errors
    /// Returns a load, attribute, serialization or I/O [`Error`].
    pub fn dump(&self, reference: &str, output: &Path) -> Result<DumpReport> {
        let (manifest, module_path) = self.read(reference)?;

        let contents = manifest.to_json_string(self.options.indent)?;
        write_output(output, contents.as_bytes())?;

        let report = DumpReport {
            module: manifest.module.clone(),
            module_path,
            output: output.to_path_buf(),
            entries: manifest.entry_count(),
            bytes: contents.len(),
        };
        tracing::info!(
            output = %report.output.display(),
            entries = report.entries,
            bytes = report.bytes,
            "Wrote manifest"
        );
        Ok(report)
    }

    fn read(&self, reference: &str) -> Result<(Manifest, Option<PathBuf>)> {
        let reference = ModuleReference::new(reference, self.options.mode)?;
        tracing::info!(module = %reference, "Loading module");

        let module = self.loader().load(&reference)?;
        let manifest = Manifest {
            module: module.name().to_string(),
            attribute: self.options.attribute.clone(),
            value: module.attribute(&self.options.attribute)?,
        };
        tracing::debug!(
            attribute = %manifest.attribute,
            entries = manifest.entry_count(),
            "Read manifest"
        );

        Ok((manifest, module.path().map(Path::to_path_buf)))
    }
}

/// Dumps the `deps` attribute of `reference` to `output` with default options.
///
/// # Errors
/// Returns a load, attribute, serialization or I/O [`Error`].
pub fn dump(reference: &str, output: impl AsRef<Path>) -> Result<DumpReport> {
    Dumper::default().dump(reference, output.as_ref())
}

/// Temporary sibling of `path` used while writing.
fn temp_path(path: &Path) -> Option<PathBuf> {
    let file_name = path.file_name()?;
    let mut temp_name = OsString::from(".");
    temp_name.push(file_name);
    temp_name.push(".tmp");
    Some(path.with_file_name(temp_name))
}

/// Symlink hops followed before giving up, as the kernel does with `ELOOP`.
const MAX_SYMLINK_HOPS: usize = 40;

/// The file a write to `path` lands in. Symlinks are followed, dangling ones
/// included, so the link itself stays in place.
fn write_target(path: &Path) -> PathBuf {
    let mut target = path.to_path_buf();
    for _ in 0..MAX_SYMLINK_HOPS {
        let Ok(link) = std::fs::read_link(&target) else {
            break;
        };
        target = match target.parent() {
            Some(parent) => parent.join(link),
            None => link,
        };
    }
    target
}

/// Writes `contents` to a temporary file next to the file `path` resolves to,
/// then renames it over that file. An existing file keeps its permissions.
fn write_output(path: &Path, contents: &[u8]) -> Result<()> {
    let write_error = |source: io::Error| Error::Write {
        path: path.to_path_buf(),
        source,
    };

    let target = write_target(path);
    if target.as_path() != path {
        tracing::debug!(output = %path.display(), target = %target.display(), "Writing through symlink");
    }

    let temp = temp_path(&target).ok_or_else(|| {
        write_error(io::Error::new(
            io::ErrorKind::InvalidInput,
            "output path has no file name",
        ))
    })?;

    std::fs::write(&temp, contents).map_err(write_error)?;
    if let Ok(existing) = std::fs::metadata(&target) {
        let _ = std::fs::set_permissions(&temp, existing.permissions());
    }

    if let Err(source) = std::fs::rename(&temp, &target) {
        let _ = std::fs::remove_file(&temp);
        return Err(write_error(source));
    }
    Ok(())
}
