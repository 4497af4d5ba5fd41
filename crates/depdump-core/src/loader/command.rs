//! Out-of-process module loading

use super::{LoadedModule, ModuleLoader};
use crate::options::CommandSpec;
use crate::reference::ModuleReference;
use crate::{Error, Result};
use serde_json::Value;
use std::process::{Command, Stdio};

/// Loads a module by running an external program.
///
/// The program is invoked as `program args... <reference>` without a shell.
/// It must exit successfully and print the module's attributes as a single
/// JSON object on stdout. Whatever the module executes stays inside that
/// child process.
#[derive(Debug, Clone)]
pub struct CommandLoader {
    spec: CommandSpec,
}

impl CommandLoader {
    /// Create a loader running `spec`
    pub fn new(spec: CommandSpec) -> Self {
        Self { spec }
    }

    fn failed(&self, reference: &ModuleReference, status: String, stderr: String) -> Error {
        Error::CommandFailed {
            program: self.spec.program.clone(),
            reference: reference.as_str().to_string(),
            status,
            stderr,
        }
    }
}

impl ModuleLoader for CommandLoader {
    fn load(&self, reference: &ModuleReference) -> Result<LoadedModule> {
        tracing::debug!(
            program = %self.spec.program,
            args = ?self.spec.args,
            module = %reference,
            "Running loader command"
        );

        let output = Command::new(&self.spec.program)
            .args(&self.spec.args)
            .arg(reference.as_str())
            .stdin(Stdio::null())
            .output()
            .map_err(|source| Error::CommandSpawn {
                program: self.spec.program.clone(),
                reference: reference.as_str().to_string(),
                source,
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if !output.status.success() {
            return Err(self.failed(reference, output.status.to_string(), stderr));
        }

        let value: Value = serde_json::from_slice(&output.stdout)
            .map_err(|e| self.failed(reference, format!("invalid JSON on stdout: {e}"), stderr.clone()))?;
        let Value::Object(attributes) = value else {
            return Err(self.failed(
                reference,
                "stdout is not a JSON object".to_string(),
                stderr,
            ));
        };

        Ok(LoadedModule::from_json(reference.as_str(), None, attributes))
    }
}
