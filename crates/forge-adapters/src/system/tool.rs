//! Invocación de herramientas externas con captura de salida.

use std::process::Command;

use crate::errors::ProvisionError;

/// Salida capturada de una herramienta.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.status == 0
    }

    /// Última porción de stderr para mensajes de error compactos.
    pub fn stderr_tail(&self) -> String {
        const TAIL: usize = 240;
        let trimmed = self.stderr.trim();
        if trimmed.len() <= TAIL {
            trimmed.to_string()
        } else {
            trimmed.chars().skip(trimmed.chars().count().saturating_sub(TAIL)).collect()
        }
    }
}

/// Ejecución de un programa externo. `Err` es fallo de spawn; un exit code
/// distinto de cero es un `ToolOutput` no exitoso que interpreta cada step.
pub trait ToolRunner: Send + Sync {
    fn run(&self, program: &str, args: &[String]) -> Result<ToolOutput, ProvisionError>;
}

/// Runner real sobre `std::process::Command`.
#[derive(Debug, Default)]
pub struct SystemToolRunner;

impl SystemToolRunner {
    pub fn new() -> Self {
        Self
    }
}

impl ToolRunner for SystemToolRunner {
    fn run(&self, program: &str, args: &[String]) -> Result<ToolOutput, ProvisionError> {
        log::debug!("running '{}' {:?}", program, args);
        let output = Command::new(program).args(args)
                                          .output()
                                          .map_err(|e| ProvisionError::Io(format!("cannot run '{program}': {e}")))?;
        Ok(ToolOutput { status: output.status.code().unwrap_or(-1),
                        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                        stderr: String::from_utf8_lossy(&output.stderr).into_owned() })
    }
}
