//! InstallToolchainStep (Transform)
//!
//! Instala la dependencia nativa de runtime del proxy dentro de la imagen:
//! adquiere el paquete instalador en el área temporal, verifica su digest si
//! el plan lo declara y lo invoca con un argv determinista. Antes de tocar el
//! instalador se asegura de que el servicio instalador del host esté sano
//! (precondición idempotente: el ciclo unregister/register sólo corre cuando
//! la sonda falla, nunca incondicionalmente).
//!
//! No es idempotente ante fallos parciales: un fallo aquí invalida el build
//! completo y se re-ejecuta desde una base limpia.

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use forge_core::step::{StepKind, StepRunResultTyped, TypedStep};
use forge_domain::TreeManifest;
use serde::{Deserialize, Serialize};

use crate::artifacts::ImageStateArtifact;
use crate::errors::ProvisionError;
use crate::steps::{commit_manifest, require_workspace, verify_state};
use crate::system::fetch::Fetcher;
use crate::system::tool::{ToolOutput, ToolRunner};
use crate::workspace::WorkspacePaths;

/// Opciones reconocidas del instalador, renderizadas a un argv estable.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallerOptions {
    /// Suprimir UI interactiva.
    pub quiet: bool,
    /// Diferir cualquier reinicio.
    pub norestart: bool,
    /// Idioma fijo de los mensajes del instalador.
    pub locale: Option<String>,
    /// No auto-actualizar el instalador.
    pub no_update_installer: bool,
    /// No retener cache del instalador en la imagen.
    pub nocache: bool,
    /// Bloquear hasta que la instalación termine.
    pub wait: bool,
    /// Componentes del toolchain a instalar.
    pub workloads: Vec<String>,
    /// Ruta absoluta de instalación dentro de la imagen.
    pub install_path: String,
}

impl Default for InstallerOptions {
    fn default() -> Self {
        Self { quiet: true,
               norestart: true,
               locale: None,
               no_update_installer: true,
               nocache: true,
               wait: true,
               workloads: Vec::new(),
               install_path: "/opt/toolchain".to_string() }
    }
}

impl InstallerOptions {
    /// Argv determinista: el orden de las banderas es fijo y los workloads
    /// conservan el orden declarado en el plan.
    pub fn render_args(&self, staged_install: &Path) -> Vec<String> {
        let mut args = Vec::new();
        if self.quiet {
            args.push("--quiet".to_string());
        }
        if self.norestart {
            args.push("--norestart".to_string());
        }
        if let Some(locale) = &self.locale {
            args.push("--locale".to_string());
            args.push(locale.clone());
        }
        if self.no_update_installer {
            args.push("--noUpdateInstaller".to_string());
        }
        if self.nocache {
            args.push("--nocache".to_string());
        }
        if self.wait {
            args.push("--wait".to_string());
        }
        for workload in &self.workloads {
            args.push("--add".to_string());
            args.push(workload.clone());
        }
        args.push("--installPath".to_string());
        args.push(staged_install.to_string_lossy().into_owned());
        args
    }
}

/// Comandos del servicio instalador del host: sonda de salud y ciclo de
/// re-registro. Cada comando es `[programa, args...]`; vacío = no aplica.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ServiceCommands {
    pub probe: Vec<String>,
    pub unregister: Vec<String>,
    pub register: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolchainParams {
    /// URL de descarga del instalador (`http(s)://` o `file://`).
    pub url: String,
    /// Digest sha256 esperado del paquete (`sha256:<hex>` o hex pelado).
    pub expected_digest: Option<String>,
    pub options: InstallerOptions,
    /// Timeout de la descarga, en segundos.
    pub timeout_secs: u64,
    /// Servicio instalador del host, si la base lo requiere.
    pub service: Option<ServiceCommands>,
    #[serde(default)]
    pub workspace: WorkspacePaths,
}

impl Default for ToolchainParams {
    fn default() -> Self {
        Self { url: String::new(),
               expected_digest: None,
               options: InstallerOptions::default(),
               timeout_secs: 300,
               service: None,
               workspace: WorkspacePaths::default() }
    }
}

/// Step de instalación del toolchain con costuras inyectadas.
#[derive(Clone)]
pub struct InstallToolchainStep {
    params: ToolchainParams,
    fetcher: Arc<dyn Fetcher>,
    runner: Arc<dyn ToolRunner>,
}

impl InstallToolchainStep {
    pub fn new(params: ToolchainParams, fetcher: Arc<dyn Fetcher>, runner: Arc<dyn ToolRunner>) -> Self {
        Self { params, fetcher, runner }
    }
}

impl fmt::Debug for InstallToolchainStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstallToolchainStep").field("params", &self.params).finish()
    }
}

impl TypedStep for InstallToolchainStep {
    type Params = ToolchainParams;
    type Input = ImageStateArtifact;
    type Output = ImageStateArtifact;

    fn id(&self) -> &'static str {
        "install_toolchain"
    }

    fn kind(&self) -> StepKind {
        StepKind::Transform
    }

    fn params_default(&self) -> Self::Params {
        self.params.clone()
    }

    fn run_typed(&self, input: Option<Self::Input>, params: Self::Params) -> StepRunResultTyped<Self::Output> {
        let inp = match input {
            Some(i) => i,
            None => {
                return StepRunResultTyped::Failure { error: forge_core::PipelineError::MissingInputs }
            }
        };
        match self.install(inp, &params) {
            Ok(out) => StepRunResultTyped::Success { outputs: vec![out] },
            Err(e) => StepRunResultTyped::Failure { error: e.into() },
        }
    }
}

impl InstallToolchainStep {
    fn install(&self, inp: ImageStateArtifact, p: &ToolchainParams) -> Result<ImageStateArtifact, ProvisionError> {
        require_workspace(&p.workspace)?;
        let ws = &p.workspace;
        let prev = verify_state(ws, &inp.manifest_root)?;

        ensure_service_healthy(self.runner.as_ref(), p.service.as_ref())?;

        let package = self.fetcher.fetch(&p.url, &ws.tmp_dir(), Duration::from_secs(p.timeout_secs))?;
        if let Some(expected) = &p.expected_digest {
            let expected = expected.strip_prefix("sha256:").unwrap_or(expected);
            if package.digest != expected {
                return Err(ProvisionError::Download(format!("digest mismatch for '{}': got {}, expected {}",
                                                            p.url, package.digest, expected)));
            }
        }

        let staged_install = ws.rootfs().join(p.options.install_path.trim_start_matches('/'));
        std::fs::create_dir_all(&staged_install)?;

        let args = p.options.render_args(&staged_install);
        let out = self.runner.run(&package.path.to_string_lossy(), &args)?;
        if !out.success() {
            return Err(ProvisionError::Installer(format!("'{}' exited with status {}: {}",
                                                         package.path.display(),
                                                         out.status,
                                                         out.stderr_tail())));
        }

        let manifest = TreeManifest::from_dir(&ws.rootfs()).map_err(ProvisionError::from)?;
        let layer = manifest.diff(&prev).digest();
        commit_manifest(ws, &manifest)?;

        let mut layers = inp.layers;
        layers.push(layer);
        Ok(ImageStateArtifact { base: inp.base,
                                manifest_root: manifest.root_digest(),
                                layers,
                                user: inp.user,
                                entrypoint: inp.entrypoint,
                                schema_version: 1 })
    }
}

/// Precondición "servicio instalador sano".
///
/// Sonda primero; sólo si la sonda falla se ejecuta el ciclo
/// unregister/register y se vuelve a sondear. Así un servicio sano nunca se
/// toca y un fallo real de registro no queda enmascarado.
fn ensure_service_healthy(runner: &dyn ToolRunner, service: Option<&ServiceCommands>) -> Result<(), ProvisionError> {
    let Some(service) = service else {
        return Ok(());
    };
    if service.probe.is_empty() {
        return Ok(());
    }

    if probe_ok(runner, &service.probe) {
        return Ok(());
    }
    log::warn!("installer service probe failed; re-registering");

    for command in [&service.unregister, &service.register] {
        if command.is_empty() {
            continue;
        }
        let out = run_command(runner, command).map_err(|e| ProvisionError::RegistrationToggle(e.to_string()))?;
        if !out.success() {
            return Err(ProvisionError::RegistrationToggle(format!("'{}' exited with status {}: {}",
                                                                  command[0],
                                                                  out.status,
                                                                  out.stderr_tail())));
        }
    }

    if !probe_ok(runner, &service.probe) {
        return Err(ProvisionError::RegistrationToggle("installer service still unhealthy after re-register"
                                                          .to_string()));
    }
    Ok(())
}

fn probe_ok(runner: &dyn ToolRunner, probe: &[String]) -> bool {
    matches!(run_command(runner, probe), Ok(out) if out.success())
}

fn run_command(runner: &dyn ToolRunner, command: &[String]) -> Result<ToolOutput, ProvisionError> {
    runner.run(&command[0], &command[1..])
}
