//! StageBinaryStep (Transform)
//!
//! Copia el binario pre-compilado del proxy desde el build context a su ruta
//! fija dentro del rootfs, con modo 0755. No compila nada: un binario ausente
//! en el context es fatal antes de aprovisionar identidad alguna.

use std::fs;
use std::path::Path;

use forge_core::typed_step;
use forge_domain::TreeManifest;
use serde::{Deserialize, Serialize};

use crate::artifacts::ImageStateArtifact;
use crate::errors::ProvisionError;
use crate::steps::{commit_manifest, require_workspace, verify_state};
use crate::workspace::WorkspacePaths;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StageParams {
    /// Ruta del binario relativa al build context.
    pub source: String,
    /// Ruta absoluta de destino dentro de la imagen.
    pub dest: String,
    #[serde(default)]
    pub workspace: WorkspacePaths,
}

impl Default for StageParams {
    fn default() -> Self {
        Self { source: "proxy".to_string(),
               dest: "/usr/local/bin/proxy".to_string(),
               workspace: WorkspacePaths::default() }
    }
}

fn stage(inp: ImageStateArtifact, p: &StageParams) -> Result<ImageStateArtifact, ProvisionError> {
    require_workspace(&p.workspace)?;
    let ws = &p.workspace;
    let prev = verify_state(ws, &inp.manifest_root)?;

    let source = Path::new(&ws.context_dir).join(&p.source);
    if !source.is_file() {
        return Err(ProvisionError::MissingArtifact(format!("'{}' not present in build context", p.source)));
    }
    if !p.dest.starts_with('/') {
        return Err(ProvisionError::Plan(format!("binary dest must be absolute: '{}'", p.dest)));
    }

    let target = ws.rootfs().join(p.dest.trim_start_matches('/'));
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(&source, &target)?;
    mark_executable(&target)?;

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

#[cfg(unix)]
fn mark_executable(path: &Path) -> Result<(), ProvisionError> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = fs::metadata(path)?.permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms)?;
    Ok(())
}

#[cfg(not(unix))]
fn mark_executable(_path: &Path) -> Result<(), ProvisionError> {
    Ok(())
}

typed_step! {
    step StageBinaryStep {
        id: "stage_binary",
        kind: forge_core::step::StepKind::Transform,
        input: ImageStateArtifact,
        output: ImageStateArtifact,
        params: StageParams,
        fields { params: StageParams }
        , defaults(me) { me.params.clone() }
        , run(_me, inp, p) {
            stage(inp, &p).map_err(Into::into)
        }
    }
}
