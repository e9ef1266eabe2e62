//! Steps concretos del pipeline de aprovisionamiento.
//!
//! El orden declarado es estricto y cada paso consume el estado de archivos
//! que dejó el anterior:
//! `prepare_base` → `install_toolchain` → `stage_binary` →
//! `provision_identity` → `bind_entrypoint`.

pub mod entrypoint;
pub mod identity;
pub mod prepare;
pub mod stage;
pub mod toolchain;

use std::fs;

use forge_domain::{ImageConfig, TreeManifest};

use crate::errors::ProvisionError;
use crate::workspace::WorkspacePaths;

/// Carga el manifiesto que dejó el paso anterior y verifica que tanto él como
/// el rootfs real coincidan con el estado declarado en el artifact de
/// entrada. Cualquier divergencia significa que el staging fue tocado por
/// fuera del pipeline y el build no es confiable.
pub(crate) fn verify_state(ws: &WorkspacePaths, expected_root: &str) -> Result<TreeManifest, ProvisionError> {
    let recorded = load_manifest(ws)?;
    if recorded.root_digest() != expected_root {
        return Err(ProvisionError::BaseMismatch("recorded manifest does not match the previous layer".to_string()));
    }
    let actual = TreeManifest::from_dir(&ws.rootfs()).map_err(ProvisionError::from)?;
    if actual.root_digest() != expected_root {
        return Err(ProvisionError::BaseMismatch("staging rootfs was modified outside the pipeline".to_string()));
    }
    Ok(recorded)
}

pub(crate) fn load_manifest(ws: &WorkspacePaths) -> Result<TreeManifest, ProvisionError> {
    let text = fs::read_to_string(ws.manifest_path())
        .map_err(|e| ProvisionError::Io(format!("manifest '{}': {e}", ws.manifest_path().display())))?;
    serde_json::from_str(&text).map_err(|e| ProvisionError::Io(format!("manifest decode: {e}")))
}

pub(crate) fn commit_manifest(ws: &WorkspacePaths, manifest: &TreeManifest) -> Result<(), ProvisionError> {
    let text = serde_json::to_string_pretty(manifest).map_err(|e| ProvisionError::Io(e.to_string()))?;
    fs::write(ws.manifest_path(), text)?;
    Ok(())
}

pub(crate) fn load_config(ws: &WorkspacePaths) -> Result<ImageConfig, ProvisionError> {
    let text = fs::read_to_string(ws.config_path())
        .map_err(|e| ProvisionError::Io(format!("config '{}': {e}", ws.config_path().display())))?;
    ImageConfig::from_json(&text).map_err(ProvisionError::from)
}

pub(crate) fn save_config(ws: &WorkspacePaths, config: &ImageConfig) -> Result<(), ProvisionError> {
    let text = config.to_json().map_err(ProvisionError::from)?;
    fs::write(ws.config_path(), text)?;
    Ok(())
}

pub(crate) fn require_workspace(ws: &WorkspacePaths) -> Result<(), ProvisionError> {
    if !ws.is_configured() {
        return Err(ProvisionError::Plan("workspace paths were not injected".to_string()));
    }
    Ok(())
}
