//! PrepareBaseStep (Source)
//!
//! Materializa la base fijada por contenido en el rootfs de staging y emite
//! el estado inicial de la imagen. La base se resuelve contra el almacén
//! local (`base_store/sha256-<hex>/`) y su digest de árbol se verifica antes
//! de continuar: una base que no coincide con el pin es fatal.

use forge_core::typed_step;
use forge_domain::{ImageConfig, ImageReference, TreeManifest};
use serde::{Deserialize, Serialize};

use crate::artifacts::ImageStateArtifact;
use crate::errors::ProvisionError;
use crate::fsutil::copy_tree;
use crate::steps::{commit_manifest, require_workspace, save_config};
use crate::workspace::WorkspacePaths;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PrepareParams {
    /// Referencia base: `name@sha256:<hex>` o `scratch`.
    pub base: String,
    #[serde(default)]
    pub workspace: WorkspacePaths,
}

fn prepare(p: &PrepareParams) -> Result<ImageStateArtifact, ProvisionError> {
    require_workspace(&p.workspace)?;
    let ws = &p.workspace;
    let reference = ImageReference::parse(&p.base).map_err(ProvisionError::from)?;

    let rootfs = ws.rootfs();
    if rootfs.exists() && std::fs::read_dir(&rootfs)?.next().is_some() {
        // El contrato del invocador es re-ejecutar desde una base limpia
        return Err(ProvisionError::Plan(format!("staging rootfs is not clean: {}", rootfs.display())));
    }
    std::fs::create_dir_all(&rootfs)?;
    std::fs::create_dir_all(ws.tmp_dir())?;

    if let Some(digest) = reference.digest() {
        let src = std::path::Path::new(&ws.base_store).join(format!("sha256-{digest}"));
        if !src.is_dir() {
            return Err(ProvisionError::BaseMismatch(format!("base '{reference}' not present in base store")));
        }
        copy_tree(&src, &rootfs)?;
    }

    let manifest = TreeManifest::from_dir(&rootfs).map_err(ProvisionError::from)?;
    let root = manifest.root_digest();
    if let Some(digest) = reference.digest() {
        if root != digest {
            return Err(ProvisionError::BaseMismatch(format!("base tree digest {root} does not match pin {digest}")));
        }
    }

    commit_manifest(ws, &manifest)?;
    save_config(ws, &ImageConfig::default())?;

    Ok(ImageStateArtifact { base: reference.to_string(),
                            manifest_root: root,
                            layers: vec![],
                            user: None,
                            entrypoint: None,
                            schema_version: 1 })
}

typed_step! {
    source PrepareBaseStep {
        id: "prepare_base",
        output: ImageStateArtifact,
        params: PrepareParams,
        fields { params: PrepareParams }
        , defaults(me) { me.params.clone() }
        , run(_me, p) {
            prepare(&p).map_err(Into::into)
        }
    }
}
