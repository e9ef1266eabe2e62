//! Rutas del workspace de build.
//!
//! El área de staging es propiedad exclusiva del pipeline mientras dura el
//! build: `rootfs/` (el árbol de la imagen en construcción), `manifest.json`
//! (la instantánea que dejó el último paso), `config.json` (identidad y
//! entrypoint) y `tmp/` (descargas). El build context es de sólo lectura.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspacePaths {
    /// Build context de sólo lectura (contiene el binario pre-compilado).
    pub context_dir: String,
    /// Área de staging exclusiva del build.
    pub staging_dir: String,
    /// Almacén local de bases direccionadas por contenido.
    pub base_store: String,
}

impl WorkspacePaths {
    pub fn new(context_dir: impl Into<String>, staging_dir: impl Into<String>, base_store: impl Into<String>) -> Self {
        Self { context_dir: context_dir.into(),
               staging_dir: staging_dir.into(),
               base_store: base_store.into() }
    }

    /// `true` cuando el inyector de workspace ya cableó las rutas.
    pub fn is_configured(&self) -> bool {
        !self.staging_dir.is_empty()
    }

    pub fn rootfs(&self) -> PathBuf {
        Path::new(&self.staging_dir).join("rootfs")
    }

    pub fn manifest_path(&self) -> PathBuf {
        Path::new(&self.staging_dir).join("manifest.json")
    }

    pub fn config_path(&self) -> PathBuf {
        Path::new(&self.staging_dir).join("config.json")
    }

    pub fn tmp_dir(&self) -> PathBuf {
        Path::new(&self.staging_dir).join("tmp")
    }
}
