//! Almacén de imágenes publicadas.
//!
//! Sólo un build terminado se publica: el registro lleva identidad y
//! entrypoint obligatorios y la cadena de capas direccionada por contenido.
//! Un build fallido deja sus capas en el event log pero nunca aparece aquí.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use forge_domain::ImageConfig;
use serde::{Deserialize, Serialize};

use crate::error::PersistenceError;

/// Registro publicado de una imagen completa.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishedImage {
    pub name: String,
    pub base: String,
    /// Digest sha256 del árbol final (identidad de publicación).
    pub manifest_root: String,
    /// Digests de capas en orden de build.
    pub layers: Vec<String>,
    pub config: ImageConfig,
    /// Fingerprint agregado del pipeline que la produjo.
    pub pipeline_fingerprint: String,
    pub published_at: DateTime<Utc>,
}

/// Imágenes en `<root>/images/<name>/sha256-<manifest_root>/image.json`.
pub struct ImageStore {
    images_dir: PathBuf,
}

impl ImageStore {
    pub fn open(root: &Path) -> Result<Self, PersistenceError> {
        let images_dir = root.join("images");
        fs::create_dir_all(&images_dir)?;
        Ok(Self { images_dir })
    }

    fn image_dir(&self, name: &str, manifest_root: &str) -> PathBuf {
        self.images_dir.join(name).join(format!("sha256-{manifest_root}"))
    }

    /// Publica una imagen terminada y retorna su directorio.
    ///
    /// # Errores
    /// `PersistenceError::Incomplete` si falta identidad o entrypoint: un
    /// build a medias no se publica jamás.
    pub fn publish(&self, image: &PublishedImage) -> Result<PathBuf, PersistenceError> {
        if image.config.user.is_none() {
            return Err(PersistenceError::Incomplete("runtime identity missing".to_string()));
        }
        if image.config.entrypoint.is_none() {
            return Err(PersistenceError::Incomplete("entrypoint missing".to_string()));
        }
        if image.manifest_root.is_empty() {
            return Err(PersistenceError::Incomplete("manifest root missing".to_string()));
        }

        let dir = self.image_dir(&image.name, &image.manifest_root);
        fs::create_dir_all(&dir)?;
        let text = serde_json::to_string_pretty(image)?;
        fs::write(dir.join("image.json"), text)?;
        Ok(dir)
    }

    pub fn load(&self, name: &str, manifest_root: &str) -> Result<PublishedImage, PersistenceError> {
        let text = fs::read_to_string(self.image_dir(name, manifest_root).join("image.json"))?;
        Ok(serde_json::from_str(&text)?)
    }
}
