//! Manifiesto determinista del árbol rootfs.
//!
//! Un `TreeManifest` es la instantánea inmutable del estado del sistema de
//! archivos que deja cada paso del pipeline: rutas relativas ordenadas con
//! modo, tamaño y digest sha256 de contenido. Dos recorridos del mismo árbol
//! producen el mismo manifiesto byte a byte, lo que habilita:
//! - verificación de la base fijada por contenido (`root_digest`),
//! - capas como deltas entre manifiestos consecutivos (`diff`).

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryKind {
    File,
    Dir,
    Symlink,
}

impl EntryKind {
    fn tag(&self) -> &'static str {
        match self {
            EntryKind::File => "f",
            EntryKind::Dir => "d",
            EntryKind::Symlink => "l",
        }
    }
}

/// Registro de una ruta del árbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    pub kind: EntryKind,
    pub mode: u32,
    pub size: u64,
    pub digest: String, // sha256 hex del contenido (vacío para directorios)
}

/// Instantánea inmutable de un árbol de archivos.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeManifest {
    entries: BTreeMap<String, TreeEntry>,
}

impl TreeManifest {
    /// Recorre `root` y construye el manifiesto. El orden es estable por
    /// construcción (BTreeMap sobre rutas relativas normalizadas con `/`).
    pub fn from_dir(root: &Path) -> Result<Self, DomainError> {
        let mut entries = BTreeMap::new();
        if root.exists() {
            walk(root, root, &mut entries)?;
        }
        Ok(TreeManifest { entries })
    }

    /// Digest sha256 hex sobre el render canónico del manifiesto completo.
    pub fn root_digest(&self) -> String {
        let mut hasher = Sha256::new();
        for (path, entry) in &self.entries {
            hasher.update(render_record(path, entry).as_bytes());
        }
        format!("{:x}", hasher.finalize())
    }

    /// Delta respecto de un manifiesto previo: rutas agregadas o modificadas
    /// y rutas eliminadas. El manifiesto previo no se muta (las capas se
    /// superponen, no se reescriben).
    pub fn diff(&self, prev: &TreeManifest) -> LayerDiff {
        let mut changed = BTreeMap::new();
        for (path, entry) in &self.entries {
            match prev.entries.get(path) {
                Some(old) if old == entry => {}
                _ => {
                    changed.insert(path.clone(), entry.clone());
                }
            }
        }
        let removed = prev.entries
                          .keys()
                          .filter(|p| !self.entries.contains_key(*p))
                          .cloned()
                          .collect();
        LayerDiff { changed, removed }
    }

    pub fn get(&self, path: &str) -> Option<&TreeEntry> {
        self.entries.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Delta de sistema de archivos entre dos instantáneas consecutivas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerDiff {
    pub changed: BTreeMap<String, TreeEntry>,
    pub removed: Vec<String>,
}

impl LayerDiff {
    /// Digest sha256 hex de la capa: render canónico de cambios y bajas.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        for (path, entry) in &self.changed {
            hasher.update(render_record(path, entry).as_bytes());
        }
        for path in &self.removed {
            hasher.update(format!("-\x00{path}\n").as_bytes());
        }
        format!("{:x}", hasher.finalize())
    }

    pub fn is_empty(&self) -> bool {
        self.changed.is_empty() && self.removed.is_empty()
    }
}

fn render_record(path: &str, entry: &TreeEntry) -> String {
    format!("{}\x00{}\x00{:o}\x00{}\x00{}\n",
            path,
            entry.kind.tag(),
            entry.mode,
            entry.size,
            entry.digest)
}

fn walk(root: &Path, dir: &Path, entries: &mut BTreeMap<String, TreeEntry>) -> Result<(), DomainError> {
    for item in fs::read_dir(dir)? {
        let item = item?;
        let path = item.path();
        let rel = relative_key(root, &path)?;
        let meta = fs::symlink_metadata(&path)?;

        if meta.file_type().is_symlink() {
            let target = fs::read_link(&path)?;
            let target = target.to_string_lossy().into_owned();
            entries.insert(rel,
                           TreeEntry { kind: EntryKind::Symlink,
                                       mode: mode_of(&meta),
                                       size: target.len() as u64,
                                       digest: sha256_hex(target.as_bytes()) });
        } else if meta.is_dir() {
            entries.insert(rel,
                           TreeEntry { kind: EntryKind::Dir,
                                       mode: mode_of(&meta),
                                       size: 0,
                                       digest: String::new() });
            walk(root, &path, entries)?;
        } else {
            let content = fs::read(&path)?;
            entries.insert(rel,
                           TreeEntry { kind: EntryKind::File,
                                       mode: mode_of(&meta),
                                       size: content.len() as u64,
                                       digest: sha256_hex(&content) });
        }
    }
    Ok(())
}

fn relative_key(root: &Path, path: &Path) -> Result<String, DomainError> {
    let rel = path.strip_prefix(root)
                  .map_err(|_| DomainError::Validation(format!("Ruta fuera del árbol: {}", path.display())))?;
    let parts: Vec<String> = rel.components().map(|c| c.as_os_str().to_string_lossy().into_owned()).collect();
    Ok(parts.join("/"))
}

#[cfg(unix)]
fn mode_of(meta: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn mode_of(_meta: &fs::Metadata) -> u32 {
    0
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}
