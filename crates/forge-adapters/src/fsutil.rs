//! Utilidades de copia de árboles para el staging.

use std::fs;
use std::path::Path;

use crate::errors::ProvisionError;

/// Copia recursiva de `src` a `dst` preservando modos y symlinks.
pub(crate) fn copy_tree(src: &Path, dst: &Path) -> Result<(), ProvisionError> {
    fs::create_dir_all(dst)?;
    for item in fs::read_dir(src)? {
        let item = item?;
        let from = item.path();
        let to = dst.join(item.file_name());
        let meta = fs::symlink_metadata(&from)?;

        if meta.file_type().is_symlink() {
            copy_symlink(&from, &to)?;
        } else if meta.is_dir() {
            copy_tree(&from, &to)?;
        } else {
            fs::copy(&from, &to)?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(from: &Path, to: &Path) -> Result<(), ProvisionError> {
    let target = fs::read_link(from)?;
    std::os::unix::fs::symlink(target, to)?;
    Ok(())
}

#[cfg(not(unix))]
fn copy_symlink(from: &Path, to: &Path) -> Result<(), ProvisionError> {
    // Sin symlinks portables fuera de unix: copiar el destino resuelto.
    fs::copy(from, to)?;
    Ok(())
}
