//! Descarga de paquetes hacia el área temporal del build.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use sha2::{Digest, Sha256};

use crate::errors::ProvisionError;

/// Resultado de una descarga exitosa.
#[derive(Debug, Clone)]
pub struct FetchedPackage {
    pub path: PathBuf,
    pub bytes: u64,
    /// sha256 hex del contenido descargado.
    pub digest: String,
}

/// Adquisición de un paquete desde una URL hacia `dest_dir`.
///
/// El timeout es por operación y su expiración es un fallo de descarga,
/// nunca un cuelgue (la cancelación sólo se honra en límites de paso).
pub trait Fetcher: Send + Sync {
    fn fetch(&self, url: &str, dest_dir: &Path, timeout: Duration) -> Result<FetchedPackage, ProvisionError>;
}

/// Fetcher por defecto: `http(s)://` vía cliente bloqueante y `file://` para
/// paquetes locales (fixtures y mirrors montados).
#[derive(Debug, Default)]
pub struct HttpFetcher;

impl HttpFetcher {
    pub fn new() -> Self {
        Self
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str, dest_dir: &Path, timeout: Duration) -> Result<FetchedPackage, ProvisionError> {
        let bytes: Vec<u8> = if let Some(local) = url.strip_prefix("file://") {
            fs::read(local).map_err(|e| ProvisionError::Download(format!("'{url}': {e}")))?
        } else if url.starts_with("http://") || url.starts_with("https://") {
            let client = reqwest::blocking::Client::builder().timeout(timeout)
                                                             .build()
                                                             .map_err(|e| ProvisionError::Download(e.to_string()))?;
            let response = client.get(url)
                                 .send()
                                 .map_err(|e| ProvisionError::Download(format!("'{url}': {e}")))?;
            if !response.status().is_success() {
                return Err(ProvisionError::Download(format!("'{url}': status {}", response.status())));
            }
            response.bytes()
                    .map_err(|e| ProvisionError::Download(format!("'{url}': {e}")))?
                    .to_vec()
        } else {
            return Err(ProvisionError::Download(format!("unsupported url scheme: '{url}'")));
        };

        fs::create_dir_all(dest_dir)?;
        let filename = url.rsplit('/').next().filter(|s| !s.is_empty()).unwrap_or("package.bin");
        let path = dest_dir.join(filename);
        fs::write(&path, &bytes)?;
        mark_executable(&path)?;

        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        let digest = format!("{:x}", hasher.finalize());

        log::debug!("fetched '{}' -> {} ({} bytes)", url, path.display(), bytes.len());
        Ok(FetchedPackage { path,
                            bytes: bytes.len() as u64,
                            digest })
    }
}

// El paquete descargado es el instalador mismo; debe poder ejecutarse.
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
