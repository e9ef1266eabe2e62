//! Carga de configuración del store desde variables de entorno.
//! Convención `FORGE_STORE_DIR`, con default relativo al directorio actual.

use std::env;
use std::path::PathBuf;

use dotenvy::dotenv;
use once_cell::sync::Lazy;

// Carga perezosa del archivo .env una sola vez.
static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenv(); // ignora error si no existe .env
});

const DEFAULT_STORE_DIR: &str = ".forge";

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub root: PathBuf,
}

impl StoreConfig {
    pub fn from_env() -> Self {
        Lazy::force(&DOTENV_LOADED);
        let root = env::var("FORGE_STORE_DIR").unwrap_or_else(|_| DEFAULT_STORE_DIR.to_string());
        Self { root: PathBuf::from(root) }
    }
}

/// Forzar carga temprana de .env desde aplicaciones externas si se desea.
pub fn init_dotenv() {
    Lazy::force(&DOTENV_LOADED);
}
