//! Constantes del motor core.
//!
//! Valores estáticos que participan del cálculo de fingerprints. Un cambio de
//! versión del motor invalida determinísticamente los fingerprints aunque la
//! definición del pipeline y los datos no cambien.

/// Versión lógica del motor de aprovisionamiento. Mantener estable mientras
/// no haya cambios incompatibles en el formato de eventos o fingerprints.
pub const ENGINE_VERSION: &str = "IF1.0";
