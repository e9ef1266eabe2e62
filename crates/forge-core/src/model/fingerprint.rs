use serde::Serialize;
use serde_json::Value;

/// Insumos para calcular el fingerprint de un step exitoso. NO es el
/// fingerprint final (string hash) sino el modelo previo a canonicalizar.
///
/// `params` son los parámetros base deterministas del step: la inyección de
/// rutas de workspace en runtime no participa del fingerprint, igual que los
/// timestamps de eventos.
#[derive(Serialize)]
pub struct StepFingerprintInput<'a> {
    pub engine_version: &'a str,
    pub definition_hash: &'a str,
    pub step_index: usize,
    pub output_hashes: &'a [String],
    pub params: &'a Value,
}
