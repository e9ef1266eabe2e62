//! Inyectores de parámetros del pipeline de aprovisionamiento.

use forge_core::model::ExecutionContext;
use forge_core::ParamInjector;
use serde_json::{json, Value};

use crate::workspace::WorkspacePaths;

/// Inyecta las rutas de workspace en los params de cada step bajo la clave
/// `workspace`. Las rutas son cableado de runtime: no forman parte de los
/// params base deterministas ni de los fingerprints.
#[derive(Debug)]
pub struct WorkspaceInjector {
    paths: WorkspacePaths,
}

impl WorkspaceInjector {
    pub fn new(paths: WorkspacePaths) -> Self {
        Self { paths }
    }
}

impl ParamInjector for WorkspaceInjector {
    fn inject(&self, _base: &Value, _ctx: &ExecutionContext) -> Value {
        json!({ "workspace": serde_json::to_value(&self.paths).unwrap_or(Value::Null) })
    }
}
