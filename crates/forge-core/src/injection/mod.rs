//! Inyección determinista de parámetros.
//!
//! El caso de uso central es el cableado de rutas de workspace: el plan
//! conoce dónde viven el rootfs de staging y el build context, y los steps lo
//! reciben fusionado en sus params sin que sus defaults deterministas lo
//! incluyan (y sin afectar fingerprints).

use serde_json::Value;

use crate::model::ExecutionContext;

/// Trait para inyectores de parámetros.
pub trait ParamInjector: Send + Sync + std::fmt::Debug {
    /// Toma los `base` params del step y el contexto de ejecución y devuelve
    /// una extensión/overrides que se fusiona según el orden fijo.
    fn inject(&self, base: &Value, ctx: &ExecutionContext) -> Value;
}

/// CompositeInjector aplica una serie de inyectores en orden determinista.
/// El orden de merge es: base -> injectors (en orden).
pub struct CompositeInjector {
    pub injectors: Vec<Box<dyn ParamInjector>>,
}

impl CompositeInjector {
    pub fn new() -> Self {
        Self { injectors: vec![] }
    }

    pub fn with_injectors(injectors: Vec<Box<dyn ParamInjector>>) -> Self {
        Self { injectors }
    }

    /// Merge determinista: base, luego el resultado de cada inyector
    /// (merge superficial de objetos).
    pub fn apply(&self, base: &Value, ctx: &ExecutionContext) -> Value {
        Self::apply_injectors(&self.injectors, base, ctx)
    }

    /// Aplica un slice de inyectores por referencia, sin tomar ownership.
    /// Útil para el engine, que guarda sus inyectores en cajas.
    pub fn apply_injectors(injectors: &[Box<dyn ParamInjector>], base: &Value, ctx: &ExecutionContext) -> Value {
        let mut accumulated = base.clone();
        for inj in injectors.iter() {
            let v = inj.inject(base, ctx);
            accumulated = merge_json(&accumulated, &v);
        }
        accumulated
    }
}

impl Default for CompositeInjector {
    fn default() -> Self {
        Self::new()
    }
}

/// Merge superficial de objetos JSON: las claves de `b` pisan las de `a`.
fn merge_json(a: &Value, b: &Value) -> Value {
    match (a, b) {
        (Value::Object(ma), Value::Object(mb)) => {
            let mut out = ma.clone();
            for (k, v) in mb.iter() {
                out.insert(k.clone(), v.clone());
            }
            Value::Object(out)
        }
        // No-objetos: override
        (_, other) => other.clone(),
    }
}
