//! Canonical JSON minimal: claves de objeto ordenadas, sin espacios.
//! La estabilidad byte a byte de esta forma es la base de todos los
//! fingerprints del motor.

use std::collections::BTreeMap;

use serde_json::Value;

pub fn to_canonical_json(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => serde_json::to_string(s).unwrap_or_default(),
        Value::Array(items) => {
            let inner: Vec<String> = items.iter().map(to_canonical_json).collect();
            format!("[{}]", inner.join(","))
        }
        Value::Object(map) => {
            let ordered: BTreeMap<&String, String> =
                map.iter().map(|(k, v)| (k, to_canonical_json(v))).collect();
            let inner: Vec<String> = ordered.into_iter()
                                            .map(|(k, v)| {
                                                format!("{}:{}", serde_json::to_string(k).unwrap_or_default(), v)
                                            })
                                            .collect();
            format!("{{{}}}", inner.join(","))
        }
    }
}
