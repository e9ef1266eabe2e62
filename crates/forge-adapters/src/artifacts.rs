//! Artifact tipado que fluye entre los steps del pipeline.
//!
//! `ImageStateArtifact` es la representación serializada del estado de la
//! imagen que un paso deja al siguiente: la base declarada, el digest del
//! árbol de staging, la cadena de digests de capas (base-first) y la
//! configuración de runtime acumulada. El hash del artifact lo calcula el
//! engine sobre el payload canónico; como el payload incluye `manifest_root`,
//! dos builds idénticos producen cadenas de capas idénticas.

use forge_core::typed_artifact;

typed_artifact!(ImageStateArtifact {
    base: String,
    manifest_root: String,
    layers: Vec<String>,
    user: Option<String>,
    entrypoint: Option<Vec<String>>,
});
