//! BindEntrypointStep (Sink)
//!
//! Fija la línea de comando única que el runtime ejecuta al arrancar un
//! contenedor de la imagen. El binder referencia la identidad aprovisionada
//! (no la posee): exige que `config.user` exista y que el programa apuntado
//! esté realmente staged en el rootfs. Declarar un segundo entrypoint dentro
//! del mismo build es `entrypoint_conflict`, nunca un reemplazo silencioso.

use forge_core::typed_step;
use forge_domain::Entrypoint;
use serde::{Deserialize, Serialize};

use crate::artifacts::ImageStateArtifact;
use crate::errors::ProvisionError;
use crate::steps::{load_config, require_workspace, save_config, verify_state};
use crate::workspace::WorkspacePaths;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EntrypointParams {
    /// Programa a ejecutar: la ruta fija del binario staged.
    pub program: String,
    /// Argumentos fijos (el contrato por defecto es ninguno).
    pub args: Vec<String>,
    #[serde(default)]
    pub workspace: WorkspacePaths,
}

impl Default for EntrypointParams {
    fn default() -> Self {
        Self { program: "/usr/local/bin/proxy".to_string(),
               args: Vec::new(),
               workspace: WorkspacePaths::default() }
    }
}

fn bind(inp: ImageStateArtifact, p: &EntrypointParams) -> Result<ImageStateArtifact, ProvisionError> {
    require_workspace(&p.workspace)?;
    let ws = &p.workspace;
    let manifest = verify_state(ws, &inp.manifest_root)?;

    let entrypoint = Entrypoint::new(&p.program, p.args.clone()).map_err(ProvisionError::from)?;

    let staged = p.program.trim_start_matches('/');
    if manifest.get(staged).is_none() {
        return Err(ProvisionError::MissingArtifact(format!("entrypoint target '{}' is not staged in the rootfs",
                                                           p.program)));
    }

    let mut config = load_config(ws)?;
    if let Some(existing) = &config.entrypoint {
        return Err(ProvisionError::EntrypointConflict(format!("entrypoint already bound to '{}'",
                                                              existing.join(" "))));
    }
    if config.user.is_none() {
        return Err(ProvisionError::Plan("runtime identity must be provisioned before binding the entrypoint"
                                            .to_string()));
    }

    config.entrypoint = Some(entrypoint.argv());
    save_config(ws, &config)?;

    // Sólo cambia la configuración: el rootfs (y su manifiesto) quedan igual
    Ok(ImageStateArtifact { base: inp.base,
                            manifest_root: inp.manifest_root,
                            layers: inp.layers,
                            user: inp.user,
                            entrypoint: Some(entrypoint.argv()),
                            schema_version: 1 })
}

typed_step! {
    step BindEntrypointStep {
        id: "bind_entrypoint",
        kind: forge_core::step::StepKind::Sink,
        input: ImageStateArtifact,
        output: ImageStateArtifact,
        params: EntrypointParams,
        fields { params: EntrypointParams }
        , defaults(me) { me.params.clone() }
        , run(_me, inp, p) {
            bind(inp, &p).map_err(Into::into)
        }
    }
}
