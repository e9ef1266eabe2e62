//! ProvisionIdentityStep (Transform)
//!
//! Crea el principal dedicado en `etc/passwd` del rootfs, lo une a su grupo
//! de privilegio declarado y lo fija como identidad por defecto de la imagen
//! (`config.user`): todo proceso arrancado desde la imagen corre bajo él
//! salvo override del runtime.
//!
//! El aprovisionamiento es deliberadamente ruidoso: una cuenta ya existente
//! es `identity_creation_failure`, nunca un éxito duplicado; un grupo
//! inexistente es `group_assignment_failure`. La elección de grupo pasa por
//! `LeastPrivilegePolicy` (ver forge-policies).

use std::fs;

use forge_core::typed_step;
use forge_domain::{GroupDatabase, PasswdDatabase, PasswdEntry, RuntimeIdentity, TreeManifest};
use forge_policies::{LeastPrivilegePolicy, PrivilegeGroupPolicy, PrivilegeParams};
use serde::{Deserialize, Serialize};

use crate::artifacts::ImageStateArtifact;
use crate::errors::ProvisionError;
use crate::steps::{commit_manifest, load_config, require_workspace, save_config, verify_state};
use crate::workspace::WorkspacePaths;

const FIRST_SERVICE_UID: u32 = 1000;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityParams {
    pub user: String,
    pub group: String,
    /// uid explícito; `None` asigna el primer uid libre desde 1000.
    pub uid: Option<u32>,
    /// Reconocimiento explícito de un grupo administrativo.
    pub allow_privileged: bool,
    #[serde(default)]
    pub workspace: WorkspacePaths,
}

impl Default for IdentityParams {
    fn default() -> Self {
        Self { user: "proxyadmin".to_string(),
               group: "proxyusers".to_string(),
               uid: None,
               allow_privileged: false,
               workspace: WorkspacePaths::default() }
    }
}

fn provision(inp: ImageStateArtifact, p: &IdentityParams) -> Result<ImageStateArtifact, ProvisionError> {
    require_workspace(&p.workspace)?;
    let ws = &p.workspace;
    let prev = verify_state(ws, &inp.manifest_root)?;

    let identity = RuntimeIdentity::new(&p.user, &p.group).map_err(ProvisionError::from)?;
    let decision = LeastPrivilegePolicy::new().review(&identity,
                                                      &PrivilegeParams { allow_privileged: p.allow_privileged });
    for note in &decision.rationale.notes {
        log::info!("[{}] {}", decision.policy_id, note);
    }
    if !decision.allowed {
        return Err(ProvisionError::GroupAssignment(format!("policy '{}' denied group '{}': {}",
                                                           decision.policy_id,
                                                           p.group,
                                                           decision.rationale.notes.join("; "))));
    }

    let etc = ws.rootfs().join("etc");
    fs::create_dir_all(&etc)?;

    let passwd_path = etc.join("passwd");
    let passwd_text = fs::read_to_string(&passwd_path).unwrap_or_default();
    let mut passwd = PasswdDatabase::parse(&passwd_text).map_err(ProvisionError::from)?;
    if passwd.contains(&p.user) {
        return Err(ProvisionError::IdentityCreation(format!("user '{}' already provisioned in this image", p.user)));
    }

    let group_path = etc.join("group");
    let group_text = fs::read_to_string(&group_path)
        .map_err(|_| ProvisionError::GroupAssignment("base image carries no etc/group database".to_string()))?;
    let mut groups = GroupDatabase::parse(&group_text).map_err(ProvisionError::from)?;
    let gid = groups.add_member(&p.group, &p.user).map_err(ProvisionError::from)?;

    let uid = p.uid.unwrap_or_else(|| passwd.next_free_uid(FIRST_SERVICE_UID));
    passwd.add(PasswdEntry { name: p.user.clone(),
                             uid,
                             gid,
                             gecos: "proxy runtime identity".to_string(),
                             home: "/".to_string(),
                             shell: "/sbin/nologin".to_string() })
          .map_err(ProvisionError::from)?;

    fs::write(&passwd_path, passwd.render())?;
    fs::write(&group_path, groups.render())?;

    // La identidad pasa a ser el contexto de ejecución por defecto
    let mut config = load_config(ws)?;
    config.user = Some(p.user.clone());
    save_config(ws, &config)?;

    let manifest = TreeManifest::from_dir(&ws.rootfs()).map_err(ProvisionError::from)?;
    let layer = manifest.diff(&prev).digest();
    commit_manifest(ws, &manifest)?;

    let mut layers = inp.layers;
    layers.push(layer);
    Ok(ImageStateArtifact { base: inp.base,
                            manifest_root: manifest.root_digest(),
                            layers,
                            user: Some(p.user.clone()),
                            entrypoint: inp.entrypoint,
                            schema_version: 1 })
}

typed_step! {
    step ProvisionIdentityStep {
        id: "provision_identity",
        kind: forge_core::step::StepKind::Transform,
        input: ImageStateArtifact,
        output: ImageStateArtifact,
        params: IdentityParams,
        fields { params: IdentityParams }
        , defaults(me) { me.params.clone() }
        , run(_me, inp, p) {
            provision(inp, &p).map_err(Into::into)
        }
    }
}
