//! Integración del pipeline completo de aprovisionamiento sobre fixtures en
//! disco: base fijada por contenido, context con el binario del proxy y un
//! instalador servido por `file://` con runner simulado.

use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use forge_adapters::{phase_of, BindEntrypointStep, EntrypointParams, HttpFetcher, IdentityParams, ImageStateArtifact,
                     InstallToolchainStep, PrepareBaseStep, PrepareParams, ProvisionError, ProvisionIdentityStep,
                     ProvisionPhase, ServiceCommands, StageBinaryStep, StageParams, ToolOutput, ToolRunner,
                     ToolchainParams, WorkspaceInjector, WorkspacePaths};
use forge_core::model::ArtifactSpec;
use forge_core::step::StepRunResultTyped;
use forge_core::{BuildEventKind, InMemoryEventStore, InMemoryPipelineRepository, PipelineEngine, PipelineError,
                 TypedStep};
use forge_domain::TreeManifest;

// ---------------------------------------------------------------------------
// Runners simulados
// ---------------------------------------------------------------------------

/// Runner que registra cada invocación; `fail_installer` fuerza exit 1 en
/// todo programa que no sea de servicio.
#[derive(Debug, Default)]
struct RecordingRunner {
    fail_installer: bool,
    calls: Mutex<Vec<String>>,
}

impl RecordingRunner {
    fn programs(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }
}

impl ToolRunner for RecordingRunner {
    fn run(&self, program: &str, _args: &[String]) -> Result<ToolOutput, ProvisionError> {
        self.calls.lock().expect("calls lock").push(program.to_string());
        Ok(ToolOutput { status: if self.fail_installer { 1 } else { 0 },
                        stdout: String::new(),
                        stderr: "simulated".to_string() })
    }
}

/// Runner con un servicio instalador con estado: la sonda sólo pasa después
/// de un `svc-register` exitoso (o desde el inicio si `healthy`).
#[derive(Debug)]
struct ServiceRunner {
    healthy: bool,
    registered: Mutex<bool>,
    calls: Mutex<Vec<String>>,
}

impl ServiceRunner {
    fn new(healthy: bool) -> Self {
        Self { healthy,
               registered: Mutex::new(false),
               calls: Mutex::new(Vec::new()) }
    }

    fn programs(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }
}

impl ToolRunner for ServiceRunner {
    fn run(&self, program: &str, _args: &[String]) -> Result<ToolOutput, ProvisionError> {
        self.calls.lock().expect("calls lock").push(program.to_string());
        let status = match program {
            "svc-probe" => {
                if self.healthy || *self.registered.lock().expect("registered lock") {
                    0
                } else {
                    1
                }
            }
            "svc-register" => {
                *self.registered.lock().expect("registered lock") = true;
                0
            }
            _ => 0,
        };
        Ok(ToolOutput { status,
                        stdout: String::new(),
                        stderr: String::new() })
    }
}

// ---------------------------------------------------------------------------
// Fixture
// ---------------------------------------------------------------------------

struct Fixture {
    _root: tempfile::TempDir,
    root_path: PathBuf,
    base_ref: String,
    pkg_url: String,
    context_dir: PathBuf,
    base_store: PathBuf,
}

fn fixture(with_binary: bool, base_passwd: &str, base_group: &str) -> Fixture {
    let root = tempfile::tempdir().expect("tempdir");
    let root_path = root.path().to_path_buf();

    // Base direccionada por contenido en el almacén local
    let base_store = root_path.join("bases");
    let staged_base = base_store.join("pending");
    fs::create_dir_all(staged_base.join("etc")).expect("base etc");
    fs::write(staged_base.join("etc/passwd"), base_passwd).expect("base passwd");
    fs::write(staged_base.join("etc/group"), base_group).expect("base group");
    let digest = TreeManifest::from_dir(&staged_base).expect("base manifest").root_digest();
    fs::rename(&staged_base, base_store.join(format!("sha256-{digest}"))).expect("base rename");
    let base_ref = format!("proxy-base@sha256:{digest}");

    // Build context con (o sin) el binario pre-compilado
    let context_dir = root_path.join("context");
    fs::create_dir_all(&context_dir).expect("context");
    if with_binary {
        fs::write(context_dir.join("proxy"), b"\x7fELF-proxy-binary").expect("proxy binary");
    }

    // Paquete instalador servido por file://
    let pkg_dir = root_path.join("pkgs");
    fs::create_dir_all(&pkg_dir).expect("pkgs");
    let pkg_path = pkg_dir.join("toolchain.pkg");
    fs::write(&pkg_path, b"installer-payload").expect("pkg");
    let pkg_url = format!("file://{}", pkg_path.display());

    Fixture { _root: root,
              root_path,
              base_ref,
              pkg_url,
              context_dir,
              base_store }
}

impl Fixture {
    fn workspace(&self, staging: &str) -> WorkspacePaths {
        WorkspacePaths::new(self.context_dir.to_string_lossy().into_owned(),
                            self.root_path.join(staging).to_string_lossy().into_owned(),
                            self.base_store.to_string_lossy().into_owned())
    }
}

fn engine_with(fx: &Fixture,
               staging: &str,
               identity: IdentityParams,
               toolchain_extra: Option<ServiceCommands>,
               runner: Arc<dyn ToolRunner>)
               -> PipelineEngine<InMemoryEventStore, InMemoryPipelineRepository> {
    let toolchain = ToolchainParams { url: fx.pkg_url.clone(),
                                      service: toolchain_extra,
                                      ..ToolchainParams::default() };
    let mut engine = PipelineEngine::builder(InMemoryEventStore::default(), InMemoryPipelineRepository::new())
        .first_step(PrepareBaseStep::new(PrepareParams { base: fx.base_ref.clone(),
                                                         ..PrepareParams::default() }))
        .add_step(InstallToolchainStep::new(toolchain, Arc::new(HttpFetcher::new()), runner))
        .add_step(StageBinaryStep::new(StageParams::default()))
        .add_step(ProvisionIdentityStep::new(identity))
        .add_step(BindEntrypointStep::new(EntrypointParams::default()))
        .build();
    engine.add_injector(Box::new(WorkspaceInjector::new(fx.workspace(staging))));
    engine
}

fn step_started_ids(engine: &PipelineEngine<InMemoryEventStore, InMemoryPipelineRepository>) -> Vec<String> {
    engine.events()
          .unwrap_or_default()
          .iter()
          .filter_map(|e| match &e.kind {
              BuildEventKind::StepStarted { step_id, .. } => Some(step_id.clone()),
              _ => None,
          })
          .collect()
}

fn final_state(engine: &PipelineEngine<InMemoryEventStore, InMemoryPipelineRepository>) -> ImageStateArtifact {
    let events = engine.events().expect("events");
    let hash = events.iter()
                     .rev()
                     .find_map(|e| match &e.kind {
                         BuildEventKind::LayerCommitted { step_id, outputs, .. } if step_id == "bind_entrypoint" => {
                             outputs.first().cloned()
                         }
                         _ => None,
                     })
                     .expect("final layer");
    let artifact = engine.get_artifact(&hash).expect("artifact in store");
    ImageStateArtifact::from_artifact(artifact).expect("decode image state")
}

const BASE_PASSWD: &str = "root:x:0:0:root:/root:/bin/sh\n";
const BASE_GROUP: &str = "root:x:0:\nwheel:x:10:\nproxyusers:x:200:\n";

// ---------------------------------------------------------------------------
// Propiedades del pipeline
// ---------------------------------------------------------------------------

#[test]
fn end_to_end_provisions_the_image() {
    let fx = fixture(true, BASE_PASSWD, BASE_GROUP);
    let runner = Arc::new(RecordingRunner::default());
    let mut engine = engine_with(&fx, "staging", IdentityParams::default(), None, runner.clone());

    let build_id = engine.run().expect("pipeline should complete");

    // Binario staged en su ruta fija, con la identidad y entrypoint fijados
    let ws = fx.workspace("staging");
    assert!(ws.rootfs().join("usr/local/bin/proxy").is_file());

    let passwd = fs::read_to_string(ws.rootfs().join("etc/passwd")).expect("passwd");
    assert!(passwd.contains("proxyadmin:x:1000:200:"), "passwd: {passwd}");
    let group = fs::read_to_string(ws.rootfs().join("etc/group")).expect("group");
    assert!(group.contains("proxyusers:x:200:proxyadmin"), "group: {group}");

    let config: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(ws.config_path()).expect("config")).expect("config json");
    assert_eq!(config["user"], "proxyadmin");
    assert_eq!(config["entrypoint"], serde_json::json!(["/usr/local/bin/proxy"]));

    // Cadena de eventos estrictamente lineal y completa
    let variants = engine.event_variants().expect("variants");
    assert_eq!(variants, vec!["I", "S", "L", "S", "L", "S", "L", "S", "L", "S", "L", "C"]);

    // Estado final encadenado por los artifacts
    let state = final_state(&engine);
    assert_eq!(state.user.as_deref(), Some("proxyadmin"));
    assert_eq!(state.entrypoint, Some(vec!["/usr/local/bin/proxy".to_string()]));
    assert_eq!(state.layers.len(), 3); // toolchain, binario, identidad

    // El instalador corrió exactamente una vez
    let programs = runner.programs();
    assert_eq!(programs.len(), 1);
    assert!(programs[0].ends_with("toolchain.pkg"));

    let definition = engine.default_definition().expect("definition");
    let instance = engine.load_instance(build_id, definition);
    assert_eq!(phase_of(&instance), ProvisionPhase::Done);
}

#[test]
fn two_runs_from_the_same_clean_base_are_bit_identical() {
    let fx = fixture(true, BASE_PASSWD, BASE_GROUP);

    let mut first = engine_with(&fx, "staging-a", IdentityParams::default(), None,
                                Arc::new(RecordingRunner::default()));
    first.run().expect("first run");
    let mut second = engine_with(&fx, "staging-b", IdentityParams::default(), None,
                                 Arc::new(RecordingRunner::default()));
    second.run().expect("second run");

    let state_a = final_state(&first);
    let state_b = final_state(&second);
    assert_eq!(state_a.manifest_root, state_b.manifest_root);
    assert_eq!(state_a.layers, state_b.layers);
    assert_eq!(state_a.entrypoint, state_b.entrypoint);

    // Configuración byte a byte idéntica
    let config_a = fs::read(fx.workspace("staging-a").config_path()).expect("config a");
    let config_b = fs::read(fx.workspace("staging-b").config_path()).expect("config b");
    assert_eq!(config_a, config_b);

    // Los fingerprints excluyen rutas de workspace y timestamps
    assert_eq!(first.pipeline_fingerprint(), second.pipeline_fingerprint());
}

#[test]
fn missing_binary_fails_before_identity_provisioning() {
    let fx = fixture(false, BASE_PASSWD, BASE_GROUP);
    let mut engine = engine_with(&fx, "staging", IdentityParams::default(), None,
                                 Arc::new(RecordingRunner::default()));

    let err = engine.run().expect_err("missing binary must fail");
    assert!(matches!(err, PipelineError::Step { ref kind, .. } if kind == "missing_artifact"), "{err:?}");

    // Fail-fast: ni identidad ni entrypoint llegaron a arrancar
    let started = step_started_ids(&engine);
    assert!(started.contains(&"stage_binary".to_string()));
    assert!(!started.contains(&"provision_identity".to_string()));
    assert!(!started.contains(&"bind_entrypoint".to_string()));

    let passwd = fs::read_to_string(fx.workspace("staging").rootfs().join("etc/passwd")).expect("passwd");
    assert!(!passwd.contains("proxyadmin"));

    // Stop-on-failure es definitivo
    assert!(matches!(engine.step(), Err(PipelineError::PipelineHasFailed)));
}

#[test]
fn toolchain_failure_prevents_all_later_steps() {
    let fx = fixture(true, BASE_PASSWD, BASE_GROUP);
    let runner = Arc::new(RecordingRunner { fail_installer: true,
                                            calls: Mutex::new(Vec::new()) });
    let mut engine = engine_with(&fx, "staging", IdentityParams::default(), None, runner);

    let err = engine.run().expect_err("installer failure must fail");
    assert!(matches!(err, PipelineError::Step { ref kind, .. } if kind == "installer_failure"), "{err:?}");

    let started = step_started_ids(&engine);
    assert!(!started.contains(&"stage_binary".to_string()));
    assert!(!fx.workspace("staging").rootfs().join("usr/local/bin/proxy").exists());

    let definition = engine.default_definition().expect("definition");
    let build_id = engine.default_build_id().expect("build id");
    let instance = engine.load_instance(build_id, definition);
    assert_eq!(phase_of(&instance), ProvisionPhase::Failed);
}

#[test]
fn tampered_base_store_breaks_the_content_pin() {
    let fx = fixture(true, BASE_PASSWD, BASE_GROUP);
    // Alterar la base almacenada rompe el pin por contenido
    let stored = fs::read_dir(&fx.base_store).expect("base store")
                                             .filter_map(|e| e.ok())
                                             .find(|e| e.file_name().to_string_lossy().starts_with("sha256-"))
                                             .expect("stored base");
    fs::write(stored.path().join("intruso"), b"x").expect("tamper");

    let mut engine = engine_with(&fx, "staging", IdentityParams::default(), None,
                                 Arc::new(RecordingRunner::default()));
    let err = engine.run().expect_err("tampered base must fail");
    assert!(matches!(err, PipelineError::Step { ref kind, .. } if kind == "base_mismatch"), "{err:?}");
}

#[test]
fn reprovisioning_an_existing_identity_is_loud() {
    let passwd_with_identity = "root:x:0:0:root:/root:/bin/sh\nproxyadmin:x:1000:200::/:/sbin/nologin\n";
    let fx = fixture(true, passwd_with_identity, BASE_GROUP);
    let mut engine = engine_with(&fx, "staging", IdentityParams::default(), None,
                                 Arc::new(RecordingRunner::default()));

    let err = engine.run().expect_err("duplicate identity must fail");
    assert!(matches!(err, PipelineError::Step { ref kind, .. } if kind == "identity_creation_failure"), "{err:?}");
}

#[test]
fn unknown_privilege_group_is_a_group_assignment_failure() {
    let fx = fixture(true, BASE_PASSWD, "root:x:0:\n");
    let mut engine = engine_with(&fx, "staging", IdentityParams::default(), None,
                                 Arc::new(RecordingRunner::default()));

    let err = engine.run().expect_err("missing group must fail");
    assert!(matches!(err, PipelineError::Step { ref kind, .. } if kind == "group_assignment_failure"), "{err:?}");
}

#[test]
fn administrative_group_needs_explicit_acknowledgement() {
    let fx = fixture(true, BASE_PASSWD, BASE_GROUP);
    let elevated = IdentityParams { group: "wheel".to_string(),
                                    ..IdentityParams::default() };
    let mut engine = engine_with(&fx, "staging", elevated, None, Arc::new(RecordingRunner::default()));

    let err = engine.run().expect_err("unacknowledged admin group must fail");
    assert!(matches!(err, PipelineError::Step { ref kind, .. } if kind == "group_assignment_failure"), "{err:?}");

    // Con reconocimiento explícito el build procede y la identidad no es root
    let acknowledged = IdentityParams { group: "wheel".to_string(),
                                        allow_privileged: true,
                                        ..IdentityParams::default() };
    let mut engine = engine_with(&fx, "staging-ack", acknowledged, None, Arc::new(RecordingRunner::default()));
    engine.run().expect("acknowledged build completes");
    let state = final_state(&engine);
    assert_eq!(state.user.as_deref(), Some("proxyadmin"));
}

#[test]
fn second_entrypoint_binding_conflicts() {
    let fx = fixture(true, BASE_PASSWD, BASE_GROUP);
    let mut engine = engine_with(&fx, "staging", IdentityParams::default(), None,
                                 Arc::new(RecordingRunner::default()));
    engine.run().expect("pipeline should complete");

    let state = final_state(&engine);
    let step = BindEntrypointStep::new(EntrypointParams::default());
    let params = EntrypointParams { workspace: fx.workspace("staging"),
                                    ..EntrypointParams::default() };
    match step.run_typed(Some(state), params) {
        StepRunResultTyped::Failure { error } => {
            assert!(matches!(error, PipelineError::Step { ref kind, .. } if kind == "entrypoint_conflict"),
                    "{error:?}");
        }
        StepRunResultTyped::Success { .. } => panic!("second binding must conflict"),
    }
}

#[test]
fn healthy_installer_service_is_never_toggled() {
    let fx = fixture(true, BASE_PASSWD, BASE_GROUP);
    let runner = Arc::new(ServiceRunner::new(true));
    let service = ServiceCommands { probe: vec!["svc-probe".to_string()],
                                    unregister: vec!["svc-unregister".to_string()],
                                    register: vec!["svc-register".to_string()] };
    let mut engine = engine_with(&fx, "staging", IdentityParams::default(), Some(service), runner.clone());

    engine.run().expect("pipeline should complete");
    let programs = runner.programs();
    assert!(programs.contains(&"svc-probe".to_string()));
    assert!(!programs.contains(&"svc-unregister".to_string()));
    assert!(!programs.contains(&"svc-register".to_string()));
}

#[test]
fn unhealthy_installer_service_is_reregistered_then_proceeds() {
    let fx = fixture(true, BASE_PASSWD, BASE_GROUP);
    let runner = Arc::new(ServiceRunner::new(false));
    let service = ServiceCommands { probe: vec!["svc-probe".to_string()],
                                    unregister: vec!["svc-unregister".to_string()],
                                    register: vec!["svc-register".to_string()] };
    let mut engine = engine_with(&fx, "staging", IdentityParams::default(), Some(service), runner.clone());

    engine.run().expect("pipeline should complete after re-register");
    let programs = runner.programs();
    let probe_count = programs.iter().filter(|p| *p == "svc-probe").count();
    assert_eq!(probe_count, 2); // sonda, toggle, re-sonda
    assert!(programs.contains(&"svc-unregister".to_string()));
    assert!(programs.contains(&"svc-register".to_string()));
}
