use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use forge_adapters::{phase_of, BindEntrypointStep, HttpFetcher, ImageStateArtifact, InstallToolchainStep,
                     PrepareBaseStep, ProvisionIdentityStep, StageBinaryStep, SystemToolRunner, WorkspaceInjector,
                     WorkspacePaths};
use forge_core::model::ArtifactSpec;
use forge_core::{BuildEventKind, InMemoryPipelineRepository, PipelineEngine};
use forge_domain::ImageConfig;
use forge_persistence::{FsArtifactStore, FsEventStore, ImageStore, PublishedImage, StoreConfig};
use uuid::Uuid;

fn main() {
    // Cargar .env si existe para obtener FORGE_STORE_DIR
    let _ = dotenvy::dotenv();
    // CLI mínima:
    //   forge build --plan <FILE> [--context <DIR>] [--staging <DIR>] [--store <DIR>]
    //   forge inspect --build <UUID> [--store <DIR>]
    let args: Vec<String> = std::env::args().collect();
    if args.len() >= 2 && args[1] == "build" {
        let mut plan_path: Option<String> = None;
        let mut context: Option<String> = None;
        let mut staging: Option<String> = None;
        let mut store: Option<String> = None;
        let mut i = 2;
        while i < args.len() {
            match args[i].as_str() {
                "--plan" => {
                    i += 1;
                    if i < args.len() { plan_path = Some(args[i].clone()); }
                }
                "--context" => {
                    i += 1;
                    if i < args.len() { context = Some(args[i].clone()); }
                }
                "--staging" => {
                    i += 1;
                    if i < args.len() { staging = Some(args[i].clone()); }
                }
                "--store" => {
                    i += 1;
                    if i < args.len() { store = Some(args[i].clone()); }
                }
                _ => {}
            }
            i += 1;
        }

        let Some(plan_path) = plan_path else {
            eprintln!("Uso: forge build --plan <FILE> [--context <DIR>] [--staging <DIR>] [--store <DIR>]");
            std::process::exit(2);
        };

        let plan_text = match std::fs::read_to_string(&plan_path) {
            Ok(t) => t,
            Err(e) => {
                eprintln!("[forge build] no se pudo leer el plan '{plan_path}': {e}");
                std::process::exit(3);
            }
        };
        let plan = match forge_adapters::BuildPlan::from_json(&plan_text) {
            Ok(p) => p,
            Err(e) => {
                eprintln!("[forge build] {e}");
                std::process::exit(3);
            }
        };

        // Políticas revisadas antes de construir pipeline alguno
        let decisions = match plan.validate() {
            Ok(d) => d,
            Err(e) => {
                eprintln!("[forge build] plan rechazado: {e}");
                std::process::exit(4);
            }
        };
        for decision in &decisions {
            for note in &decision.rationale.notes {
                eprintln!("[forge build] {}: {}", decision.policy_id, note);
            }
        }

        let store_root = store.map(PathBuf::from).unwrap_or_else(|| StoreConfig::from_env().root);
        let build_id = Uuid::new_v4();
        let staging_dir = staging.map(PathBuf::from)
                                 .unwrap_or_else(|| store_root.join("staging").join(build_id.to_string()));
        let context_dir = context.unwrap_or_else(|| ".".to_string());
        let workspace = WorkspacePaths::new(context_dir,
                                            staging_dir.to_string_lossy().into_owned(),
                                            store_root.join("bases").to_string_lossy().into_owned());

        let event_store = match FsEventStore::open(&store_root) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("[forge build] store error: {e}");
                std::process::exit(5);
            }
        };

        let mut engine = PipelineEngine::builder(event_store, InMemoryPipelineRepository::new())
            .first_step(PrepareBaseStep::new(forge_adapters::PrepareParams { base: plan.base.clone(),
                                                                             ..Default::default() }))
            .add_step(InstallToolchainStep::new(plan.toolchain.clone(),
                                                Arc::new(HttpFetcher::new()),
                                                Arc::new(SystemToolRunner::new())))
            .add_step(StageBinaryStep::new(plan.binary.clone()))
            .add_step(ProvisionIdentityStep::new(plan.identity.clone()))
            .add_step(BindEntrypointStep::new(plan.entrypoint.clone()))
            .build();
        engine.set_default_build_id(build_id);
        engine.add_injector(Box::new(WorkspaceInjector::new(workspace)));

        match engine.run() {
            Ok(build_id) => {
                let events = engine.events_for(build_id);
                let layer_hashes: Vec<String> = events.iter()
                                                      .filter_map(|e| match &e.kind {
                                                          BuildEventKind::LayerCommitted { outputs, .. } => {
                                                              outputs.first().cloned()
                                                          }
                                                          _ => None,
                                                      })
                                                      .collect();
                let Some(final_hash) = layer_hashes.last() else {
                    eprintln!("[forge build] build sin capas: estado inconsistente");
                    std::process::exit(5);
                };
                let Some(final_artifact) = engine.get_artifact(final_hash) else {
                    eprintln!("[forge build] artifact final no disponible");
                    std::process::exit(5);
                };
                let state = match ImageStateArtifact::from_artifact(final_artifact) {
                    Ok(s) => s,
                    Err(e) => {
                        eprintln!("[forge build] estado final indecodificable: {e:?}");
                        std::process::exit(5);
                    }
                };

                // Persistir blobs y publicar sólo el build completo
                if let Ok(blobs) = FsArtifactStore::open(&store_root) {
                    for hash in &layer_hashes {
                        if let Some(artifact) = engine.get_artifact(hash) {
                            if let Err(e) = blobs.store(artifact) {
                                eprintln!("[forge build] blob '{hash}': {e}");
                            }
                        }
                    }
                }

                let image = PublishedImage { name: plan.image_name.clone(),
                                             base: plan.base.clone(),
                                             manifest_root: state.manifest_root.clone(),
                                             layers: state.layers.clone(),
                                             config: ImageConfig { user: state.user.clone(),
                                                                   entrypoint: state.entrypoint.clone() },
                                             pipeline_fingerprint: engine.pipeline_fingerprint()
                                                                         .unwrap_or_default(),
                                             published_at: Utc::now() };
                let image_store = match ImageStore::open(&store_root) {
                    Ok(s) => s,
                    Err(e) => {
                        eprintln!("[forge build] store error: {e}");
                        std::process::exit(5);
                    }
                };
                match image_store.publish(&image) {
                    Ok(dir) => {
                        println!("publicada: {} (build {})", dir.display(), build_id);
                        println!("fingerprint: {}", image.pipeline_fingerprint);
                        std::process::exit(0);
                    }
                    Err(e) => {
                        eprintln!("[forge build] publicación rechazada: {e}");
                        std::process::exit(5);
                    }
                }
            }
            Err(e) => {
                let phase = engine.default_definition()
                                  .map(|def| phase_of(&engine.load_instance(build_id, def)).to_string())
                                  .unwrap_or_else(|| "unknown".to_string());
                eprintln!("[forge build] falló en fase '{phase}': {e}");
                eprintln!("[forge build] la imagen queda sin publicar; re-ejecutar desde una base limpia");
                std::process::exit(5);
            }
        }
    } else if args.len() >= 2 && args[1] == "inspect" {
        let mut build: Option<Uuid> = None;
        let mut store: Option<String> = None;
        let mut i = 2;
        while i < args.len() {
            match args[i].as_str() {
                "--build" => {
                    i += 1;
                    if i < args.len() { build = Uuid::parse_str(&args[i]).ok(); }
                }
                "--store" => {
                    i += 1;
                    if i < args.len() { store = Some(args[i].clone()); }
                }
                _ => {}
            }
            i += 1;
        }

        let Some(build_id) = build else {
            eprintln!("Uso: forge inspect --build <UUID> [--store <DIR>]");
            std::process::exit(2);
        };

        let store_root = store.map(PathBuf::from).unwrap_or_else(|| StoreConfig::from_env().root);
        let event_store = match FsEventStore::open(&store_root) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("[forge inspect] store error: {e}");
                std::process::exit(5);
            }
        };
        let events = forge_core::EventStore::list(&event_store, build_id);
        if events.is_empty() {
            eprintln!("[forge inspect] build no encontrado: {build_id}");
            std::process::exit(4);
        }
        for ev in &events {
            match &ev.kind {
                BuildEventKind::PipelineInitialized { definition_hash, step_count } => {
                    println!("{:>3} init       definition={} steps={}", ev.seq, definition_hash, step_count);
                }
                BuildEventKind::StepStarted { step_id, .. } => {
                    println!("{:>3} started    {}", ev.seq, step_id);
                }
                BuildEventKind::LayerCommitted { step_id, fingerprint, .. } => {
                    println!("{:>3} layer      {} fingerprint={}", ev.seq, step_id, fingerprint);
                }
                BuildEventKind::StepFailed { step_id, error, .. } => {
                    println!("{:>3} failed     {} error={}", ev.seq, step_id, error);
                }
                BuildEventKind::PipelineCompleted { pipeline_fingerprint } => {
                    println!("{:>3} completed  fingerprint={}", ev.seq, pipeline_fingerprint);
                }
            }
        }
        std::process::exit(0);
    } else {
        println!("forge: use 'build' or 'inspect' subcommands");
    }
}
