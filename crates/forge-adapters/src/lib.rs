//! forge-adapters: Capa de adaptación Dominio ↔ Core
//!
//! Este crate provee:
//! - El artifact tipado `ImageStateArtifact` que encadena los steps (sin
//!   semántica en el core).
//! - Los cinco steps concretos del pipeline de aprovisionamiento:
//!   `PrepareBaseStep` → `InstallToolchainStep` → `StageBinaryStep` →
//!   `ProvisionIdentityStep` → `BindEntrypointStep`.
//! - Las costuras de sistema (`Fetcher`, `ToolRunner`) para descarga e
//!   invocación de herramientas externas.
//! - El inyector de workspace que cablea rutas de staging/context en los
//!   params de cada step sin tocar sus defaults deterministas.
//!
//! Nota: el core sólo conoce `Artifact { kind, hash, payload, metadata }`;
//! aquí nos apoyamos en artifacts tipados que serializan a payload JSON y en
//! los macros del core para los steps.

pub mod artifacts;
pub mod errors;
pub mod injectors;
pub mod phase;
pub mod plan;
pub mod steps;
pub mod system;
pub mod workspace;

mod fsutil;

pub use artifacts::ImageStateArtifact;
pub use errors::ProvisionError;
pub use injectors::WorkspaceInjector;
pub use phase::{phase_of, ProvisionPhase};
pub use plan::BuildPlan;
pub use steps::entrypoint::{BindEntrypointStep, EntrypointParams};
pub use steps::identity::{IdentityParams, ProvisionIdentityStep};
pub use steps::prepare::{PrepareBaseStep, PrepareParams};
pub use steps::stage::{StageBinaryStep, StageParams};
pub use steps::toolchain::{InstallToolchainStep, InstallerOptions, ServiceCommands, ToolchainParams};
pub use system::fetch::{FetchedPackage, Fetcher, HttpFetcher};
pub use system::tool::{SystemToolRunner, ToolOutput, ToolRunner};
pub use workspace::WorkspacePaths;
