// forge-domain library entry point
pub mod accounts;
pub mod config;
pub mod entrypoint;
pub mod error;
pub mod identity;
pub mod image_ref;
pub mod manifest;

pub use accounts::{GroupDatabase, GroupEntry, PasswdDatabase, PasswdEntry};
pub use config::ImageConfig;
pub use entrypoint::Entrypoint;
pub use error::DomainError;
pub use identity::{RuntimeIdentity, ADMINISTRATIVE_GROUPS};
pub use image_ref::ImageReference;
pub use manifest::{LayerDiff, TreeEntry, TreeManifest};
