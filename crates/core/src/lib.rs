//! Knowledge-base core: documents, revisions, localization, redirects and
//! edit locks over pluggable stores.

pub mod config;
pub mod document;
pub mod error;
pub mod events;
pub mod l10n;
pub mod lock;
pub mod redirect;
pub mod render;
pub mod revision;
pub mod service;
pub mod store;

pub use config::KbConfig;
pub use error::{CollisionField, KbError, KbResult};
pub use service::DocumentService;
