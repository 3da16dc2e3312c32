pub mod id;
pub mod model;
pub mod validate;

pub use id::{DocumentId, RevisionId};
pub use model::{Category, Document, DocumentFields, NewDocument, ProposedChange, RevisionDraft};
