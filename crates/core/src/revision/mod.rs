pub mod diff;
pub mod model;
pub mod workflow;

pub use model::{Revision, RevisionState, Significance};
pub use workflow::ReviewDecision;
