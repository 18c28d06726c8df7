//! Capture storage for agent devtools
//!
//! A single [`DevtoolsStore`] handle owns the client request collection, the
//! server request collection and the annotation list for the lifetime of the
//! host process. Every component receives a clone of the handle; nothing is
//! persisted and only `clear` shrinks the collections.

mod annotations;
pub mod events;
pub mod export;
mod store;

pub use annotations::UpsertOutcome;
pub use events::DevtoolsEvent;
pub use export::render_markdown;
pub use store::{DevtoolsStore, StoreCounts};
