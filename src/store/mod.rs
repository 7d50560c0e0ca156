//! Entity Store: the client-side view of prompts and collections.

mod collections;
mod prompts;
mod sequence;

pub use collections::CollectionStore;
pub use prompts::PromptStore;
pub use sequence::RequestSequence;
