mod coordinator;
mod state;

pub use coordinator::ViewCoordinator;
pub use state::{FetchKey, ViewState};
