//! The resolution walk: one async driver, one blocking wrapper

pub mod deadline;
pub mod driver;
pub mod state;

pub use deadline::Deadline;
pub use driver::{resolve, resolve_blocking};
pub use state::{resolve_location, ResolutionState};
