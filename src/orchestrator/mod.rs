pub mod events;
pub mod runner;
pub mod slots;

pub use events::{EventSink, FAILSAFE_ANSWER};
pub use runner::Orchestrator;
