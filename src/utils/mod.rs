// Utils compartidos

pub mod constants;
pub mod pricing;
pub mod storage;
pub mod timers;

pub use constants::*;
pub use storage::{BrowserScratchSpace, MemoryScratchSpace, ScratchSpace};
pub use timers::PeriodicTask;
