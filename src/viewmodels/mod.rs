pub mod section_handle;
pub mod section_viewmodel;
pub mod sweep_viewmodel;

pub use section_handle::{SectionHandle, SectionStatus};
pub use section_viewmodel::{SectionMount, SectionViewModel};
pub use sweep_viewmodel::{GlobalSweep, SweepReport};
