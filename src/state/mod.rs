// ============================================================================
// STATE MODULE - State Management con Rc<RefCell> + notificaciones
// ============================================================================

pub mod auth_state;
pub mod sync_state;
pub mod table_sort;
pub mod section_state;

pub use auth_state::*;
pub use sync_state::*;
pub use table_sort::*;
pub use section_state::*;
