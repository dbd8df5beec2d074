pub mod section;
pub mod paths;
pub mod trip;
pub mod rows;
pub mod draft;

/// Documento remoto / fila serializada
pub type Document = serde_json::Map<String, serde_json::Value>;

pub use section::SectionKind;
pub use trip::Trip;
pub use rows::{
    AccommodationRow, ActivityCard, FoodCard, ItineraryDay, Location, LocationCard, RowContext,
    SectionRow, SortColumn, SortKey, TransportRow,
};
pub use draft::{DraftEntry, UnsavedTripsIndex};
