// ============================================================================
// FILAS DE SECCIÓN - Un tipo por sección + codec común
// ============================================================================
// Todas las secciones comparten el mismo ciclo de vida (borrador, flush,
// orden, borrado); lo único que cambia por sección es la forma de la fila.
// `SectionRow` es ese codec por sección.
// ============================================================================

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::cmp::Ordering;
use std::ops::{Deref, DerefMut};

use crate::error::SyncError;
use crate::models::section::SectionKind;
use crate::models::Document;
use crate::utils::pricing::{nights_between, price_per_night_per_person};

/// Columnas ordenables de las tablas de sección
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortColumn {
    Name,
    Price,
    Date,
    Location,
    CreatedAt,
}

/// Valor comparable de una celda
#[derive(Debug, Clone, PartialEq)]
pub enum SortKey {
    Empty,
    Number(f64),
    Text(String),
    Timestamp(i64),
}

impl SortKey {
    pub fn text(value: &str) -> Self {
        if value.trim().is_empty() {
            SortKey::Empty
        } else {
            SortKey::Text(value.trim().to_lowercase())
        }
    }

    pub fn optional_text(value: Option<&str>) -> Self {
        value.map(SortKey::text).unwrap_or(SortKey::Empty)
    }

    /// Orden total: las celdas vacías van primero
    pub fn compare(&self, other: &SortKey) -> Ordering {
        match (self, other) {
            (SortKey::Empty, SortKey::Empty) => Ordering::Equal,
            (SortKey::Empty, _) => Ordering::Less,
            (_, SortKey::Empty) => Ordering::Greater,
            (SortKey::Number(a), SortKey::Number(b)) => a.total_cmp(b),
            (SortKey::Text(a), SortKey::Text(b)) => a.cmp(b),
            (SortKey::Timestamp(a), SortKey::Timestamp(b)) => a.cmp(b),
            (a, b) => a.rank().cmp(&b.rank()),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            SortKey::Empty => 0,
            SortKey::Number(_) => 1,
            SortKey::Timestamp(_) => 2,
            SortKey::Text(_) => 3,
        }
    }
}

/// Datos del viaje que intervienen en los campos derivados
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RowContext {
    pub number_of_people: u32,
}

impl Default for RowContext {
    fn default() -> Self {
        Self { number_of_people: 1 }
    }
}

/// Codec por sección
pub trait SectionRow: Clone + PartialEq + Serialize + DeserializeOwned + 'static {
    const KIND: SectionKind;

    fn id(&self) -> &str;

    /// Epoch en milisegundos; orden por defecto de la tabla
    fn created_at(&self) -> i64;

    fn assign_identity(&mut self, id: String, created_at: i64);

    fn sort_key(&self, column: SortColumn) -> SortKey;

    /// Recalcula los campos derivados. Determinista para las mismas entradas.
    fn recompute_derived(&mut self, _ctx: &RowContext) {}
}

/// Punto con nombre (resultado del buscador de lugares)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    pub lat: f64,
    pub lng: f64,
}

fn default_true() -> bool {
    true
}

fn location_key(location: Option<&Location>) -> SortKey {
    SortKey::optional_text(location.map(|l| l.name.as_str()))
}

// ==========================================
// ALOJAMIENTO
// ==========================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccommodationRow {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub location: Option<Location>,
    /// `YYYY-MM-DDTHH:MM`
    #[serde(default)]
    pub check_in: Option<String>,
    #[serde(default)]
    pub check_out: Option<String>,
    #[serde(default)]
    pub total_price: f64,
    /// Derivado: totalPrice / noches / personas
    #[serde(default)]
    pub price_per_night_per_person: Option<f64>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub notes: String,
    #[serde(default = "default_true")]
    pub included_in_total: bool,
    #[serde(default)]
    pub created_at: i64,
}

impl AccommodationRow {
    pub fn nights(&self) -> Option<i64> {
        match (self.check_in.as_deref(), self.check_out.as_deref()) {
            (Some(check_in), Some(check_out)) => nights_between(check_in, check_out),
            _ => None,
        }
    }
}

impl SectionRow for AccommodationRow {
    const KIND: SectionKind = SectionKind::Accommodation;

    fn id(&self) -> &str {
        &self.id
    }

    fn created_at(&self) -> i64 {
        self.created_at
    }

    fn assign_identity(&mut self, id: String, created_at: i64) {
        self.id = id;
        self.created_at = created_at;
    }

    fn sort_key(&self, column: SortColumn) -> SortKey {
        match column {
            SortColumn::Name => SortKey::text(&self.name),
            SortColumn::Price => SortKey::Number(self.total_price),
            SortColumn::Date => SortKey::optional_text(self.check_in.as_deref()),
            SortColumn::Location => location_key(self.location.as_ref()),
            SortColumn::CreatedAt => SortKey::Timestamp(self.created_at),
        }
    }

    fn recompute_derived(&mut self, ctx: &RowContext) {
        self.price_per_night_per_person = self
            .nights()
            .and_then(|nights| price_per_night_per_person(self.total_price, nights, ctx.number_of_people));
    }
}

// ==========================================
// COMIDA / ACTIVIDADES (tarjetas de lugar)
// ==========================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationCard {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub notes: String,
    #[serde(default = "default_true")]
    pub included_in_total: bool,
    #[serde(default)]
    pub created_at: i64,
}

impl LocationCard {
    fn sort_key(&self, column: SortColumn) -> SortKey {
        match column {
            SortColumn::Name => SortKey::text(&self.name),
            SortColumn::Price => SortKey::Number(self.price),
            SortColumn::Date => SortKey::optional_text(self.date.as_deref()),
            SortColumn::Location => location_key(self.location.as_ref()),
            SortColumn::CreatedAt => SortKey::Timestamp(self.created_at),
        }
    }
}

macro_rules! location_card_section {
    ($name:ident, $kind:expr) => {
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub LocationCard);

        impl Deref for $name {
            type Target = LocationCard;
            fn deref(&self) -> &LocationCard {
                &self.0
            }
        }

        impl DerefMut for $name {
            fn deref_mut(&mut self) -> &mut LocationCard {
                &mut self.0
            }
        }

        impl SectionRow for $name {
            const KIND: SectionKind = $kind;

            fn id(&self) -> &str {
                &self.0.id
            }

            fn created_at(&self) -> i64 {
                self.0.created_at
            }

            fn assign_identity(&mut self, id: String, created_at: i64) {
                self.0.id = id;
                self.0.created_at = created_at;
            }

            fn sort_key(&self, column: SortColumn) -> SortKey {
                self.0.sort_key(column)
            }
        }
    };
}

location_card_section!(FoodCard, SectionKind::Food);
location_card_section!(ActivityCard, SectionKind::Activities);

// ==========================================
// TRANSPORTE
// ==========================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportRow {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// "flight", "train", "bus", "car", ...
    #[serde(default)]
    pub mode: String,
    #[serde(default)]
    pub origin: Option<Location>,
    #[serde(default)]
    pub destination: Option<Location>,
    #[serde(default)]
    pub departure: Option<String>,
    #[serde(default)]
    pub arrival: Option<String>,
    #[serde(default)]
    pub price: f64,
    #[serde(default = "default_true")]
    pub included_in_total: bool,
    #[serde(default)]
    pub created_at: i64,
}

impl SectionRow for TransportRow {
    const KIND: SectionKind = SectionKind::Transport;

    fn id(&self) -> &str {
        &self.id
    }

    fn created_at(&self) -> i64 {
        self.created_at
    }

    fn assign_identity(&mut self, id: String, created_at: i64) {
        self.id = id;
        self.created_at = created_at;
    }

    fn sort_key(&self, column: SortColumn) -> SortKey {
        match column {
            SortColumn::Name => SortKey::text(&self.name),
            SortColumn::Price => SortKey::Number(self.price),
            SortColumn::Date => SortKey::optional_text(self.departure.as_deref()),
            SortColumn::Location => location_key(self.origin.as_ref()),
            SortColumn::CreatedAt => SortKey::Timestamp(self.created_at),
        }
    }
}

// ==========================================
// ITINERARIO
// ==========================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItineraryDay {
    pub id: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub created_at: i64,
}

impl SectionRow for ItineraryDay {
    const KIND: SectionKind = SectionKind::Itinerary;

    fn id(&self) -> &str {
        &self.id
    }

    fn created_at(&self) -> i64 {
        self.created_at
    }

    fn assign_identity(&mut self, id: String, created_at: i64) {
        self.id = id;
        self.created_at = created_at;
    }

    fn sort_key(&self, column: SortColumn) -> SortKey {
        match column {
            SortColumn::Name => SortKey::text(&self.title),
            SortColumn::Price => SortKey::Empty,
            SortColumn::Date => SortKey::optional_text(self.date.as_deref()),
            SortColumn::Location => location_key(self.location.as_ref()),
            SortColumn::CreatedAt => SortKey::Timestamp(self.created_at),
        }
    }
}

// ==========================================
// CODEC FILA <-> DOCUMENTO
// ==========================================

pub fn encode_row<R: SectionRow>(row: &R) -> Result<Document, SyncError> {
    match serde_json::to_value(row)? {
        serde_json::Value::Object(map) => Ok(map),
        other => Err(SyncError::Serialization(format!(
            "la fila de {} no es un objeto: {}",
            R::KIND,
            other
        ))),
    }
}

pub fn encode_rows<R: SectionRow>(rows: &[R]) -> Result<Vec<Document>, SyncError> {
    rows.iter().map(encode_row).collect()
}

/// Filas decodificadas y cuántos documentos no encajaron en el tipo
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedRows<R> {
    pub rows: Vec<R>,
    pub skipped: usize,
}

/// Decodifica documentos; los que no encajan en `R` se cuentan y se avisa
pub fn decode_rows_counted<R: SectionRow>(docs: &[Document]) -> DecodedRows<R> {
    let mut rows = Vec::with_capacity(docs.len());
    let mut skipped = 0;
    for doc in docs {
        match serde_json::from_value::<R>(serde_json::Value::Object(doc.clone())) {
            Ok(row) => rows.push(row),
            Err(e) => {
                skipped += 1;
                log::warn!("⚠️ Documento de {} ignorado ({:?}): {}", R::KIND, doc.get("id"), e);
            }
        }
    }
    DecodedRows { rows, skipped }
}

pub fn decode_rows<R: SectionRow>(docs: &[Document]) -> Vec<R> {
    decode_rows_counted(docs).rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn accommodation(total_price: f64, check_in: &str, check_out: &str) -> AccommodationRow {
        serde_json::from_value(json!({
            "id": "a1",
            "totalPrice": total_price,
            "checkIn": check_in,
            "checkOut": check_out,
        }))
        .unwrap()
    }

    #[test]
    fn test_price_per_night_per_person() {
        let mut row = accommodation(300.0, "2025-06-01T00:00", "2025-06-04T00:00");
        row.recompute_derived(&RowContext { number_of_people: 2 });
        assert_eq!(row.nights(), Some(3));
        assert_eq!(row.price_per_night_per_person, Some(50.0));
    }

    #[test]
    fn test_degenerate_stay_has_no_derived_price() {
        let mut row = accommodation(300.0, "2025-06-04T00:00", "2025-06-04T00:00");
        row.recompute_derived(&RowContext { number_of_people: 2 });
        assert_eq!(row.price_per_night_per_person, None);

        let mut row = accommodation(300.0, "2025-06-01T00:00", "2025-06-04T00:00");
        row.recompute_derived(&RowContext { number_of_people: 0 });
        assert_eq!(row.price_per_night_per_person, None);
    }

    #[test]
    fn test_derived_field_is_stored_camel_case() {
        let mut row = accommodation(300.0, "2025-06-01T00:00", "2025-06-04T00:00");
        row.recompute_derived(&RowContext { number_of_people: 2 });
        let doc = encode_row(&row).unwrap();
        assert_eq!(doc.get("pricePerNightPerPerson"), Some(&json!(50.0)));
        assert_eq!(doc.get("includedInTotal"), Some(&json!(true)));
    }

    #[test]
    fn test_food_card_is_transparent() {
        let card = FoodCard(LocationCard {
            id: "f1".to_string(),
            name: "Ramen Ichiran".to_string(),
            location: None,
            date: None,
            price: 12.5,
            notes: String::new(),
            included_in_total: false,
            created_at: 10,
        });
        let doc = encode_row(&card).unwrap();
        assert_eq!(doc.get("id"), Some(&json!("f1")));
        let back: Vec<FoodCard> = decode_rows(&[doc]);
        assert_eq!(back, vec![card]);
        assert_eq!(FoodCard::KIND, SectionKind::Food);
        assert_eq!(ActivityCard::KIND, SectionKind::Activities);
    }

    #[test]
    fn test_decode_skips_malformed_documents() {
        let good = json!({"id": "t1", "name": "Shinkansen", "price": 90.0});
        let bad = json!({"name": "sin id"});
        let docs: Vec<Document> = [good, bad]
            .into_iter()
            .map(|v| v.as_object().cloned().unwrap())
            .collect();
        let decoded: DecodedRows<TransportRow> = decode_rows_counted(&docs);
        assert_eq!(decoded.skipped, 1);
        let rows = decoded.rows;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, "t1");
        assert!(rows[0].included_in_total);
    }

    #[test]
    fn test_sort_key_empty_first() {
        assert_eq!(SortKey::Empty.compare(&SortKey::text("a")), Ordering::Less);
        assert_eq!(SortKey::text("  ").compare(&SortKey::Empty), Ordering::Equal);
        assert_eq!(
            SortKey::Number(2.0).compare(&SortKey::Number(10.0)),
            Ordering::Less
        );
        assert_eq!(SortKey::text("Berlín").compare(&SortKey::text("atenas")), Ordering::Greater);
    }
}
