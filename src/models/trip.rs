use serde::{Deserialize, Serialize};

/// Viaje: unidad de planificación de un usuario.
/// Se guarda completo (sin merge) en `users/{uid}/trips/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    pub id: String,
    pub name: String,
    /// Fechas `YYYY-MM-DD`
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    #[serde(default)]
    pub countries: Vec<String>,
    #[serde(default = "default_people")]
    pub number_of_people: u32,
    #[serde(default)]
    pub currency: Option<Currency>,
    #[serde(default)]
    pub budget: Option<f64>,
    #[serde(default)]
    pub image: Option<String>,
    /// Secciones declaradas por el usuario (en orden de pestañas)
    #[serde(default)]
    pub sub_sections: Vec<String>,
    #[serde(default)]
    pub tasks: Vec<TripTask>,
}

fn default_people() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Currency {
    pub code: String,
    pub symbol: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripTask {
    pub text: String,
    #[serde(default)]
    pub done: bool,
}

impl Trip {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            start_date: None,
            end_date: None,
            countries: Vec::new(),
            number_of_people: default_people(),
            currency: None,
            budget: None,
            image: None,
            sub_sections: Vec::new(),
            tasks: Vec::new(),
        }
    }
}
