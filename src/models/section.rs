use serde::{Deserialize, Serialize};
use std::fmt;

/// Secciones de un viaje. Cada una es una colección bajo el documento del viaje.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionKind {
    Accommodation,
    Food,
    Activities,
    Transport,
    Itinerary,
}

impl SectionKind {
    pub const ALL: [SectionKind; 5] = [
        SectionKind::Accommodation,
        SectionKind::Food,
        SectionKind::Activities,
        SectionKind::Transport,
        SectionKind::Itinerary,
    ];

    /// Nombre de la colección remota y fragmento de la clave de borrador
    pub fn as_str(&self) -> &'static str {
        match self {
            SectionKind::Accommodation => "accommodation",
            SectionKind::Food => "food",
            SectionKind::Activities => "activities",
            SectionKind::Transport => "transport",
            SectionKind::Itinerary => "itinerary",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == value)
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_matches_wire_name() {
        for kind in SectionKind::ALL {
            assert_eq!(SectionKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(SectionKind::parse("trips"), None);
    }

    #[test]
    fn test_serde_uses_lowercase() {
        let json = serde_json::to_string(&SectionKind::Activities).unwrap();
        assert_eq!(json, "\"activities\"");
    }
}
