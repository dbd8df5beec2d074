// Rutas jerárquicas del almacén remoto:
//   users/{uid}/trips/{tripId}
//   users/{uid}/trips/{tripId}/{sección}/{rowId}

use crate::models::section::SectionKind;

pub fn trips_collection_path(user_id: &str) -> String {
    format!("users/{}/trips", user_id)
}

pub fn trip_document_path(user_id: &str, trip_id: &str) -> String {
    format!("users/{}/trips/{}", user_id, trip_id)
}

pub fn section_collection_path(user_id: &str, trip_id: &str, kind: SectionKind) -> String {
    format!("users/{}/trips/{}/{}", user_id, trip_id, kind.as_str())
}

pub fn row_document_path(user_id: &str, trip_id: &str, kind: SectionKind, row_id: &str) -> String {
    format!("{}/{}", section_collection_path(user_id, trip_id, kind), row_id)
}

/// Último segmento de una ruta (el id del documento)
pub fn document_id(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Colección que contiene el documento (`a/b/c` -> `a/b`)
pub fn parent_collection(path: &str) -> &str {
    path.rsplit_once('/').map(|(parent, _)| parent).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_path_layout() {
        let path = row_document_path("u1", "T1", SectionKind::Accommodation, "a1");
        assert_eq!(path, "users/u1/trips/T1/accommodation/a1");
        assert_eq!(document_id(&path), "a1");
        assert_eq!(parent_collection(&path), "users/u1/trips/T1/accommodation");
    }

    #[test]
    fn test_trip_paths() {
        assert_eq!(trip_document_path("u1", "T1"), "users/u1/trips/T1");
        assert_eq!(parent_collection(&trip_document_path("u1", "T1")), trips_collection_path("u1"));
    }
}
