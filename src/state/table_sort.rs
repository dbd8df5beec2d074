// ============================================================================
// TABLE SORT - Ciclo de ordenación de las tablas de sección
// ============================================================================
// 1er clic: ascendente por la columna
// 2º clic: descendente
// 3er clic: vuelve a fecha de creación ascendente, sin columna activa
// ============================================================================

use std::cmp::Ordering;

use crate::models::{SectionRow, SortColumn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TableSort {
    column: Option<SortColumn>,
    direction: SortDirection,
}

impl Default for TableSort {
    fn default() -> Self {
        Self {
            column: None,
            direction: SortDirection::Ascending,
        }
    }
}

impl TableSort {
    /// Columna marcada en la cabecera (None = orden por defecto)
    pub fn active_column(&self) -> Option<SortColumn> {
        self.column
    }

    pub fn direction(&self) -> SortDirection {
        self.direction
    }

    /// Clave efectiva (creación si no hay columna activa)
    pub fn effective_column(&self) -> SortColumn {
        self.column.unwrap_or(SortColumn::CreatedAt)
    }

    pub fn click(&mut self, column: SortColumn) {
        match (self.column, self.direction) {
            (Some(active), SortDirection::Ascending) if active == column => {
                self.direction = SortDirection::Descending;
            }
            (Some(active), SortDirection::Descending) if active == column => {
                *self = TableSort::default();
            }
            _ => {
                self.column = Some(column);
                self.direction = SortDirection::Ascending;
            }
        }
    }

    pub fn compare<R: SectionRow>(&self, a: &R, b: &R) -> Ordering {
        let column = self.effective_column();
        let primary = a.sort_key(column).compare(&b.sort_key(column));
        let primary = match self.direction {
            SortDirection::Ascending => primary,
            SortDirection::Descending => primary.reverse(),
        };
        // Empates: creación ascendente, luego id
        primary
            .then_with(|| a.created_at().cmp(&b.created_at()))
            .then_with(|| a.id().cmp(b.id()))
    }

    pub fn apply<R: SectionRow>(&self, rows: &mut [R]) {
        rows.sort_by(|a, b| self.compare(a, b));
    }
}
