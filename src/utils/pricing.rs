use chrono::{NaiveDate, NaiveDateTime};

const DATE_TIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"];

/// Acepta `YYYY-MM-DDTHH:MM[:SS]` (input datetime-local) o `YYYY-MM-DD`
pub fn parse_date_time(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    DATE_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

/// Noches completas entre entrada y salida (puede ser 0 o negativo)
pub fn nights_between(check_in: &str, check_out: &str) -> Option<i64> {
    let check_in = parse_date_time(check_in)?;
    let check_out = parse_date_time(check_out)?;
    Some(check_out.signed_duration_since(check_in).num_days())
}

/// totalPrice / noches / personas.
/// Sin valor para estancias vacías o invertidas, 0 personas o precio no finito.
pub fn price_per_night_per_person(total_price: f64, nights: i64, people: u32) -> Option<f64> {
    if nights <= 0 || people == 0 || !total_price.is_finite() {
        return None;
    }
    Some(total_price / nights as f64 / people as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nights_between_whole_days() {
        assert_eq!(nights_between("2025-06-01T00:00", "2025-06-04T00:00"), Some(3));
        // 2 días y 23 horas -> 2 noches completas
        assert_eq!(nights_between("2025-06-01T12:00", "2025-06-04T11:00"), Some(2));
        assert_eq!(nights_between("2025-06-01", "2025-06-02"), Some(1));
        assert_eq!(nights_between("2025-06-04T00:00", "2025-06-01T00:00"), Some(-3));
        assert_eq!(nights_between("mañana", "2025-06-01"), None);
    }

    #[test]
    fn test_price_per_night_per_person() {
        assert_eq!(price_per_night_per_person(300.0, 3, 2), Some(50.0));
        assert_eq!(price_per_night_per_person(300.0, 0, 2), None);
        assert_eq!(price_per_night_per_person(300.0, -1, 2), None);
        assert_eq!(price_per_night_per_person(300.0, 3, 0), None);
        assert_eq!(price_per_night_per_person(f64::NAN, 3, 2), None);
    }
}
