//! Lenient parsing of the query/payload formats the old frontend sends.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Truthy/falsy query parameter. Anything else is ignored by callers.
pub fn bool_param(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "y" => Some(true),
        "false" | "0" | "no" | "n" => Some(false),
        _ => None,
    }
}

/// A date, also accepting ISO date-times and keeping only the date part.
pub fn date_flexible(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    let date_part = value.split('T').next().unwrap_or(value);
    date_part.parse().ok()
}

/// An ISO timestamp: `Z` suffix, explicit offset, naive date-time, or a bare
/// date (midnight UTC). Anything unparseable yields None.
pub fn datetime_flexible(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(&value.replace('Z', "+00:00")) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = value.parse::<NaiveDateTime>() {
        return Some(naive.and_utc());
    }
    value
        .parse::<NaiveDate>()
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|n| n.and_utc())
}

/// Comma-separated list parameter, trimmed, empty entries dropped.
pub fn csv_param(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bool_param_synonyms() {
        assert_eq!(bool_param("true"), Some(true));
        assert_eq!(bool_param("YES"), Some(true));
        assert_eq!(bool_param("0"), Some(false));
        assert_eq!(bool_param(" n "), Some(false));
        assert_eq!(bool_param("maybe"), None);
    }

    #[test]
    fn test_date_flexible_truncates_time() {
        let expected: NaiveDate = "2024-05-01".parse().unwrap();
        assert_eq!(date_flexible("2024-05-01"), Some(expected));
        assert_eq!(date_flexible("2024-05-01T14:30:00Z"), Some(expected));
        assert_eq!(date_flexible("not a date"), None);
        assert_eq!(date_flexible(""), None);
    }

    #[test]
    fn test_datetime_flexible_formats() {
        assert!(datetime_flexible("2024-05-01T10:00:00Z").is_some());
        assert!(datetime_flexible("2024-05-01T10:00:00+02:00").is_some());
        assert!(datetime_flexible("2024-05-01T10:00:00").is_some());
        assert!(datetime_flexible("2024-05-01").is_some());
        assert!(datetime_flexible("next tuesday").is_none());

        let z = datetime_flexible("2024-05-01T10:00:00Z").unwrap();
        let offset = datetime_flexible("2024-05-01T12:00:00+02:00").unwrap();
        assert_eq!(z, offset);
    }

    #[test]
    fn test_csv_param() {
        assert_eq!(
            csv_param("pagado, entregado ,,recogido"),
            vec!["pagado", "entregado", "recogido"]
        );
        assert!(csv_param("  ,").is_empty());
    }
}
