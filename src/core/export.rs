//! CSV export of a sweep series.
//!
//! Format: header `Distance,QBER_Normal,QBER_Eve`, one row per point. A
//! missing eve value is an empty field, never `0`. A repeater comparison
//! series uses `Distance,QBER_No_Repeater,QBER_Repeater` instead.

use std::path::Path;

use crate::core::aggregator::SweepPoint;
use crate::core::error::SweepError;
use crate::io::atomic::atomic_write;

pub const CSV_HEADER: &str = "Distance,QBER_Normal,QBER_Eve";
pub const REPEATER_CSV_HEADER: &str = "Distance,QBER_No_Repeater,QBER_Repeater";

pub fn render_csv(points: &[SweepPoint]) -> String {
    let repeater = points.iter().any(|p| p.qber_repeater.is_some());
    let header = if repeater { REPEATER_CSV_HEADER } else { CSV_HEADER };
    let mut csv = String::with_capacity(header.len() + 1 + points.len() * 24);
    csv.push_str(header);
    csv.push('\n');
    for p in points {
        let third = if repeater { p.qber_repeater } else { p.qber_eve };
        let third = third.map(|e| e.to_string()).unwrap_or_default();
        csv.push_str(&format!("{},{},{}\n", p.distance, p.qber_normal, third));
    }
    csv
}

/// Parse an export back into `(distance, qber_normal, third column)` rows.
/// The third column is the eve or the repeater QBER depending on the header.
pub fn parse_csv(text: &str) -> Result<Vec<(f64, f64, Option<f64>)>, SweepError> {
    let mut lines = text.lines();
    match lines.next() {
        Some(h) if h.trim_end() == CSV_HEADER || h.trim_end() == REPEATER_CSV_HEADER => {}
        other => return Err(SweepError::protocol(format!("bad csv header: {other:?}"))),
    }
    let mut rows = Vec::new();
    for (n, line) in lines.enumerate() {
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() != 3 {
            return Err(SweepError::protocol(format!("row {}: expected 3 fields, got {}", n + 1, fields.len())));
        }
        let num = |s: &str| {
            s.parse::<f64>()
                .map_err(|e| SweepError::protocol(format!("row {}: {s:?}: {e}", n + 1)))
        };
        let eve = if fields[2].is_empty() { None } else { Some(num(fields[2])?) };
        rows.push((num(fields[0])?, num(fields[1])?, eve));
    }
    Ok(rows)
}

pub fn write_csv(path: &Path, points: &[SweepPoint]) -> Result<(), SweepError> {
    atomic_write(path, render_csv(points))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_series_is_header_only() {
        assert_eq!(render_csv(&[]), "Distance,QBER_Normal,QBER_Eve\n");
    }

    #[test]
    fn absent_eve_is_empty_token() {
        let csv = render_csv(&[SweepPoint { distance: 10.0, qber_normal: 0.02, qber_eve: None, qber_repeater: None }]);
        assert_eq!(csv.lines().nth(1), Some("10,0.02,"));
    }

    #[test]
    fn zero_eve_is_kept_as_zero() {
        let csv = render_csv(&[SweepPoint { distance: 10.0, qber_normal: 0.0, qber_eve: Some(0.0), qber_repeater: None }]);
        assert_eq!(csv.lines().nth(1), Some("10,0,0"));
        assert_eq!(parse_csv(&csv).unwrap(), vec![(10.0, 0.0, Some(0.0))]);
    }

    #[test]
    fn repeater_series_uses_its_own_header() {
        let csv = render_csv(&[SweepPoint { distance: 20.0, qber_normal: 0.04, qber_eve: None, qber_repeater: Some(0.02) }]);
        assert_eq!(csv, "Distance,QBER_No_Repeater,QBER_Repeater\n20,0.04,0.02\n");
        assert_eq!(parse_csv(&csv).unwrap(), vec![(20.0, 0.04, Some(0.02))]);
    }

    #[test]
    fn rejects_foreign_header() {
        assert!(parse_csv("a,b,c\n1,2,3\n").is_err());
        assert!(parse_csv("").is_err());
    }

    #[test]
    fn rejects_short_row() {
        assert!(parse_csv("Distance,QBER_Normal,QBER_Eve\n10,0.1\n").is_err());
    }
}
