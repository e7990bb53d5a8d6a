//! Per-divisor error report, written as CSV.

use std::io;
use std::path::Path;

use itertools::izip;
use serde::Serialize;

use crate::error::{Error, Result};

/// `|approx - exact| / |exact|` in percent. Infinite for `exact == 0`,
/// NaN when `approx` is zero as well.
pub fn relative_error_percent(approx: f64, exact: f64) -> f64 {
    (approx - exact).abs() / exact.abs() * 100.0
}

/// One CSV row.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ErrorRecord {
    /// y of this slot.
    pub divisor: f64,
    /// Error of the plaintext recurrence.
    pub reference_error_percent: f64,
    /// Error of the decrypted quotient.
    pub encrypted_error_percent: f64,
}

/// One record per slot, errors taken against the exact quotient `x / y`.
pub fn error_records(
    x: &[f64],
    y: &[f64],
    reference: &[f64],
    encrypted: &[f64],
) -> Result<Vec<ErrorRecord>> {
    let n = x.len();
    if let Some(got) = [y.len(), reference.len(), encrypted.len()]
        .into_iter()
        .find(|&len| len != n)
    {
        return Err(Error::SlotCountMismatch { expected: n, got });
    }
    Ok(izip!(x, y, reference, encrypted)
        .map(|(&xi, &yi, &r, &e)| {
            let exact = xi / yi;
            ErrorRecord {
                divisor: yi,
                reference_error_percent: relative_error_percent(r, exact),
                encrypted_error_percent: relative_error_percent(e, exact),
            }
        })
        .collect())
}

/// Header row from the field names, then one row per record.
pub fn write_csv<W: io::Write>(writer: W, records: &[ErrorRecord]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for record in records {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    Ok(())
}

/// [`write_csv`] into a newly created file.
pub fn write_csv_file<P: AsRef<Path>>(path: P, records: &[ErrorRecord]) -> Result<()> {
    let file = std::fs::File::create(path)?;
    write_csv(io::BufWriter::new(file), records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_error_percent() {
        assert!((relative_error_percent(0.163, 0.2) - 18.5).abs() < 1e-9);
        assert_eq!(relative_error_percent(-2.0, -2.0), 0.0);
        assert!((relative_error_percent(-1.5, -2.0) - 25.0).abs() < 1e-12);
    }

    #[test]
    fn test_relative_error_percent_zero_exact() {
        assert!(relative_error_percent(1.0, 0.0).is_infinite());
        assert!(relative_error_percent(0.0, 0.0).is_nan());
    }

    #[test]
    fn test_error_records() {
        let x = [100.0, 100.0];
        let y = [500.0, 5000.0];
        let records = error_records(&x, &y, &[0.15, 0.02], &[0.16, 0.021]).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].divisor, 5000.0);
        assert!((records[0].reference_error_percent - 25.0).abs() < 1e-9);
        assert!((records[0].encrypted_error_percent - 20.0).abs() < 1e-9);
        assert!(records[1].reference_error_percent.abs() < 1e-9);

        assert!(matches!(
            error_records(&[1.0], &[1.0, 2.0], &[1.0], &[1.0]),
            Err(Error::SlotCountMismatch { expected: 1, got: 2 })
        ));
    }

    #[test]
    fn test_write_csv() {
        let records = vec![
            ErrorRecord {
                divisor: 500.0,
                reference_error_percent: 18.5,
                encrypted_error_percent: 18.75,
            },
            ErrorRecord {
                divisor: 5000.0,
                reference_error_percent: 0.0,
                encrypted_error_percent: 0.5,
            },
        ];
        let mut buf = Vec::new();
        write_csv(&mut buf, &records).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            [
                "divisor,reference_error_percent,encrypted_error_percent",
                "500.0,18.5,18.75",
                "5000.0,0.0,0.5",
            ]
        );
    }

    #[test]
    fn test_write_csv_file() {
        let name = format!("ckks-division-{}.csv", std::process::id());
        let path = std::env::temp_dir().join(name);
        write_csv_file(&path, &[]).unwrap();
        assert!(path.exists());
        std::fs::remove_file(&path).unwrap();
    }
}
