use std::io::{self, Write};
use std::path::PathBuf;

use ndarray::Array1;

/// Writes the `file,feature_0..feature_{n-1}` table consumed by training.
/// Returns the number of data rows written.
pub fn write_features_csv<W: Write>(
    mut out: W,
    n_coefficients: usize,
    records: impl IntoIterator<Item = (PathBuf, Array1<f32>)>,
) -> io::Result<usize> {
    write!(out, "file")?;
    for i in 0..n_coefficients {
        write!(out, ",feature_{i}")?;
    }
    writeln!(out)?;

    let mut rows = 0usize;
    for (path, features) in records {
        write!(out, "{}", path.display())?;
        for value in features.iter() {
            write!(out, ",{value}")?;
        }
        writeln!(out)?;
        rows += 1;
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_header_and_one_row_per_record() {
        let records = vec![
            (PathBuf::from("a.wav"), Array1::from(vec![1.0f32, 2.0])),
            (PathBuf::from("b.wav"), Array1::from(vec![3.0f32, 4.0])),
        ];
        let mut out = Vec::new();
        let rows = write_features_csv(&mut out, 2, records).unwrap();
        assert_eq!(rows, 2);

        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("file,feature_0,feature_1"));
        assert_eq!(lines.next(), Some("a.wav,1,2"));
        assert_eq!(lines.next(), Some("b.wav,3,4"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn empty_input_still_writes_the_header() {
        let mut out = Vec::new();
        let rows = write_features_csv(&mut out, 13, Vec::new()).unwrap();
        assert_eq!(rows, 0);
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("file,feature_0,"));
        assert!(text.trim_end().ends_with("feature_12"));
    }
}
