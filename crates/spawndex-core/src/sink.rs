//! Sorting and CSV output for merged rows

use crate::error::{Error, Result};
use crate::row::CsvRow;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{info, warn};

/// Sort rows by a primary and secondary column, case-insensitively.
///
/// The sort is stable; a column the row type does not have sorts as "".
pub fn sort_rows<R: CsvRow>(rows: &mut [R], primary: &str, secondary: &str) {
    for key in [primary, secondary] {
        if !rows.is_empty() && !R::columns().contains(&key) {
            warn!(column = %key, "sort key is not an output column; ignoring it");
        }
    }

    rows.sort_by_cached_key(|row| {
        (
            row.field(primary).unwrap_or("").to_lowercase(),
            row.field(secondary).unwrap_or("").to_lowercase(),
        )
    });
}

/// Write a header and all rows, flushing every `batch_size` rows.
///
/// The output bytes do not depend on `batch_size`.
pub fn write_rows<W: Write, R: CsvRow>(writer: W, rows: &[R], batch_size: usize) -> csv::Result<()> {
    let mut csv_writer = csv::WriterBuilder::new().from_writer(writer);
    csv_writer.write_record(R::columns())?;

    for batch in rows.chunks(batch_size.max(1)) {
        for row in batch {
            csv_writer.write_record(row.values())?;
        }
        csv_writer.flush()?;
    }

    csv_writer.flush()?;
    Ok(())
}

/// Write rows to a CSV file, replacing it if it exists
pub fn write_csv<R: CsvRow>(path: &Path, rows: &[R], batch_size: usize) -> Result<()> {
    let file = File::create(path).map_err(|e| Error::FileWrite {
        path: path.to_path_buf(),
        source: e,
    })?;
    write_rows(BufWriter::new(file), rows, batch_size).map_err(|e| Error::Csv {
        path: path.to_path_buf(),
        source: e,
    })?;

    info!(path = %path.display(), rows = rows.len(), "wrote CSV");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::{MergedRow, SkippedEntry, MAIN_COLUMNS};

    fn row(name: &str, spawn_id: &str) -> MergedRow {
        MergedRow {
            pokemon_name: name.to_string(),
            spawn_id: spawn_id.to_string(),
            ..Default::default()
        }
    }

    fn render<R: CsvRow>(rows: &[R], batch_size: usize) -> String {
        let mut buf = Vec::new();
        write_rows(&mut buf, rows, batch_size).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_sort_case_insensitive_with_secondary() {
        let mut rows = vec![
            row("eevee", "eevee-2"),
            row("Bulbasaur", "b-1"),
            row("Eevee", "eevee-1"),
            row("abra", "a-1"),
        ];
        sort_rows(&mut rows, "Pokemon Name", "Spawn ID");

        let ids: Vec<&str> = rows.iter().map(|r| r.spawn_id.as_str()).collect();
        assert_eq!(ids, vec!["a-1", "b-1", "eevee-1", "eevee-2"]);
    }

    #[test]
    fn test_sort_unknown_column_keeps_order() {
        let mut rows = vec![
            SkippedEntry {
                dex_number: "0151".to_string(),
                ..Default::default()
            },
            SkippedEntry {
                dex_number: "0026".to_string(),
                ..Default::default()
            },
        ];
        sort_rows(&mut rows, "Spawn ID", "Weight");
        assert_eq!(rows[0].dex_number, "0151");
    }

    #[test]
    fn test_header_written_for_empty_output() {
        let output = render::<MergedRow>(&[], 10);
        assert_eq!(output.trim_end(), MAIN_COLUMNS.join(","));
    }

    #[test]
    fn test_batch_size_does_not_change_output() {
        let rows: Vec<MergedRow> = (0..25).map(|i| row("pikachu", &format!("p-{}", i))).collect();
        let small = render(&rows, 1);
        assert_eq!(small, render(&rows, 7));
        assert_eq!(small, render(&rows, 1000));
        assert_eq!(small, render(&rows, 0));
        assert_eq!(small.lines().count(), 26);
    }

    #[test]
    fn test_fields_with_commas_are_quoted() {
        let mut r = row("pikachu", "p-1");
        r.egg_groups = "Field, Fairy".to_string();
        let output = render(&[r], 10);
        assert!(output.contains("\"Field, Fairy\""));
    }

    #[test]
    fn test_write_csv_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        write_csv(&path, &[row("pikachu", "p-1")], 100).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.len(), MAIN_COLUMNS.len());
        let record = reader.records().next().unwrap().unwrap();
        assert_eq!(&record[1], "pikachu");
    }
}
