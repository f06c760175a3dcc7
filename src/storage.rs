use crate::error::{Error, Result};
use crate::models::{Dataset, ObservationRow};
use csv::WriterBuilder;
use std::fs::File;
use std::io::Write;
use std::path::Path;

fn csv_err(path: &Path, source: csv::Error) -> Error {
    Error::Csv {
        path: path.display().to_string(),
        source,
    }
}

fn io_err(path: &Path, source: std::io::Error) -> Error {
    Error::Io {
        path: path.display().to_string(),
        source,
    }
}

/// Save observation rows as CSV with header.
pub fn save_csv<P: AsRef<Path>>(rows: &[ObservationRow], path: P) -> Result<()> {
    let path = path.as_ref();
    let mut wtr = WriterBuilder::new()
        .from_path(path)
        .map_err(|e| csv_err(path, e))?;
    wtr.serialize(("period", "period_label", "value"))
        .map_err(|e| csv_err(path, e))?;
    for r in rows {
        wtr.serialize((&r.period_id, &r.period_label, r.value))
            .map_err(|e| csv_err(path, e))?;
    }
    wtr.flush().map_err(|e| io_err(path, e))?;
    Ok(())
}

/// Save observation rows as pretty JSON array.
pub fn save_json<P: AsRef<Path>>(rows: &[ObservationRow], path: P) -> Result<()> {
    let path = path.as_ref();
    let mut f = File::create(path).map_err(|e| io_err(path, e))?;
    let s = serde_json::to_string_pretty(rows).map_err(|e| io_err(path, std::io::Error::other(e)))?;
    f.write_all(s.as_bytes()).map_err(|e| io_err(path, e))?;
    Ok(())
}

/// Save a dataset catalogue summary as CSV (id, title, truncated
/// description, publisher, keywords).
pub fn save_catalogue_csv<P: AsRef<Path>>(datasets: &[Dataset], path: P) -> Result<()> {
    let path = path.as_ref();
    let mut wtr = WriterBuilder::new()
        .from_path(path)
        .map_err(|e| csv_err(path, e))?;
    wtr.serialize(("id", "title", "description", "publisher", "keywords"))
        .map_err(|e| csv_err(path, e))?;
    for ds in datasets {
        let description: String = ds
            .description
            .as_deref()
            .unwrap_or_default()
            .chars()
            .take(200)
            .collect();
        let publisher = ds.publisher.as_ref().map(|p| p.name.as_str()).unwrap_or_default();
        wtr.serialize((&ds.id, &ds.title, description, publisher, ds.keywords.join(", ")))
            .map_err(|e| csv_err(path, e))?;
    }
    wtr.flush().map_err(|e| io_err(path, e))?;
    Ok(())
}
