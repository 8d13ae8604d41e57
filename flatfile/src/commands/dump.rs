use std::io::Write;
use std::path::PathBuf;

use flatfile_format::FileReader;

use crate::error::{Error, Result};

/// Writes each record group as one line of JSON.
pub fn run(layout: PathBuf, path: PathBuf, values_only: bool) -> Result<()> {
    let layout = super::load_layout(&layout)?;
    let mut reader = FileReader::open(&path, layout).map_err(|source| Error::OpenFile {
        path: path.clone(),
        source,
    })?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    loop {
        let result = reader.read_next_group().map_err(|source| Error::ReadFile {
            path: path.clone(),
            source,
        })?;
        if result.is_end_of_file() {
            break;
        }

        if values_only {
            if let Some(value) = &result.value {
                serde_json::to_writer(&mut out, value)?;
                writeln!(out)?;
            }
        } else {
            let line = serde_json::json!({
                "status": result.status,
                "total_lines": result.total_lines,
                "has_errors": result.has_errors(),
                "records": result.records,
                "value": result.value,
            });
            serde_json::to_writer(&mut out, &line)?;
            writeln!(out)?;
        }
    }

    out.flush()?;
    Ok(())
}
