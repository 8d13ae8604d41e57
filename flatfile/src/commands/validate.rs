use std::path::PathBuf;

use flatfile_format::{FileReader, Severity};

use crate::error::{Error, Result};

/// Prints every warning and error in the file. Returns whether the file is free of errors.
pub fn run(layout: PathBuf, path: PathBuf, stop_on_error: bool) -> Result<bool> {
    let layout = super::load_layout(&layout)?;
    let reader = FileReader::open(&path, layout)
        .map_err(|source| Error::OpenFile {
            path: path.clone(),
            source,
        })?
        .stop_on_error(stop_on_error);

    let mut groups = 0usize;
    let mut warnings = 0usize;
    let mut errors = 0usize;

    for result in reader {
        let result = result.map_err(|source| Error::ReadFile {
            path: path.clone(),
            source,
        })?;
        groups += 1;

        for record in &result.records {
            for message in record.messages_at_least(Severity::Warning) {
                match message.severity {
                    Severity::Error => errors += 1,
                    _ => warnings += 1,
                }

                let property = match &message.property {
                    Some(p) => format!(" [{}]", p),
                    None => String::new(),
                };
                println!(
                    "{}:{}: {:?}: {}{}",
                    path.display(),
                    record.line_number,
                    message.severity,
                    message.text,
                    property
                );
            }
        }
    }

    println!(
        "{} record group(s), {} warning(s), {} error(s)",
        groups, warnings, errors
    );
    Ok(errors == 0)
}
