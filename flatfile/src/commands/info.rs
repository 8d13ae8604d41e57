use std::path::PathBuf;

use flatfile_format::{FileValidationRule, LineFormat};

use crate::error::{Error, Result};

static RULES: [FileValidationRule; 4] = [
    FileValidationRule::MustHaveRows,
    FileValidationRule::MustHaveHeaderRow,
    FileValidationRule::MustHaveTrailerRow,
    FileValidationRule::MustHaveAtLeastOneContentRow,
];

pub fn run(layout_path: PathBuf) -> Result<()> {
    let layout = super::load_layout(&layout_path)?;
    let definition = layout.definition();

    match &definition.line_format {
        LineFormat::Delimited(options) => println!(
            "Delimited, delimiter {:?}, qualifier {:?}",
            options.delimiter, options.qualifier
        ),
        LineFormat::FixedWidth(options) => println!("Fixed width, pad {:?}", options.pad),
    }

    if let Some(header) = &definition.header {
        println!("Header:  {}", header.record_type);
    }
    println!("Content: {}", definition.content.record_type);
    if let Some(trailer) = &definition.trailer {
        println!("Trailer: {}", trailer.record_type);
    }

    let rules: Vec<_> = RULES
        .iter()
        .filter(|rule| definition.file_validation.requires(**rule))
        .map(|rule| rule.as_str())
        .collect();
    if !rules.is_empty() {
        println!("Rules:   {}", rules.join(", "));
    }

    if !definition.is_hierarchical() {
        return Ok(());
    }

    let index = layout.hierarchy().map_err(|source| Error::LoadLayout {
        path: layout_path.clone(),
        source,
    })?;

    println!();
    for (_, node) in index.iter() {
        let cardinality = match &node.descriptor {
            None => String::new(),
            Some(d) if !d.is_collection => {
                format!(" ({})", if d.is_mandatory { "1" } else { "0..1" })
            }
            Some(d) => {
                let min = if d.is_mandatory { d.min_count.max(1) } else { 0 };
                match d.upper_bound() {
                    Some(max) => format!(" ({}..{})", min, max),
                    None => format!(" ({}..)", min),
                }
            }
        };

        println!(
            "{}{} {}{}",
            "  ".repeat(node.level),
            node.record_identifier,
            node.record_type,
            cardinality
        );
    }

    Ok(())
}
