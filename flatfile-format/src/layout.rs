use std::fmt;
use std::sync::{Arc, Mutex, OnceLock};

use crate::column::ColumnDescriptor;
use crate::definition::{FormatDefinition, LineFormat, RecordKind};
use crate::error::ConfigError;
use crate::hierarchy::HierarchyIndex;
use crate::metadata::MetadataProvider;
use crate::tokenize::LineCodec;

/// A checked pairing of a [`FormatDefinition`] with the [`MetadataProvider`]
/// describing its record types.
///
/// Readers and writers share a layout through an `Arc`. The hierarchy index is
/// built the first time it is asked for and reused from then on.
pub struct Layout<P: MetadataProvider> {
    definition: FormatDefinition,
    provider: P,
    codec: Box<dyn LineCodec>,
    hierarchy: OnceLock<Arc<HierarchyIndex>>,
    build_lock: Mutex<()>,
}

impl<P: MetadataProvider> fmt::Debug for Layout<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Layout")
            .field("definition", &self.definition)
            .field("hierarchy", &self.hierarchy.get())
            .finish_non_exhaustive()
    }
}

impl<P: MetadataProvider> Layout<P> {
    pub fn new(definition: FormatDefinition, provider: P) -> Result<Layout<P>, ConfigError> {
        definition.validate()?;

        let kinds = std::iter::once(&definition.content)
            .chain(definition.header.iter())
            .chain(definition.trailer.iter());

        for kind in kinds {
            check_columns(&definition, &provider, kind)?;
        }

        let codec = definition.line_format.codec();

        Ok(Layout {
            definition,
            provider,
            codec,
            hierarchy: OnceLock::new(),
            build_lock: Mutex::new(()),
        })
    }

    #[inline(always)]
    pub fn definition(&self) -> &FormatDefinition {
        &self.definition
    }

    #[inline(always)]
    pub fn provider(&self) -> &P {
        &self.provider
    }

    #[inline(always)]
    pub fn codec(&self) -> &dyn LineCodec {
        &*self.codec
    }

    /// Columns of `record_type`, or none if the provider does not know it.
    pub fn columns_for(&self, record_type: &str) -> &[ColumnDescriptor] {
        self.provider.columns_for(record_type).unwrap_or(&[])
    }

    /// The hierarchy index, built on first use.
    pub fn hierarchy(&self) -> Result<Arc<HierarchyIndex>, ConfigError> {
        if let Some(index) = self.hierarchy.get() {
            return Ok(Arc::clone(index));
        }

        // A poisoned lock only means another builder panicked; the cell is still consistent.
        let _guard = self
            .build_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(index) = self.hierarchy.get() {
            return Ok(Arc::clone(index));
        }

        let index = HierarchyIndex::build(&self.definition, &self.provider)?;

        for (_, node) in index.iter().skip(1) {
            let kind = RecordKind::identified(node.record_type.as_str(), node.record_identifier.as_str());
            check_columns(&self.definition, &self.provider, &kind)?;
        }

        let index = Arc::new(index);
        Ok(Arc::clone(self.hierarchy.get_or_init(|| index)))
    }
}

fn check_columns<P>(
    definition: &FormatDefinition,
    provider: &P,
    kind: &RecordKind,
) -> Result<(), ConfigError>
where
    P: MetadataProvider + ?Sized,
{
    let columns = provider
        .columns_for(&kind.record_type)
        .ok_or_else(|| ConfigError::UnknownRecordType(kind.record_type.clone()))?;

    match &definition.line_format {
        LineFormat::FixedWidth(_) => {
            if let Some(column) = columns.iter().find(|c| c.width.is_none()) {
                return Err(ConfigError::MissingWidth {
                    record_type: kind.record_type.clone(),
                    column: column.name.clone(),
                });
            }
        }
        LineFormat::Delimited(options) => {
            if kind.record_identifier.is_some() && options.identifier_column >= columns.len() {
                return Err(ConfigError::IdentifierColumnOutOfRange {
                    record_type: kind.record_type.clone(),
                    index: options.identifier_column,
                });
            }
        }
    }

    Ok(())
}
