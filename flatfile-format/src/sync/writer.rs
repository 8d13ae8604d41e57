use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::core::WriterCore;
use crate::error::FileResult;
use crate::layout::Layout;
use crate::metadata::MetadataProvider;
use crate::record::FileOperationResult;

use super::Observer;

/// Sync writer for flat files.
///
/// This is a frontend that wraps the sans-IO [`WriterCore`], writing the lines
/// it composes to any [`Write`]. Groups with errors are reported back and not
/// written. An I/O failure closes the writer: the sink may hold part of a
/// group, and every later call returns [`FileError::InvalidState`](crate::FileError::InvalidState).
pub struct FileWriter<W: Write, P: MetadataProvider> {
    core: WriterCore<P>,
    sink: W,
    path: Option<PathBuf>,
    line_terminator: String,
    observer: Option<Observer<P::Value>>,
}

impl<W: Write, P: MetadataProvider> Drop for FileWriter<W, P> {
    fn drop(&mut self) {
        if !self.core.is_closed() {
            tracing::warn!(
                path = ?self.path,
                "FileWriter dropped without calling end_of_file(). Output may be incomplete."
            );
        }
    }
}

impl<W: Write, P: MetadataProvider> std::fmt::Debug for FileWriter<W, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileWriter")
            .field("path", &self.path)
            .field("total_lines", &self.core.total_lines())
            .field("closed", &self.core.is_closed())
            .finish_non_exhaustive()
    }
}

impl<P: MetadataProvider> FileWriter<BufWriter<File>, P> {
    /// Creates a file for writing, truncating it if it exists.
    pub fn create<Q: AsRef<Path>>(
        path: Q,
        layout: Arc<Layout<P>>,
    ) -> FileResult<FileWriter<BufWriter<File>, P>> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)?;
        tracing::debug!(path = %path.display(), "created file for writing");

        let mut writer = FileWriter::new(BufWriter::new(file), layout)?;
        writer.path = Some(path);
        Ok(writer)
    }
}

impl<W: Write, P: MetadataProvider> FileWriter<W, P> {
    pub fn new(sink: W, layout: Arc<Layout<P>>) -> FileResult<FileWriter<W, P>> {
        Ok(FileWriter {
            core: WriterCore::new(layout)?,
            sink,
            path: None,
            line_terminator: "\n".to_string(),
            observer: None,
        })
    }

    /// Written after every line. Defaults to `\n`.
    pub fn with_line_terminator<S: Into<String>>(mut self, terminator: S) -> Self {
        self.line_terminator = terminator.into();
        self
    }

    /// Calls `observer` with every result, rejected groups included.
    pub fn with_observer<F>(mut self, observer: F) -> Self
    where
        F: FnMut(&FileOperationResult<P::Value>) + Send + 'static,
    {
        self.observer = Some(Box::new(observer));
        self
    }

    #[inline(always)]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    #[inline(always)]
    pub fn layout(&self) -> &Arc<Layout<P>> {
        self.core.layout()
    }

    #[inline(always)]
    pub fn total_lines(&self) -> usize {
        self.core.total_lines()
    }

    #[inline(always)]
    pub fn get_ref(&self) -> &W {
        &self.sink
    }

    pub fn write_header(&mut self, value: &P::Value) -> FileResult<FileOperationResult<P::Value>> {
        let result = self.core.header(value)?;
        self.emit(result)
    }

    /// Writes one content record and all of its descendants.
    pub fn write(&mut self, value: &P::Value) -> FileResult<FileOperationResult<P::Value>> {
        let result = self.core.content(value)?;
        self.emit(result)
    }

    pub fn write_trailer(&mut self, value: &P::Value) -> FileResult<FileOperationResult<P::Value>> {
        let result = self.core.trailer(value)?;
        self.emit(result)
    }

    /// Checks the whole-file rules and flushes the sink. Nothing may be written afterwards.
    pub fn end_of_file(&mut self) -> FileResult<FileOperationResult<P::Value>> {
        let result = self.core.finish();
        if let Err(e) = self.sink.flush() {
            self.core.abandon();
            return Err(e.into());
        }
        let result = result?;

        if let Some(observer) = self.observer.as_mut() {
            observer(&result);
        }
        Ok(result)
    }

    fn emit(
        &mut self,
        result: FileOperationResult<P::Value>,
    ) -> FileResult<FileOperationResult<P::Value>> {
        if result.value.is_some() {
            if let Err(e) = self.write_lines(&result) {
                self.core.abandon();
                return Err(e.into());
            }
        }

        if let Some(observer) = self.observer.as_mut() {
            observer(&result);
        }
        Ok(result)
    }

    fn write_lines(&mut self, result: &FileOperationResult<P::Value>) -> std::io::Result<()> {
        for record in &result.records {
            self.sink.write_all(record.raw_line.as_bytes())?;
            self.sink.write_all(self.line_terminator.as_bytes())?;
        }
        Ok(())
    }
}
