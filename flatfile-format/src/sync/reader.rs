use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::core::ReaderCore;
use crate::error::FileResult;
use crate::layout::Layout;
use crate::metadata::MetadataProvider;
use crate::record::FileOperationResult;

use super::Observer;

/// Sync reader for flat files.
///
/// This is a frontend that wraps the sans-IO [`ReaderCore`], feeding it lines
/// from any [`BufRead`]. It is also an iterator over the groups of the file,
/// stopping before the end-of-file result.
pub struct FileReader<R: BufRead, P: MetadataProvider> {
    core: ReaderCore<P>,
    lines: Lines<R>,
    path: Option<PathBuf>,
    stop_on_error: bool,
    stopped: bool,
    observer: Option<Observer<P::Value>>,
}

impl<R: BufRead, P: MetadataProvider> std::fmt::Debug for FileReader<R, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileReader")
            .field("path", &self.path)
            .field("state", &self.core.state())
            .field("total_lines", &self.core.total_lines())
            .field("stop_on_error", &self.stop_on_error)
            .finish_non_exhaustive()
    }
}

impl<P: MetadataProvider> FileReader<BufReader<File>, P> {
    /// Opens an existing file for reading.
    pub fn open<Q: AsRef<Path>>(
        path: Q,
        layout: Arc<Layout<P>>,
    ) -> FileResult<FileReader<BufReader<File>, P>> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        tracing::debug!(path = %path.display(), "opened file for reading");

        let mut reader = FileReader::new(BufReader::new(file), layout)?;
        reader.path = Some(path);
        Ok(reader)
    }
}

impl<R: BufRead, P: MetadataProvider> FileReader<R, P> {
    pub fn new(reader: R, layout: Arc<Layout<P>>) -> FileResult<FileReader<R, P>> {
        Ok(FileReader {
            core: ReaderCore::new(layout)?,
            lines: reader.lines(),
            path: None,
            stop_on_error: false,
            stopped: false,
            observer: None,
        })
    }

    /// When set, iteration ends after the first group that has errors.
    pub fn stop_on_error(mut self, stop: bool) -> Self {
        self.stop_on_error = stop;
        self
    }

    /// Calls `observer` with every result read, the end-of-file result included.
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
    pub fn is_end_of_file(&self) -> bool {
        self.core.is_end_of_file()
    }

    pub fn read_next_group(&mut self) -> FileResult<FileOperationResult<P::Value>> {
        let result = self.core.read_next_group(&mut self.lines)?;

        if let Some(observer) = self.observer.as_mut() {
            observer(&result);
        }

        Ok(result)
    }

    /// Reads every remaining group, regardless of errors, and returns how many
    /// there were.
    pub fn read_to_end(&mut self) -> FileResult<usize> {
        let mut count = 0;
        loop {
            if self.read_next_group()?.is_end_of_file() {
                return Ok(count);
            }
            count += 1;
        }
    }
}

impl<R: BufRead, P: MetadataProvider> Iterator for FileReader<R, P> {
    type Item = FileResult<FileOperationResult<P::Value>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.stopped || self.core.is_end_of_file() {
            return None;
        }

        match self.read_next_group() {
            Ok(result) if result.is_end_of_file() => None,
            Ok(result) => {
                if self.stop_on_error && result.has_errors() {
                    self.stopped = true;
                }
                Some(Ok(result))
            }
            Err(e) => {
                self.stopped = true;
                Some(Err(e))
            }
        }
    }
}
