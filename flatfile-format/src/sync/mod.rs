//! Sync (std) frontends for reading and writing flat files.

use crate::record::FileOperationResult;

#[cfg(feature = "reader")]
mod reader;
#[cfg(feature = "writer")]
mod writer;

#[cfg(feature = "reader")]
pub use reader::FileReader;
#[cfg(feature = "writer")]
pub use writer::FileWriter;

/// Called with every result a frontend produces, after it has been produced.
pub type Observer<V> = Box<dyn FnMut(&FileOperationResult<V>) + Send>;
