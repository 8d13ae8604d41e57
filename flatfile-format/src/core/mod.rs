//! Sans-IO core state machines for flat file reading and writing.
//!
//! Neither state machine opens, reads or writes anything. The reader is handed
//! an iterator of decoded lines and the writer hands back composed lines, so
//! the same cores serve any frontend.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Frontends                              │
//! │  - FileReader (std, BufRead)            │
//! │  - FileWriter (std, Write)              │
//! ├─────────────────────────────────────────┤
//! │  Sans-IO Core (this module)             │
//! │  - ReaderCore                           │
//! │  - WriterCore                           │
//! │  - HierarchyLinker (per group)          │
//! └─────────────────────────────────────────┘
//! ```

#[cfg(feature = "reader")]
mod linker;
#[cfg(feature = "reader")]
mod reader;
#[cfg(feature = "writer")]
mod writer;

#[cfg(feature = "reader")]
pub use reader::{ReaderCore, ReaderState};
#[cfg(feature = "writer")]
pub use writer::WriterCore;
