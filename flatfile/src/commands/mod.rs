pub mod dump;
pub mod info;
pub mod validate;

pub use dump::run as dump;
pub use info::run as info;
pub use validate::run as validate;

use std::path::Path;
use std::sync::Arc;

use flatfile_format::{Layout, LayoutFile, Schema};

use crate::error::{Error, Result};

pub(crate) fn load_layout(path: &Path) -> Result<Arc<Layout<Schema>>> {
    let layout = LayoutFile::from_path(path)
        .and_then(LayoutFile::into_layout)
        .map_err(|source| Error::LoadLayout {
            path: path.to_path_buf(),
            source,
        })?;

    tracing::debug!(path = %path.display(), "loaded layout");
    Ok(Arc::new(layout))
}
