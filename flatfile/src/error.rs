use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Cannot load layout `{}`", .path.display())]
    LoadLayout {
        path: PathBuf,
        #[source]
        source: flatfile_format::ConfigError,
    },

    #[error("Cannot open file `{}`", .path.display())]
    OpenFile {
        path: PathBuf,
        #[source]
        source: flatfile_format::FileError,
    },

    #[error("Cannot read file `{}`", .path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: flatfile_format::FileError,
    },

    #[error("Cannot write output")]
    WriteOutput(#[from] std::io::Error),

    #[error("Cannot serialize record group")]
    Serialize(#[from] serde_json::Error),
}
