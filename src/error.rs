//! Error types for the streaming writer.
//!
//! This module defines `DigitalRfError`, the single error type returned by
//! every fallible operation in this crate. Using the `thiserror` crate, each
//! variant carries the context a caller needs to understand what went wrong
//! without re-deriving it from a bare string — the offending value, the
//! expected value, or the path involved.
//!
//! ## Error Hierarchy
//!
//! - **`ConfigInvalid`**: an out-of-range or otherwise invalid constructor
//!   argument, raised eagerly by [`crate::writer::WriterBuilder::build`].
//! - **`DirectoryUnusable`**: the channel root is missing/not-a-directory, or
//!   the subdirectory for the next file already exists.
//! - **`WriteBeforeCursor`**: the caller presented a starting global sample
//!   behind `next_expected_global`.
//! - **`IndexMalformed`**: the `(global, in_buf)` pairing passed to
//!   `append_blocks` violates the ordering contract.
//! - **`TypeUnsupported`**: the requested element description has no mapping
//!   to an on-disk HDF5 datatype.
//! - **`Io`** / **`Hdf5`**: wrap the underlying I/O and HDF5 failures via
//!   `#[from]`, so `?` composes naturally through the write path.
//!
//! A failed `append_*` call leaves the `Writer` in a state where the only
//! legal subsequent operation is `close` (see crate-level docs).

use thiserror::Error;

/// Convenience alias for results using the crate error type.
pub type Result<T> = std::result::Result<T, DigitalRfError>;

#[derive(Error, Debug)]
pub enum DigitalRfError {
    #[error("invalid configuration for '{field}': {message}")]
    ConfigInvalid { field: &'static str, message: String },

    #[error("directory unusable at '{path}': {message}")]
    DirectoryUnusable { path: String, message: String },

    #[error(
        "write starts at global sample {attempted}, but the writer already expects {expected}"
    )]
    WriteBeforeCursor { expected: u64, attempted: u64 },

    #[error("malformed index pairing: {message}")]
    IndexMalformed { message: String },

    #[error("unsupported sample type: {message}")]
    TypeUnsupported { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "hdf5")]
    #[error("HDF5 error: {0}")]
    Hdf5(#[from] hdf5::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_before_cursor_carries_both_values() {
        let err = DigitalRfError::WriteBeforeCursor {
            expected: 1000,
            attempted: 500,
        };
        let message = err.to_string();
        assert!(message.contains("500"));
        assert!(message.contains("1000"));
    }

    #[test]
    fn config_invalid_names_the_field() {
        let err = DigitalRfError::ConfigInvalid {
            field: "samples_per_file",
            message: "must be > 0".to_string(),
        };
        assert!(err.to_string().contains("samples_per_file"));
    }
}
