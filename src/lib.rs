//! Streaming writer for gappy RF sample streams, archived as a directory
//! tree of fixed-capacity HDF5 files.
//!
//! A [`writer::Writer`] is created once per channel via [`writer::WriterBuilder`],
//! fed zero or more [`writer::Writer::append_continuous`] /
//! [`writer::Writer::append_blocks`] calls, and released with
//! [`writer::Writer::close`]. It is single-threaded and synchronous: every
//! call blocks until the write is durable to HDF5's own buffers, and a
//! channel is owned by exactly one writing agent for its lifetime.
//!
//! ```text
//! <channel_root>/
//!   <YYYY-MM-DDTHH:MM:SS>/
//!     rf@<unix_seconds>.<millis>.h5
//!     rf@<unix_seconds>.<millis>.h5
//!     ...
//! ```
//!
//! The reader side, the metadata sidecar, and the GNU Radio sink that feeds
//! this writer are separate collaborators and out of scope for this crate.

pub mod error;
pub mod gap_index;
pub mod metadata;
pub mod observability;
pub mod rotation;
pub mod sample_format;
pub mod time;
pub mod writer;

#[cfg(feature = "hdf5")]
pub mod file_session;

pub use error::{DigitalRfError, Result};
pub use metadata::{DIGITAL_RF_EPOCH, DIGITAL_RF_TIME_DESCRIPTION, DIGITAL_RF_VERSION};
pub use sample_format::{ElementType, Endian, SampleFormat};
pub use writer::{ChannelCheckpoint, Writer, WriterBuilder};
