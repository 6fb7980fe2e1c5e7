//! File Session and Sample Writer.
//!
//! Owns one open HDF5 file for the duration it is being filled: the file
//! handle, the `rf_data` dataset (fixed-size, fill value preset at creation
//! per spec.md §4.3), and the growable `rf_data_index` dataset. Replaces a
//! flat bag of HDF5 ids with a single owned struct (spec.md §9, "Handle bag
//! → typed session") so there is no way to leak or mismatch a handle across
//! the open/write/close lifecycle.
//!
//! `rf_data`'s element type is resolved at runtime (spec.md §4.6) from the
//! channel's [`crate::sample_format::SampleFormat`], so it cannot be named as
//! a Rust generic at the call site. This module bridges that gap the same
//! way the `lsl` HDF5 writer's `write_samples!($type, $variant)` macro and
//! zen-signal's `append_to_dataset<T: hdf5::H5Type, ...>` do: match on the
//! runtime format enum once, and dispatch each arm to a generic helper
//! monomorphized over the concrete native type (`i16`, `f64`,
//! `hdf5_types::Complex<i16>`, …). Every dataset operation below therefore
//! runs against the element's own HDF5 type, never an opaque byte buffer
//! wearing a borrowed datatype.

use std::path::Path;

use hdf5::{Dataset, File};
use ndarray::{Array1, Array2};

use crate::error::{DigitalRfError, Result};
use crate::gap_index::IndexRow;
use crate::metadata::{self, ChannelMetadata};
use crate::sample_format::hdf5_types::{Complex, NativeSample};
use crate::sample_format::{ElementType, SampleFormat};

/// Rank and element count of `rf_data`, computed once in
/// `WriterBuilder::build` (spec.md §4.3: "rank 2 if complex or subchannels >
/// 1; else 1").
#[derive(Debug, Clone, Copy)]
pub struct DataShape {
    pub samples_per_file: u64,
    pub subchannels: u32,
    pub rank2: bool,
}

impl DataShape {
    fn dims(&self) -> Vec<usize> {
        if self.rank2 {
            vec![self.samples_per_file as usize, self.subchannels as usize]
        } else {
            vec![self.samples_per_file as usize]
        }
    }

    fn chunk_dims(&self, chunk_rows: u64) -> Vec<usize> {
        if self.rank2 {
            vec![chunk_rows as usize, self.subchannels as usize]
        } else {
            vec![chunk_rows as usize]
        }
    }
}

/// One open file: the handle, its two datasets, and the bookkeeping spec.md
/// §3's `current_file` lists (sequence number, write cursor, remaining
/// capacity, next free gap-index row).
pub struct FileSession {
    file: File,
    data: Dataset,
    index: Dataset,
    shape: DataShape,
    sample_format: SampleFormat,
    pub sequence: u64,
    pub in_file_cursor: u64,
    pub next_index_row: u64,
}

impl FileSession {
    /// Create a new file with exclusive-create semantics, lay down `rf_data`
    /// at its full fixed capacity with the fill value preset, create the
    /// empty `rf_data_index`, and attach the file's metadata attributes
    /// (spec.md §4.3, §4.5).
    ///
    /// `chunk_rows` is `None` on the very first file of the channel's
    /// lifetime; the caller freezes whatever this returns and passes it back
    /// in for every subsequent file (spec.md §4.3: "computed once on the
    /// first write and then frozen").
    #[allow(clippy::too_many_arguments)]
    pub fn create(
        path: &Path,
        shape: DataShape,
        sample_format: SampleFormat,
        compression_level: u8,
        checksum: bool,
        chunk_rows: Option<u64>,
        first_append_length: u64,
        channel_meta: &ChannelMetadata,
        sequence: u64,
        computer_time: u64,
    ) -> Result<(Self, u64)> {
        // `File::create` truncates an existing file (H5F_ACC_TRUNC); a
        // crashed prior file at this path must never be silently reused
        // (spec.md §4.3/§5), so exclusive-create is the only correct open
        // mode here. A preceding `path.exists()` check would be racy.
        let file = File::create_excl(path).map_err(|e| DigitalRfError::DirectoryUnusable {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        let frozen_chunk_rows = chunk_rows
            .unwrap_or_else(|| first_append_length.min(shape.samples_per_file).max(1));
        let chunking_enabled = compression_level > 0 || checksum;
        let chunk_dims = if chunking_enabled {
            Some(shape.chunk_dims(frozen_chunk_rows))
        } else {
            None
        };

        let dims = shape.dims();
        let data = create_rf_data(
            &file,
            sample_format,
            &dims,
            chunk_dims.as_deref(),
            compression_level,
            checksum,
        )?;

        metadata::write_attributes(&data, channel_meta, sequence, computer_time)?;

        let index = file
            .new_dataset::<u64>()
            .chunk((100, 2))
            .shape((0.., 2))
            .create("rf_data_index")?;

        Ok((
            FileSession {
                file,
                data,
                index,
                shape,
                sample_format,
                sequence,
                in_file_cursor: 0,
                next_index_row: 0,
            },
            frozen_chunk_rows,
        ))
    }

    /// Remaining free rows in `rf_data` before this file is full.
    pub fn remaining(&self) -> u64 {
        self.shape.samples_per_file - self.in_file_cursor
    }

    /// Write `count` rows from `buffer` (already laid out with
    /// `element_bytes × (1 + complex) × subchannels` per row, per spec.md
    /// §4.3) at the current write cursor, then advance the cursor.
    pub fn write_rows(&mut self, buffer: &[u8], count: u64) -> Result<()> {
        if count == 0 {
            return Ok(());
        }
        let offset = self.in_file_cursor as usize;
        let end = offset + count as usize;
        let subchannels = self.shape.subchannels as usize;
        let rank2 = self.shape.rank2;
        let order = self.sample_format.element.declared_order();

        macro_rules! write_typed {
            ($t:ty) => {{
                let element_count = if rank2 {
                    count as usize * subchannels
                } else {
                    count as usize
                };
                let width = <$t as NativeSample>::WIDTH;
                let mut values: Vec<$t> = Vec::with_capacity(element_count);
                for i in 0..element_count {
                    let start = i * width;
                    values.push(<$t as NativeSample>::from_bytes(
                        &buffer[start..start + width],
                        order,
                    ));
                }
                if rank2 {
                    let array = Array2::from_shape_vec((count as usize, subchannels), values)
                        .expect("row count matches requested shape");
                    self.data.write_slice(&array, (offset..end, ..))?;
                } else {
                    let array = Array1::from_vec(values);
                    self.data.write_slice(&array, offset..end)?;
                }
            }};
        }

        match (self.sample_format.element, self.sample_format.complex) {
            (ElementType::Int8, false) => write_typed!(i8),
            (ElementType::Int8, true) => write_typed!(Complex<i8>),
            (ElementType::UInt8, false) => write_typed!(u8),
            (ElementType::UInt8, true) => write_typed!(Complex<u8>),
            (ElementType::Int16(_), false) => write_typed!(i16),
            (ElementType::Int16(_), true) => write_typed!(Complex<i16>),
            (ElementType::UInt16(_), false) => write_typed!(u16),
            (ElementType::UInt16(_), true) => write_typed!(Complex<u16>),
            (ElementType::Int32(_), false) => write_typed!(i32),
            (ElementType::Int32(_), true) => write_typed!(Complex<i32>),
            (ElementType::UInt32(_), false) => write_typed!(u32),
            (ElementType::UInt32(_), true) => write_typed!(Complex<u32>),
            (ElementType::Int64(_), false) => write_typed!(i64),
            (ElementType::Int64(_), true) => write_typed!(Complex<i64>),
            (ElementType::UInt64(_), false) => write_typed!(u64),
            (ElementType::UInt64(_), true) => write_typed!(Complex<u64>),
            (ElementType::Float32(_), false) => write_typed!(f32),
            (ElementType::Float32(_), true) => write_typed!(Complex<f32>),
            (ElementType::Float64(_), false) => write_typed!(f64),
            (ElementType::Float64(_), true) => write_typed!(Complex<f64>),
        }

        self.in_file_cursor += count;
        Ok(())
    }

    /// Append gap-index rows produced by [`crate::gap_index::build_slice_index`].
    pub fn append_index_rows(&mut self, rows: &[IndexRow]) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let start = self.next_index_row as usize;
        let end = start + rows.len();
        self.index.resize((end, 2))?;

        let mut flat = Vec::with_capacity(rows.len() * 2);
        for row in rows {
            flat.push(row.global);
            flat.push(row.in_file_row);
        }
        let array = Array2::from_shape_vec((rows.len(), 2), flat)
            .expect("row count matches requested shape");
        self.index.write_slice(&array, (start..end, ..))?;

        self.next_index_row = end as u64;
        Ok(())
    }

    /// Flush both datasets and the file handle (spec.md §4.3: "Closure
    /// flushes the datasets, file space, memory space, and file handle").
    pub fn close(self) -> Result<()> {
        self.data.file()?.flush()?;
        self.file.flush()?;
        Ok(())
    }
}

fn create_rf_data(
    file: &File,
    sample_format: SampleFormat,
    dims: &[usize],
    chunk_dims: Option<&[usize]>,
    compression_level: u8,
    checksum: bool,
) -> Result<Dataset> {
    macro_rules! build {
        ($t:ty) => {{
            let mut builder = file.new_dataset::<$t>();
            if let Some(chunk) = chunk_dims {
                builder = builder.chunk(chunk);
                if compression_level > 0 {
                    builder = builder.deflate(compression_level);
                }
                if checksum {
                    builder = builder.fletcher32();
                }
            }
            builder
                .fill_value(<$t as NativeSample>::fill_value())
                .shape(dims)
                .create("rf_data")?
        }};
    }

    let dataset = match (sample_format.element, sample_format.complex) {
        (ElementType::Int8, false) => build!(i8),
        (ElementType::Int8, true) => build!(Complex<i8>),
        (ElementType::UInt8, false) => build!(u8),
        (ElementType::UInt8, true) => build!(Complex<u8>),
        (ElementType::Int16(_), false) => build!(i16),
        (ElementType::Int16(_), true) => build!(Complex<i16>),
        (ElementType::UInt16(_), false) => build!(u16),
        (ElementType::UInt16(_), true) => build!(Complex<u16>),
        (ElementType::Int32(_), false) => build!(i32),
        (ElementType::Int32(_), true) => build!(Complex<i32>),
        (ElementType::UInt32(_), false) => build!(u32),
        (ElementType::UInt32(_), true) => build!(Complex<u32>),
        (ElementType::Int64(_), false) => build!(i64),
        (ElementType::Int64(_), true) => build!(Complex<i64>),
        (ElementType::UInt64(_), false) => build!(u64),
        (ElementType::UInt64(_), true) => build!(Complex<u64>),
        (ElementType::Float32(_), false) => build!(f32),
        (ElementType::Float32(_), true) => build!(Complex<f32>),
        (ElementType::Float64(_), false) => build!(f64),
        (ElementType::Float64(_), true) => build!(Complex<f64>),
    };
    Ok(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_meta() -> ChannelMetadata {
        ChannelMetadata {
            num_subchannels: 1,
            is_complex: false,
            samples_per_file: 40,
            sample_rate: 100.0,
            init_utc_timestamp: 1_700_000_000,
            uuid_str: "00000000-0000-0000-0000-000000000000".to_string(),
        }
    }

    #[test]
    fn create_refuses_existing_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rf@0.000.h5");
        std::fs::write(&path, b"not hdf5").unwrap();

        let format = SampleFormat::parse('<', 'i', 2, false).unwrap();
        let shape = DataShape {
            samples_per_file: 40,
            subchannels: 1,
            rank2: false,
        };

        let err = FileSession::create(
            &path,
            shape,
            format,
            0,
            false,
            None,
            40,
            &test_meta(),
            0,
            1_700_000_000,
        )
        .unwrap_err();
        assert!(matches!(err, DigitalRfError::DirectoryUnusable { .. }));
    }

    #[test]
    fn write_and_index_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rf@0.000.h5");

        let format = SampleFormat::parse('<', 'i', 2, false).unwrap();
        let shape = DataShape {
            samples_per_file: 40,
            subchannels: 1,
            rank2: false,
        };

        let (mut session, chunk_rows) = FileSession::create(
            &path,
            shape,
            format,
            0,
            false,
            None,
            40,
            &test_meta(),
            0,
            1_700_000_000,
        )
        .unwrap();
        assert_eq!(chunk_rows, 40);

        let buffer: Vec<u8> = (0..40i16).flat_map(|v| v.to_le_bytes()).collect();
        session.write_rows(&buffer, 40).unwrap();
        assert_eq!(session.in_file_cursor, 40);
        assert_eq!(session.remaining(), 0);

        session
            .append_index_rows(&[IndexRow {
                global: 1_700_000_000,
                in_file_row: 0,
            }])
            .unwrap();
        assert_eq!(session.next_index_row, 1);

        session.close().unwrap();
    }

    #[test]
    fn write_complex_int16_dataset_succeeds() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rf@0.000.h5");

        let format = SampleFormat::parse('<', 'i', 2, true).unwrap();
        let shape = DataShape {
            samples_per_file: 4,
            subchannels: 1,
            rank2: false,
        };

        let (mut session, _) = FileSession::create(
            &path, shape, format, 0, false, None, 4, &test_meta(), 0, 1_700_000_000,
        )
        .unwrap();

        let mut buffer = Vec::new();
        for sample in 0..4i16 {
            buffer.extend_from_slice(&sample.to_le_bytes());
            buffer.extend_from_slice(&(-sample).to_le_bytes());
        }
        session.write_rows(&buffer, 4).unwrap();
        assert_eq!(session.in_file_cursor, 4);

        session.close().unwrap();
    }

    #[test]
    fn float64_dataset_with_compression_creates_and_writes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rf@0.000.h5");

        let format = SampleFormat::parse('<', 'd', 8, false).unwrap();
        let shape = DataShape {
            samples_per_file: 4,
            subchannels: 1,
            rank2: false,
        };

        let (mut session, chunk_rows) = FileSession::create(
            &path, shape, format, 4, true, None, 4, &test_meta(), 0, 1_700_000_000,
        )
        .unwrap();
        assert_eq!(chunk_rows, 4);

        let buffer: Vec<u8> = (0..2f64).flat_map(|v| v.to_le_bytes()).collect();
        session.write_rows(&buffer, 2).unwrap();
        assert_eq!(session.remaining(), 2);

        session.close().unwrap();
    }
}
