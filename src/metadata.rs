//! Metadata Emitter.
//!
//! Attaches the fixed attribute set spec.md §4.5 requires to `rf_data` on
//! every file creation. The scalar attributes follow the teacher's
//! `initialize_hdf5` pattern in `comedi_writer.rs` (`new_attr::<T>().create(name)?.write_scalar(&val)?`);
//! string attributes use `VarLenUnicode`, exactly as `comedi_writer.rs` and
//! `hdf5_annotation.rs` do it.

/// Epoch string constant from spec.md §6, attached verbatim as the `epoch`
/// attribute on every file.
pub const DIGITAL_RF_EPOCH: &str = "1970-01-01T00:00:00Z";

/// Crate-level format version string from spec.md §6, attached as the
/// `digital_rf_version` attribute.
pub const DIGITAL_RF_VERSION: &str = "1.0";

/// Explanatory text for the `digital_rf_time_description` attribute,
/// carried verbatim from the original system (spec.md §9 "Constant text").
pub const DIGITAL_RF_TIME_DESCRIPTION: &str =
    "All times are in seconds since the Digital RF epoch, 1970-01-01T00:00:00Z.";

/// The per-channel values that are identical across every file (spec.md
/// §4.5): computed once in [`crate::writer::WriterBuilder::build`] and
/// threaded into every [`crate::file_session::FileSession`].
#[derive(Debug, Clone)]
pub struct ChannelMetadata {
    pub num_subchannels: u32,
    pub is_complex: bool,
    pub samples_per_file: u64,
    pub sample_rate: f64,
    pub init_utc_timestamp: u64,
    pub uuid_str: String,
}

#[cfg(feature = "hdf5")]
pub(crate) fn write_attributes(
    dataset: &hdf5::Dataset,
    channel: &ChannelMetadata,
    sequence_num: u64,
    computer_time: u64,
) -> crate::error::Result<()> {
    use hdf5::types::VarLenUnicode;

    dataset
        .new_attr::<u64>()
        .create("sequence_num")?
        .write_scalar(&sequence_num)?;
    dataset
        .new_attr::<u32>()
        .create("num_subchannels")?
        .write_scalar(&channel.num_subchannels)?;
    dataset
        .new_attr::<u32>()
        .create("is_complex")?
        .write_scalar(&(channel.is_complex as u32))?;
    dataset
        .new_attr::<u64>()
        .create("samples_per_file")?
        .write_scalar(&channel.samples_per_file)?;
    dataset
        .new_attr::<f64>()
        .create("sample_rate")?
        .write_scalar(&channel.sample_rate)?;
    dataset
        .new_attr::<u64>()
        .create("init_utc_timestamp")?
        .write_scalar(&channel.init_utc_timestamp)?;
    dataset
        .new_attr::<u64>()
        .create("computer_time")?
        .write_scalar(&computer_time)?;
    dataset
        .new_attr::<VarLenUnicode>()
        .create("uuid_str")?
        .write_scalar(
            &channel
                .uuid_str
                .parse::<VarLenUnicode>()
                .expect("uuid string is ASCII"),
        )?;
    dataset
        .new_attr::<VarLenUnicode>()
        .create("epoch")?
        .write_scalar(
            &DIGITAL_RF_EPOCH
                .parse::<VarLenUnicode>()
                .expect("constant is ASCII"),
        )?;
    dataset
        .new_attr::<VarLenUnicode>()
        .create("digital_rf_time_description")?
        .write_scalar(
            &DIGITAL_RF_TIME_DESCRIPTION
                .parse::<VarLenUnicode>()
                .expect("constant is ASCII"),
        )?;
    dataset
        .new_attr::<VarLenUnicode>()
        .create("digital_rf_version")?
        .write_scalar(
            &DIGITAL_RF_VERSION
                .parse::<VarLenUnicode>()
                .expect("constant is ASCII"),
        )?;
    Ok(())
}
