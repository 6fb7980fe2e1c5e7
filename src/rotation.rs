//! Rotation Planner.
//!
//! Pure functions deciding the subdirectory and filename a new file should
//! be opened under, plus the cadence rule for when a new subdirectory is
//! needed. Carries no state itself — the [`crate::writer::Writer`] calls
//! these at the moment it is about to open a file.

use crate::time::global_sample_to_utc;

/// Subdirectory name for the file about to be opened at global sample `g`,
/// formatted `YYYY-MM-DDTHH:MM:SS` from integer calendar fields only (spec
/// §4.2, invariant 6: lexicographic order must equal chronological order).
pub fn subdir_name_for(global: u64, epoch_sample: u64, sample_rate: f64) -> String {
    let t = global_sample_to_utc(global + epoch_sample, sample_rate);
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}",
        t.year, t.month, t.day, t.hour, t.minute, t.second
    )
}

/// Filename for the file about to be opened at global sample `g`, formatted
/// `rf@<unix_seconds>.<millis>.h5` as a fixed-width 11.3 decimal so
/// lexicographic and chronological order coincide within a subdirectory
/// (spec §4.2, invariant 7).
pub fn file_basename_for(global: u64, epoch_sample: u64, sample_rate: f64) -> String {
    let t = global_sample_to_utc(global + epoch_sample, sample_rate);
    let unix_seconds = t.unix_seconds();
    let millis = t.millisecond();
    format!("rf@{unix_seconds:011}.{millis:03}.h5")
}

/// Whether opening the file at `sequence` (0-based, the sequence number the
/// about-to-be-opened file will carry) must first create a new
/// subdirectory: true exactly when `sequence` is divisible by
/// `files_per_subdir` (spec §4.2).
pub fn starts_new_subdir(sequence: u64, files_per_subdir: u64) -> bool {
    sequence % files_per_subdir == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_is_fixed_width() {
        let name = file_basename_for(0, 1_394_368_230 * 100 + 1, 100.0);
        // "rf@" + 11 digits + "." + 3 digits + ".h5"
        assert_eq!(name.len(), 3 + 11 + 1 + 3 + 3);
        assert!(name.starts_with("rf@1394368230."));
    }

    #[test]
    fn subdir_name_is_sortable_datetime() {
        let name = subdir_name_for(0, 1_394_368_230 * 100 + 1, 100.0);
        assert_eq!(name.len(), "YYYY-MM-DDTHH:MM:SS".len());
        assert!(name.starts_with("2014-"));
    }

    #[test]
    fn every_tenth_file_starts_a_subdir() {
        assert!(starts_new_subdir(0, 10));
        assert!(!starts_new_subdir(1, 10));
        assert!(starts_new_subdir(10, 10));
        assert!(starts_new_subdir(20, 10));
    }

    #[test]
    fn files_per_subdir_of_one_always_rotates() {
        for seq in 0..5 {
            assert!(starts_new_subdir(seq, 1));
        }
    }

    #[test]
    fn chronological_order_matches_lexical_order() {
        let earlier = file_basename_for(0, 0, 100.0);
        let later = file_basename_for(1_000_000, 0, 100.0);
        assert!(earlier < later);
    }
}
