//! Conversion from a global sample index to a UTC calendar timestamp.
//!
//! Shared by the Rotation Planner (subdirectory/filename stamping) and
//! exposed publicly because spec'd readers rely on the same conversion to
//! interpret subdirectory and file names.
//!
//! The conversion branches on whether `sample_rate` is integral (spec §4.2,
//! §4.7, and the Design Note in §9): an integral rate lets the fractional
//! part of a second be computed with pure integer arithmetic (`g mod rate`),
//! avoiding the rounding a floating-point division would otherwise
//! introduce. Irrational or merely non-integral rates fall back to floating
//! point.

use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc};

/// A UTC calendar timestamp broken down to picosecond resolution, as used to
/// stamp subdirectories and filenames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarTime {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
    pub picosecond: u64,
}

impl CalendarTime {
    /// Whole seconds since the Unix epoch (truncating the sub-second part).
    pub fn unix_seconds(&self) -> i64 {
        Utc.with_ymd_and_hms(self.year, self.month, self.day, self.hour, self.minute, self.second)
            .single()
            .map(|dt| dt.timestamp())
            .unwrap_or(0)
    }

    /// Milliseconds portion of the sub-second remainder, rounded down.
    pub fn millisecond(&self) -> u32 {
        (self.picosecond / 1_000_000_000) as u32
    }
}

/// Convert an absolute global sample index (i.e. with `epoch_sample` already
/// added) and a sample rate in hertz to a UTC calendar breakdown.
///
/// `sample_rate` must be positive; this is enforced at
/// [`crate::writer::WriterBuilder::build`] time, not re-checked here.
pub fn global_sample_to_utc(sample: u64, sample_rate: f64) -> CalendarTime {
    let (whole_seconds, fractional) = if is_integral(sample_rate) {
        let rate = sample_rate as u64;
        let whole = sample / rate;
        let remainder = sample - whole * rate;
        (whole, remainder as f64 / sample_rate)
    } else {
        let whole = (sample as f64 / sample_rate).floor();
        let fractional = sample as f64 / sample_rate - whole;
        (whole as u64, fractional)
    };

    let picosecond = (fractional * 1e12).round() as u64;
    let (whole_seconds, picosecond) = carry_full_second(whole_seconds, picosecond);

    let datetime: DateTime<Utc> = DateTime::from_timestamp(whole_seconds as i64, 0)
        .unwrap_or_else(|| DateTime::from_timestamp(0, 0).expect("epoch is representable"));

    CalendarTime {
        year: datetime.year(),
        month: datetime.month(),
        day: datetime.day(),
        hour: datetime.hour(),
        minute: datetime.minute(),
        second: datetime.second(),
        picosecond,
    }
}

fn is_integral(rate: f64) -> bool {
    rate.fract() == 0.0
}

/// A rounding step in [`global_sample_to_utc`] can land the sub-second
/// remainder exactly on (or past) one full second of picoseconds; that
/// belongs to the next second, not a 1e12-picosecond remainder of this one.
fn carry_full_second(whole_seconds: u64, picosecond: u64) -> (u64, u64) {
    if picosecond >= 1_000_000_000_000 {
        (whole_seconds + 1, picosecond - 1_000_000_000_000)
    } else {
        (whole_seconds, picosecond)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integral_rate_zero_sample_is_epoch() {
        let time = global_sample_to_utc(0, 100.0);
        assert_eq!(time.year, 1970);
        assert_eq!(time.month, 1);
        assert_eq!(time.day, 1);
        assert_eq!(time.picosecond, 0);
    }

    #[test]
    fn integral_rate_fraction_matches_exact_division() {
        // 50 samples at 100 Hz is exactly half a second.
        let time = global_sample_to_utc(50, 100.0);
        assert_eq!(time.second, 0);
        assert_eq!(time.picosecond, 500_000_000_000);
    }

    #[test]
    fn non_integral_rate_rounds_consistently() {
        let rate = 100.0 / 3.0;
        let time = global_sample_to_utc(1, rate);
        // one sample at ~33.33 Hz is ~0.03s in.
        assert_eq!(time.second, 0);
        assert!(time.picosecond > 0);
    }

    #[test]
    fn integral_rate_at_exact_second_boundary_has_zero_picosecond() {
        // 100 samples at 100 Hz is exactly 1.0s; the integral branch hits
        // this with no fractional remainder at all, so it never touches the
        // rounding-carry path below.
        let time = global_sample_to_utc(100, 100.0);
        assert_eq!(time.second, 1);
        assert_eq!(time.picosecond, 0);
    }

    #[test]
    fn carry_rolls_a_full_second_of_picoseconds_into_the_next_second() {
        let (seconds, picosecond) = carry_full_second(5, 1_000_000_000_000);
        assert_eq!(seconds, 6);
        assert_eq!(picosecond, 0);
    }

    #[test]
    fn carry_is_a_no_op_below_one_full_second() {
        let (seconds, picosecond) = carry_full_second(5, 999_999_999_999);
        assert_eq!(seconds, 5);
        assert_eq!(picosecond, 999_999_999_999);
    }

    #[test]
    fn matches_known_epoch_value() {
        // The S1 test scenario's epoch: 1394368230 unix seconds at 100 Hz, plus 1.
        let epoch_sample = 1_394_368_230u64 * 100 + 1;
        let time = global_sample_to_utc(epoch_sample, 100.0);
        assert_eq!(time.year, 2014);
    }
}
