//! Type & Fill Resolver.
//!
//! Maps the element description the caller supplies (byte order, numeric
//! kind, byte width, complex flag) to a concrete native Rust type used to
//! dispatch every HDF5 dataset operation, and a typed fill value for that
//! type, computed once at [`crate::writer::WriterBuilder::build`] time and
//! frozen for the channel's lifetime (invariant 2, spec §3).
//!
//! The byte-order/kind/width triple is modeled as a closed enum rather than
//! runtime char-code dispatch: unsupported combinations (e.g. a 3-byte
//! integer) are rejected once, at construction, instead of falling through a
//! `-1` sentinel deep in the write path (Design Note in spec.md §9,
//! "Variant types instead of runtime char-code dispatch").
//!
//! Unlike the original C source, this port never builds its own byte-array
//! HDF5 datatype: `rf_data`'s on-disk type is always the concrete Rust
//! type's own [`hdf5::types::H5Type`] mapping (`i16`, `f64`, …), exactly the
//! grounded corpus idiom (`new_dataset::<T>()` keyed by a runtime format
//! enum, as in the LSL HDF5 writer's `write_samples!($type, $variant)` macro
//! and zen-signal's `append_to_dataset<T: hdf5::H5Type, ...>`). The
//! requested byte order therefore governs how this crate *parses* the
//! caller's raw byte buffer into that native type (via
//! `NativeSample::from_bytes`), not a byte-swap baked into the on-disk
//! datatype — HDF5's own fixed-width integer/float datatypes are always
//! written and read back in the host's native order through this crate.

use crate::error::{DigitalRfError, Result};

/// Byte order the caller's raw buffer is encoded in for a multi-byte
/// element. `Native` defers to the host's byte order; it has no effect for
/// single-byte elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Little,
    Big,
    Native,
}

/// The scalar element type, independent of the complex-compound wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementType {
    Int8,
    UInt8,
    Int16(Endian),
    UInt16(Endian),
    Int32(Endian),
    UInt32(Endian),
    Int64(Endian),
    UInt64(Endian),
    Float32(Endian),
    Float64(Endian),
}

impl ElementType {
    /// Width in bytes of one scalar element.
    pub fn width_bytes(self) -> usize {
        match self {
            ElementType::Int8 | ElementType::UInt8 => 1,
            ElementType::Int16(_) | ElementType::UInt16(_) => 2,
            ElementType::Int32(_) | ElementType::UInt32(_) | ElementType::Float32(_) => 4,
            ElementType::Int64(_) | ElementType::UInt64(_) | ElementType::Float64(_) => 8,
        }
    }

    /// Byte order the caller's raw buffer encodes this element in.
    /// Single-byte elements carry no order; treated as `Native`.
    pub fn declared_order(self) -> Endian {
        match self {
            ElementType::Int8 | ElementType::UInt8 => Endian::Native,
            ElementType::Int16(o)
            | ElementType::UInt16(o)
            | ElementType::Int32(o)
            | ElementType::UInt32(o)
            | ElementType::Int64(o)
            | ElementType::UInt64(o)
            | ElementType::Float32(o)
            | ElementType::Float64(o) => o,
        }
    }
}

/// Full element description: scalar type plus the complex flag.
///
/// When `complex` is set, the on-disk type is a compound `{r, i}` of the
/// scalar element type (spec §3), realized as [`hdf5_types::Complex<T>`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleFormat {
    pub element: ElementType,
    pub complex: bool,
}

impl SampleFormat {
    /// Resolve a `(byteorder, kind, width_bytes)` triple, as accepted by the
    /// original byte-order/kind/width configuration surface, into a typed
    /// [`SampleFormat`]. `byteorder` is one of `'<'` (little), `'>'` (big),
    /// or `'='` (native); `kind` is one of `'i'`, `'u'`, `'f'`, `'d'`, `'b'`,
    /// `'B'`.
    pub fn parse(byteorder: char, kind: char, width_bytes: u8, complex: bool) -> Result<Self> {
        let order = match byteorder {
            '<' => Endian::Little,
            '>' => Endian::Big,
            '=' => Endian::Native,
            other => {
                return Err(DigitalRfError::TypeUnsupported {
                    message: format!("unrecognized byte order '{other}'"),
                })
            }
        };

        let element = match (kind, width_bytes) {
            ('b', 1) => ElementType::Int8,
            ('B', 1) => ElementType::UInt8,
            ('i', 1) => ElementType::Int8,
            ('u', 1) => ElementType::UInt8,
            ('i', 2) => ElementType::Int16(order),
            ('u', 2) => ElementType::UInt16(order),
            ('i', 4) => ElementType::Int32(order),
            ('u', 4) => ElementType::UInt32(order),
            ('i', 8) => ElementType::Int64(order),
            ('u', 8) => ElementType::UInt64(order),
            ('f', 4) => ElementType::Float32(order),
            ('d', 8) => ElementType::Float64(order),
            _ => {
                return Err(DigitalRfError::TypeUnsupported {
                    message: format!("unsupported kind '{kind}' with width {width_bytes}"),
                })
            }
        };

        Ok(SampleFormat { element, complex })
    }

    /// Width in bytes of one on-disk element: the scalar width, doubled when
    /// complex (the `{r, i}` compound has two scalar fields). Used to stride
    /// through the caller's raw buffer.
    pub fn element_width_bytes(&self) -> usize {
        self.element.width_bytes() * if self.complex { 2 } else { 1 }
    }
}

#[cfg(feature = "hdf5")]
pub(crate) mod hdf5_types {
    use super::Endian;
    use hdf5::types::{CompoundField, CompoundType, TypeDescriptor};
    use hdf5::types::H5Type;

    /// A concrete Rust type this crate can hand directly to
    /// `hdf5::File::new_dataset::<T>()`/`write_slice`: it already implements
    /// [`H5Type`], and knows its own fill value and how to parse itself out
    /// of a byte-order-tagged slice of the caller's raw buffer.
    pub trait NativeSample: H5Type + Copy {
        /// Width in bytes of one value of this type in the caller's buffer.
        const WIDTH: usize;

        /// Parse one value out of exactly `WIDTH` bytes, honoring `order`.
        fn from_bytes(bytes: &[u8], order: Endian) -> Self;

        /// The typed sentinel for unwritten rows (spec §4.6).
        fn fill_value() -> Self;
    }

    macro_rules! impl_native_sample_int {
        ($t:ty, $width:literal, $fill:expr) => {
            impl NativeSample for $t {
                const WIDTH: usize = $width;

                fn from_bytes(bytes: &[u8], order: Endian) -> Self {
                    let array: [u8; $width] =
                        bytes.try_into().expect("caller slices exactly WIDTH bytes");
                    match order {
                        Endian::Little => <$t>::from_le_bytes(array),
                        Endian::Big => <$t>::from_be_bytes(array),
                        Endian::Native => <$t>::from_ne_bytes(array),
                    }
                }

                fn fill_value() -> Self {
                    $fill
                }
            }
        };
    }

    impl NativeSample for i8 {
        const WIDTH: usize = 1;

        fn from_bytes(bytes: &[u8], _order: Endian) -> Self {
            bytes[0] as i8
        }

        fn fill_value() -> Self {
            i8::MIN
        }
    }

    impl NativeSample for u8 {
        const WIDTH: usize = 1;

        fn from_bytes(bytes: &[u8], _order: Endian) -> Self {
            bytes[0]
        }

        fn fill_value() -> Self {
            0
        }
    }

    impl_native_sample_int!(i16, 2, i16::MIN);
    impl_native_sample_int!(u16, 2, 0);
    impl_native_sample_int!(i32, 4, i32::MIN);
    impl_native_sample_int!(u32, 4, 0);
    impl_native_sample_int!(i64, 8, i64::MIN);
    impl_native_sample_int!(u64, 8, 0);
    impl_native_sample_int!(f32, 4, f32::NAN);
    impl_native_sample_int!(f64, 8, f64::NAN);

    /// The on-disk `{r, i}` compound pairing for a complex element, with
    /// both fields the same scalar [`NativeSample`] (spec §3/§4.6).
    #[repr(C)]
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct Complex<T> {
        pub r: T,
        pub i: T,
    }

    /// # Safety
    /// `Complex<T>` is `#[repr(C)]` with two consecutive fields of the same
    /// type and carries no padding for any `T` this crate instantiates it
    /// with (the ten scalar types above, all of uniform size/alignment), so
    /// the compound descriptor's byte offsets below match the real layout.
    unsafe impl<T: H5Type + Copy> H5Type for Complex<T> {
        fn type_descriptor() -> TypeDescriptor {
            let scalar = T::type_descriptor();
            let width = std::mem::size_of::<T>();
            TypeDescriptor::Compound(CompoundType {
                fields: vec![
                    CompoundField {
                        name: "r".to_string(),
                        ty: scalar.clone(),
                        offset: 0,
                        index: 0,
                    },
                    CompoundField {
                        name: "i".to_string(),
                        ty: scalar,
                        offset: width,
                        index: 1,
                    },
                ],
                size: width * 2,
            })
        }
    }

    impl<T: NativeSample> NativeSample for Complex<T> {
        const WIDTH: usize = 2 * T::WIDTH;

        fn from_bytes(bytes: &[u8], order: Endian) -> Self {
            let w = T::WIDTH;
            Complex {
                r: T::from_bytes(&bytes[0..w], order),
                i: T::from_bytes(&bytes[w..2 * w], order),
            }
        }

        fn fill_value() -> Self {
            let scalar = T::fill_value();
            Complex {
                r: scalar,
                i: scalar,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_complex_int16() {
        let format = SampleFormat::parse('<', 'i', 2, true).unwrap();
        assert_eq!(format.element, ElementType::Int16(Endian::Little));
        assert!(format.complex);
        assert_eq!(format.element_width_bytes(), 4);
    }

    #[test]
    fn rejects_unsupported_width() {
        let err = SampleFormat::parse('<', 'i', 3, false).unwrap_err();
        assert!(matches!(err, DigitalRfError::TypeUnsupported { .. }));
    }

    #[test]
    fn declared_order_is_native_for_single_byte_elements() {
        let format = SampleFormat::parse('>', 'u', 1, false).unwrap();
        assert_eq!(format.element.declared_order(), Endian::Native);
    }

    #[test]
    fn declared_order_matches_requested_multi_byte_order() {
        let format = SampleFormat::parse('>', 'i', 4, false).unwrap();
        assert_eq!(format.element.declared_order(), Endian::Big);
    }

    #[cfg(feature = "hdf5")]
    mod hdf5_native_sample {
        use super::super::hdf5_types::{Complex, NativeSample};
        use super::*;

        #[test]
        fn unsigned_fill_is_zero() {
            assert_eq!(u32::fill_value(), 0);
        }

        #[test]
        fn signed_int16_little_endian_round_trips() {
            let bytes = 1234i16.to_le_bytes();
            assert_eq!(i16::from_bytes(&bytes, Endian::Little), 1234);
        }

        #[test]
        fn signed_int16_big_endian_round_trips() {
            let bytes = 1234i16.to_be_bytes();
            assert_eq!(i16::from_bytes(&bytes, Endian::Big), 1234);
        }

        #[test]
        fn signed_fill_is_type_minimum() {
            assert_eq!(i16::fill_value(), i16::MIN);
            assert_eq!(i64::fill_value(), i64::MIN);
        }

        #[test]
        fn float64_fill_is_nan() {
            assert!(f64::fill_value().is_nan());
        }

        #[test]
        fn complex_fill_duplicates_scalar_fill() {
            let fill = Complex::<i16>::fill_value();
            assert_eq!(fill.r, i16::MIN);
            assert_eq!(fill.i, i16::MIN);
        }

        #[test]
        fn complex_from_bytes_reads_r_then_i() {
            let mut buf = Vec::new();
            buf.extend_from_slice(&10i16.to_le_bytes());
            buf.extend_from_slice(&20i16.to_le_bytes());
            let value = Complex::<i16>::from_bytes(&buf, Endian::Little);
            assert_eq!(value.r, 10);
            assert_eq!(value.i, 20);
        }

        #[test]
        fn complex_width_is_double_scalar_width() {
            assert_eq!(Complex::<i64>::WIDTH, 16);
            assert_eq!(Complex::<i8>::WIDTH, 2);
        }
    }
}
