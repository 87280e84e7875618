//! FORTRAN unformatted sequential records.
//!
//! Every record is framed as `i32 length`, `length` payload bytes, `i32 length`.
//! All values are little-endian. Payloads are read back through
//! [`RecordBuffer`], a flat sequential cursor with no alignment padding.

use crate::domain::{PtracError, PtracResult};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, Read};

/// Up-front allocation limit for a single read; larger payloads grow as
/// bytes actually arrive.
const MAX_PREALLOCATION: usize = 1 << 20;

/// Width of the floating-point slots on data lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ValueWidth {
    #[default]
    #[serde(rename = "f64")]
    F64,
    #[serde(rename = "f32")]
    F32,
}

/// Width of the integer counts in the header and on NPS lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CountWidth {
    #[default]
    #[serde(rename = "i64")]
    I64,
    #[serde(rename = "i32")]
    I32,
}

pub trait FixedWidth: Sized + Copy {
    const WIDTH: usize;

    /// `bytes` is exactly `WIDTH` long.
    fn from_le_slice(bytes: &[u8]) -> Self;
}

macro_rules! impl_fixed_width {
    ($($ty:ty),*) => {
        $(
            impl FixedWidth for $ty {
                const WIDTH: usize = std::mem::size_of::<$ty>();

                fn from_le_slice(bytes: &[u8]) -> Self {
                    let mut raw = [0_u8; std::mem::size_of::<$ty>()];
                    raw.copy_from_slice(bytes);
                    <$ty>::from_le_bytes(raw)
                }
            }
        )*
    };
}

impl_fixed_width!(i32, i64, u32, u64, f32, f64);

/// Reads `len` bytes, failing with `StreamCorruption` on a short read.
fn read_exact_bytes<R: Read>(reader: &mut R, len: usize) -> PtracResult<Vec<u8>> {
    let mut bytes = Vec::with_capacity(len.min(MAX_PREALLOCATION));
    reader.by_ref().take(len as u64).read_to_end(&mut bytes)?;
    if bytes.len() < len {
        return Err(PtracError::StreamCorruption {
            requested: len,
            available: bytes.len(),
        });
    }
    Ok(bytes)
}

pub fn read_fixed<T: FixedWidth, R: Read>(reader: &mut R) -> PtracResult<T> {
    let bytes = read_exact_bytes(reader, T::WIDTH)?;
    Ok(T::from_le_slice(&bytes))
}

/// True when no byte is left before the next record boundary.
pub fn at_end_of_stream<R: BufRead>(reader: &mut R) -> PtracResult<bool> {
    Ok(reader.fill_buf()?.is_empty())
}

pub fn read_record<R: Read>(reader: &mut R) -> PtracResult<RecordBuffer> {
    let leading = read_fixed::<i32, _>(reader)?;
    let Ok(length) = usize::try_from(leading) else {
        // A negative marker cannot frame anything; the stream is misaligned.
        return Err(PtracError::StreamCorruption {
            requested: leading.unsigned_abs() as usize,
            available: 0,
        });
    };
    let payload = read_exact_bytes(reader, length)?;
    let trailing = read_fixed::<i32, _>(reader)?;
    if leading != trailing {
        return Err(PtracError::RecordLengthMismatch { leading, trailing });
    }
    Ok(RecordBuffer::new(payload))
}

/// Payload of one record plus a read position.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RecordBuffer {
    bytes: Vec<u8>,
    offset: usize,
}

impl RecordBuffer {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes, offset: 0 }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn position(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.offset
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }

    fn take_bytes(&mut self, len: usize) -> PtracResult<&[u8]> {
        if self.remaining() < len {
            return Err(PtracError::StreamCorruption {
                requested: len,
                available: self.remaining(),
            });
        }
        let start = self.offset;
        self.offset += len;
        Ok(&self.bytes[start..self.offset])
    }

    pub fn skip(&mut self, len: usize) -> PtracResult<()> {
        self.take_bytes(len).map(|_| ())
    }

    pub fn take<T: FixedWidth>(&mut self) -> PtracResult<T> {
        self.take_bytes(T::WIDTH).map(T::from_le_slice)
    }

    pub fn read_f64(&mut self) -> PtracResult<f64> {
        self.take::<f64>()
    }

    pub fn read_f32(&mut self) -> PtracResult<f32> {
        self.take::<f32>()
    }

    pub fn read_i32(&mut self) -> PtracResult<i32> {
        self.take::<i32>()
    }

    pub fn read_i64(&mut self) -> PtracResult<i64> {
        self.take::<i64>()
    }

    /// One data-line slot, widened to `f64`.
    pub fn read_value(&mut self, width: ValueWidth) -> PtracResult<f64> {
        match width {
            ValueWidth::F64 => self.read_f64(),
            ValueWidth::F32 => self.read_f32().map(f64::from),
        }
    }

    pub fn read_count(&mut self, width: CountWidth) -> PtracResult<i64> {
        match width {
            CountWidth::I64 => self.read_i64(),
            CountWidth::I32 => self.read_i32().map(i64::from),
        }
    }

    pub fn decode_tuple<T: DecodeTuple>(&mut self) -> PtracResult<T> {
        T::decode(self)
    }
}

/// Tuples of fixed-width values read back to back from a [`RecordBuffer`].
pub trait DecodeTuple: Sized {
    fn decode(buffer: &mut RecordBuffer) -> PtracResult<Self>;
}

macro_rules! impl_decode_tuple {
    ($($name:ident),+) => {
        impl<$($name: FixedWidth),+> DecodeTuple for ($($name,)+) {
            fn decode(buffer: &mut RecordBuffer) -> PtracResult<Self> {
                Ok(($(buffer.take::<$name>()?,)+))
            }
        }
    };
}

impl_decode_tuple!(A);
impl_decode_tuple!(A, B);
impl_decode_tuple!(A, B, C);
impl_decode_tuple!(A, B, C, D);

pub fn decode_tuple<T: DecodeTuple>(bytes: &[u8]) -> PtracResult<T> {
    RecordBuffer::new(bytes.to_vec()).decode_tuple()
}

#[cfg(test)]
mod tests {
    use super::{
        CountWidth, RecordBuffer, ValueWidth, at_end_of_stream, decode_tuple, read_fixed,
        read_record,
    };
    use crate::domain::PtracErrorKind;
    use std::io::Cursor;

    fn frame(payload: &[u8]) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&(payload.len() as i32).to_le_bytes());
        bytes.extend_from_slice(payload);
        bytes.extend_from_slice(&(payload.len() as i32).to_le_bytes());
        bytes
    }

    #[test]
    fn read_fixed_reports_short_reads_as_corruption() {
        let mut stream = Cursor::new(vec![1_u8, 0, 0]);
        let error = read_fixed::<i32, _>(&mut stream).expect_err("three bytes cannot hold an i32");
        assert_eq!(error.kind(), PtracErrorKind::StreamCorruption);
        assert_eq!(
            error.to_string(),
            "stream corruption: requested 4 bytes but only 3 available"
        );
    }

    #[test]
    fn oversized_length_marker_fails_without_reserving_the_claimed_size() {
        let mut bytes = i32::MAX.to_le_bytes().to_vec();
        bytes.extend_from_slice(&[0_u8; 8]);
        let mut stream = Cursor::new(bytes);

        let error = read_record(&mut stream).expect_err("payload is far shorter than claimed");
        assert_eq!(error.kind(), PtracErrorKind::StreamCorruption);
        assert_eq!(
            error.to_string(),
            format!(
                "stream corruption: requested {} bytes but only 8 available",
                i32::MAX
            )
        );
    }

    #[test]
    fn read_record_returns_payload_between_matching_markers() {
        let mut payload = Vec::new();
        payload.extend_from_slice(&42_i64.to_le_bytes());
        payload.extend_from_slice(&2030_i64.to_le_bytes());
        let mut stream = Cursor::new(frame(&payload));

        let mut record = read_record(&mut stream).expect("well-framed record should read");
        assert_eq!(record.len(), 16);
        let (nps, code) = record
            .decode_tuple::<(i64, i64)>()
            .expect("two i64 fit the payload");
        assert_eq!((nps, code), (42, 2030));
        assert!(record.is_exhausted());
        assert!(at_end_of_stream(&mut stream).expect("cursor never fails"));
    }

    #[test]
    fn mismatched_markers_are_rejected() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&8_i32.to_le_bytes());
        bytes.extend_from_slice(&1.0_f64.to_le_bytes());
        bytes.extend_from_slice(&4_i32.to_le_bytes());

        let error = read_record(&mut Cursor::new(bytes)).expect_err("markers differ");
        assert_eq!(error.kind(), PtracErrorKind::RecordLengthMismatch);
    }

    #[test]
    fn truncated_payload_is_corruption_not_truncation() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&16_i32.to_le_bytes());
        bytes.extend_from_slice(&1.0_f64.to_le_bytes());

        let error = read_record(&mut Cursor::new(bytes)).expect_err("payload is short");
        assert_eq!(error.kind(), PtracErrorKind::StreamCorruption);
    }

    #[test]
    fn negative_length_marker_is_corruption() {
        let bytes = (-8_i32).to_le_bytes().to_vec();
        let error = read_record(&mut Cursor::new(bytes)).expect_err("negative marker");
        assert_eq!(error.kind(), PtracErrorKind::StreamCorruption);
    }

    #[test]
    fn decode_tuple_is_a_flat_cursor_without_padding() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&7_i32.to_le_bytes());
        bytes.extend_from_slice(&(-3_i64).to_le_bytes());
        bytes.extend_from_slice(&0.5_f32.to_le_bytes());

        let (a, b, c) = decode_tuple::<(i32, i64, f32)>(&bytes).expect("16 bytes are enough");
        assert_eq!((a, b, c), (7, -3, 0.5));

        let error = decode_tuple::<(i32, i64, f64)>(&bytes).expect_err("f64 overruns the buffer");
        assert_eq!(error.kind(), PtracErrorKind::StreamCorruption);
    }

    #[test]
    fn value_and_count_widths_widen_to_64_bits() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&1.25_f32.to_le_bytes());
        bytes.extend_from_slice(&9000_i32.to_le_bytes());
        bytes.extend_from_slice(&2.5_f64.to_le_bytes());
        let mut record = RecordBuffer::new(bytes);

        assert_eq!(record.read_value(ValueWidth::F32).expect("f32 slot"), 1.25);
        assert_eq!(record.read_count(CountWidth::I32).expect("i32 count"), 9000);
        assert_eq!(record.read_value(ValueWidth::F64).expect("f64 slot"), 2.5);
        assert_eq!(record.remaining(), 0);
    }
}
