//! Routing matrices.
//!
//! A mix matrix maps `in` input channels onto `out` output channels. The
//! engine exchanges it as a flat row-major `f32` buffer where element
//! `(row, col)` lives at `row * hop + col`; this crate always uses
//! `hop == in`.
//!
//! Writing validates shape locally, before any native call. Reading is
//! two-phase: the first call passes no buffer and learns `out`/`in`, the
//! second fills a buffer of exactly that size. A zero-sized matrix is returned
//! as [`MixMatrix::empty`] without the second call.
//!
//! ```rust
//! use sonance_core::MixMatrix;
//!
//! let m = MixMatrix::from_rows(&[[1.0f32, 0.5], [0.25, 0.75]])?;
//! assert_eq!(m.out_channels(), 2);
//! assert_eq!(m.hop(), 2);
//! assert_eq!(m.as_slice(), &[1.0, 0.5, 0.25, 0.75]);
//! assert_eq!(m.get(1, 0), Some(0.25));
//! # Ok::<(), sonance_core::ArgumentError>(())
//! ```

use std::borrow::Cow;

use crate::error::{self, ArgumentError, DecodingError};
use crate::status::Status;

/// An `out × in` grid of gains.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MixMatrix {
    out_channels: usize,
    in_channels: usize,
    data: Vec<f32>,
}

impl MixMatrix {
    /// The zero-sized matrix.
    pub const fn empty() -> Self {
        Self {
            out_channels: 0,
            in_channels: 0,
            data: Vec::new(),
        }
    }

    /// Builds a matrix from rows. Every row must have the length of the first
    /// and there must be at least one non-empty row.
    pub fn from_rows<R: AsRef<[f32]>>(rows: &[R]) -> Result<Self, ArgumentError> {
        let out_channels = rows.len();
        let in_channels = rows.first().map_or(0, |r| r.as_ref().len());
        if in_channels == 0 {
            return Err(ArgumentError::EmptyMatrix);
        }
        let mut data = Vec::with_capacity(out_channels * in_channels);
        for (row, values) in rows.iter().enumerate() {
            let values = values.as_ref();
            if values.len() != in_channels {
                return Err(ArgumentError::RaggedMatrix {
                    row,
                    expected: in_channels,
                    actual: values.len(),
                });
            }
            data.extend_from_slice(values);
        }
        Ok(Self {
            out_channels,
            in_channels,
            data,
        })
    }

    /// Wraps a row-major buffer of `out_channels * in_channels` values.
    ///
    /// A product that overflows `usize` is reported as a
    /// [`ArgumentError::FlatLength`] with `expected` of `usize::MAX`.
    pub fn from_flat(
        out_channels: usize,
        in_channels: usize,
        data: Vec<f32>,
    ) -> Result<Self, ArgumentError> {
        let Some(expected) = out_channels.checked_mul(in_channels) else {
            return Err(ArgumentError::FlatLength {
                expected: usize::MAX,
                actual: data.len(),
            });
        };
        if data.len() != expected {
            return Err(ArgumentError::FlatLength {
                expected,
                actual: data.len(),
            });
        }
        if expected == 0 {
            return Ok(Self::empty());
        }
        Ok(Self {
            out_channels,
            in_channels,
            data,
        })
    }

    /// Output channel count (rows).
    #[inline]
    pub fn out_channels(&self) -> usize {
        self.out_channels
    }

    /// Input channel count (columns).
    #[inline]
    pub fn in_channels(&self) -> usize {
        self.in_channels
    }

    /// Row stride handed to the engine. Always equal to `in_channels`.
    #[inline]
    pub fn hop(&self) -> usize {
        self.in_channels
    }

    /// `true` for the zero-sized matrix.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// One output row.
    pub fn row(&self, row: usize) -> Option<&[f32]> {
        if row >= self.out_channels {
            return None;
        }
        let start = row * self.in_channels;
        self.data.get(start..start + self.in_channels)
    }

    /// Gain from input `col` to output `row`.
    pub fn get(&self, row: usize, col: usize) -> Option<f32> {
        if col >= self.in_channels {
            return None;
        }
        self.row(row).map(|r| r[col])
    }

    /// Iterates over output rows.
    pub fn rows(&self) -> impl Iterator<Item = &[f32]> {
        self.data.chunks_exact(self.in_channels.max(1))
    }

    /// Copies into nested rows.
    pub fn to_rows(&self) -> Vec<Vec<f32>> {
        self.rows().map(<[f32]>::to_vec).collect()
    }

    /// Row-major backing buffer.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }
}

fn to_native_dim(value: usize) -> Result<i32, ArgumentError> {
    i32::try_from(value).map_err(|_| ArgumentError::TooManyLevels {
        max: i32::MAX as usize,
        actual: value,
    })
}

fn from_native_dim(what: &'static str, value: i32) -> Result<usize, DecodingError> {
    usize::try_from(value).map_err(|_| DecodingError::NegativeDimension { what, value })
}

/// Asks the engine for the matrix dimensions only.
pub(crate) fn read_matrix_size(
    primitive: impl Fn() -> Cow<'static, str>,
    get: impl FnOnce(Option<&mut [f32]>, &mut i32, &mut i32, i32) -> Status,
) -> error::Result<(usize, usize)> {
    let (mut out_channels, mut in_channels) = (0, 0);
    get(None, &mut out_channels, &mut in_channels, 0).check_with(&primitive)?;
    Ok((
        from_native_dim("output channel count", out_channels)?,
        from_native_dim("input channel count", in_channels)?,
    ))
}

/// Two-phase read: dimensions first, then a buffer of exactly that size.
pub(crate) fn read_matrix(
    primitive: impl Fn() -> Cow<'static, str>,
    mut get: impl FnMut(Option<&mut [f32]>, &mut i32, &mut i32, i32) -> Status,
) -> error::Result<MixMatrix> {
    let (out_channels, in_channels) = read_matrix_size(&primitive, &mut get)?;
    if out_channels * in_channels == 0 {
        return Ok(MixMatrix::empty());
    }

    let mut data = vec![0.0f32; out_channels * in_channels];
    let (mut out_native, mut in_native) = (0, 0);
    let hop = to_native_dim(in_channels)?;
    get(Some(data.as_mut_slice()), &mut out_native, &mut in_native, hop).check_with(&primitive)?;
    Ok(MixMatrix {
        out_channels,
        in_channels,
        data,
    })
}

/// Validates and hands the flat buffer to the engine with `hop == in`.
pub(crate) fn write_matrix(
    primitive: impl Fn() -> Cow<'static, str>,
    matrix: &MixMatrix,
    set: impl FnOnce(&[f32], i32, i32, i32) -> Status,
) -> error::Result<()> {
    if matrix.is_empty() {
        return Err(ArgumentError::EmptyMatrix.into());
    }
    let out_channels = to_native_dim(matrix.out_channels)?;
    let in_channels = to_native_dim(matrix.in_channels)?;
    set(&matrix.data, out_channels, in_channels, in_channels).check_with(primitive)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn name() -> Cow<'static, str> {
        Cow::Borrowed("Channel_GetMixMatrix")
    }

    #[test]
    fn from_rows_rejects_empty() {
        let rows: [[f32; 0]; 0] = [];
        assert_eq!(MixMatrix::from_rows(&rows), Err(ArgumentError::EmptyMatrix));
        let rows: [[f32; 0]; 2] = [[], []];
        assert_eq!(MixMatrix::from_rows(&rows), Err(ArgumentError::EmptyMatrix));
    }

    #[test]
    fn from_rows_rejects_ragged() {
        let rows: Vec<Vec<f32>> = vec![vec![1.0, 2.0], vec![3.0], vec![4.0, 5.0]];
        assert_eq!(
            MixMatrix::from_rows(&rows),
            Err(ArgumentError::RaggedMatrix {
                row: 1,
                expected: 2,
                actual: 1
            })
        );
    }

    #[test]
    fn row_access() {
        let m = MixMatrix::from_rows(&[[1.0f32, 2.0, 3.0], [4.0, 5.0, 6.0]]).unwrap();
        assert_eq!(m.row(1), Some(&[4.0, 5.0, 6.0][..]));
        assert_eq!(m.row(2), None);
        assert_eq!(m.get(0, 2), Some(3.0));
        assert_eq!(m.get(0, 3), None);
        assert_eq!(m.rows().count(), 2);
        assert_eq!(m.to_rows(), vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]);
    }

    #[test]
    fn from_flat_checks_length() {
        assert!(MixMatrix::from_flat(2, 2, vec![0.0; 4]).is_ok());
        assert_eq!(
            MixMatrix::from_flat(2, 3, vec![0.0; 5]),
            Err(ArgumentError::FlatLength {
                expected: 6,
                actual: 5
            })
        );
        assert!(MixMatrix::from_flat(0, 4, Vec::new()).unwrap().is_empty());
    }

    #[test]
    fn from_flat_overflowing_shape() {
        assert_eq!(
            MixMatrix::from_flat(usize::MAX, 2, vec![0.0; 2]),
            Err(ArgumentError::FlatLength {
                expected: usize::MAX,
                actual: 2
            })
        );
        assert!(MixMatrix::from_flat(usize::MAX / 2, 3, Vec::new()).is_err());
    }

    #[test]
    fn write_passes_hop_equal_to_in() {
        let m = MixMatrix::from_rows(&[[1.0f32, 0.5, 0.0], [0.25, 0.75, 1.0]]).unwrap();
        let mut seen = None;
        write_matrix(name, &m, |data, out, inp, hop| {
            seen = Some((data.to_vec(), out, inp, hop));
            Status::OK
        })
        .unwrap();
        let (data, out, inp, hop) = seen.unwrap();
        assert_eq!((out, inp, hop), (2, 3, 3));
        assert_eq!(data, vec![1.0, 0.5, 0.0, 0.25, 0.75, 1.0]);
    }

    #[test]
    fn write_empty_never_calls_engine() {
        let err = write_matrix(name, &MixMatrix::empty(), |_, _, _, _| {
            panic!("engine must not be called")
        })
        .unwrap_err();
        assert_eq!(err, Error::Argument(ArgumentError::EmptyMatrix));
    }

    #[test]
    fn read_is_two_phase() {
        let stored = [1.0f32, 0.5, 0.25, 0.75];
        let mut calls = Vec::new();
        let m = read_matrix(name, |buf, out, inp, hop| {
            calls.push((buf.is_some(), hop));
            *out = 2;
            *inp = 2;
            if let Some(buf) = buf {
                buf.copy_from_slice(&stored);
            }
            Status::OK
        })
        .unwrap();
        assert_eq!(calls, vec![(false, 0), (true, 2)]);
        assert_eq!(m.to_rows(), vec![vec![1.0, 0.5], vec![0.25, 0.75]]);
    }

    #[test]
    fn read_zero_size_skips_second_call() {
        let mut calls = 0;
        let m = read_matrix(name, |_, out, inp, _| {
            calls += 1;
            *out = 0;
            *inp = 6;
            Status::OK
        })
        .unwrap();
        assert_eq!(calls, 1);
        assert!(m.is_empty());
    }

    #[test]
    fn read_negative_size_is_decoding_error() {
        let err = read_matrix(name, |_, out, inp, _| {
            *out = -2;
            *inp = 2;
            Status::OK
        })
        .unwrap_err();
        assert!(matches!(
            err,
            Error::Decoding(DecodingError::NegativeDimension { value: -2, .. })
        ));
    }

    #[test]
    fn read_reports_engine_failure() {
        let err = read_matrix(name, |_, _, _, _| Status::ERR_INVALID_HANDLE).unwrap_err();
        assert_eq!(err.status(), Some(Status::ERR_INVALID_HANDLE));
        assert!(err.to_string().starts_with("Channel_GetMixMatrix"));
    }
}
