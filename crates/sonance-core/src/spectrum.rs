//! Signal analysis records read back from DSP units.
//!
//! - [`SpectrumFrame`]: the FFT unit's spectrum data parameter, decoded from
//!   `{ length: i32, channels: i32, spectrum: [*const f32; 32] }`.
//! - [`MeteringInfo`]: per-channel peak and RMS levels.

use std::mem;

use crate::error::DecodingError;
use crate::native::{NativeApi, RawPtr, read_f32_slice};

/// Maximum channel count carried by analysis records.
pub const MAX_CHANNELS: usize = 32;

/// Largest bin count a spectrum record may report: the biggest FFT window
/// the engine supports.
pub const MAX_SPECTRUM_LENGTH: usize = 32_768;

/// Byte size of the native spectrum record.
pub const SPECTRUM_RECORD_LEN: usize = 8 + MAX_CHANNELS * mem::size_of::<usize>();

/// Per-channel magnitude spectra of equal length.
///
/// Bin `i` of a channel covers `i * nyquist / length` Hz.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpectrumFrame {
    length: usize,
    channels: Vec<Vec<f32>>,
}

impl SpectrumFrame {
    /// Builds a frame from channel spectra. All channels must share one
    /// length and there may be at most [`MAX_CHANNELS`].
    pub fn new(channels: Vec<Vec<f32>>) -> Result<Self, DecodingError> {
        if channels.len() > MAX_CHANNELS {
            return Err(DecodingError::ChannelCount {
                max: MAX_CHANNELS,
                actual: i32::try_from(channels.len()).unwrap_or(i32::MAX),
            });
        }
        let length = channels.first().map_or(0, Vec::len);
        if let Some(bad) = channels.iter().find(|c| c.len() != length) {
            return Err(DecodingError::RecordSize {
                record: "spectrum channel",
                expected: length,
                actual: bad.len(),
            });
        }
        Ok(Self { length, channels })
    }

    /// Bins per channel.
    #[inline]
    pub fn length(&self) -> usize {
        self.length
    }

    /// Number of channels.
    #[inline]
    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// Spectrum of one channel.
    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(Vec::as_slice)
    }

    /// All channel spectra.
    pub fn channels(&self) -> &[Vec<f32>] {
        &self.channels
    }

    /// Consumes the frame, returning the channel spectra.
    pub fn into_channels(self) -> Vec<Vec<f32>> {
        self.channels
    }

    /// Decodes the spectrum record at `data`, which the engine reported as
    /// `record_len` bytes long.
    pub(crate) fn decode(
        api: &dyn NativeApi,
        data: RawPtr,
        record_len: usize,
    ) -> Result<Self, DecodingError> {
        if record_len != SPECTRUM_RECORD_LEN {
            return Err(DecodingError::RecordSize {
                record: "spectrum",
                expected: SPECTRUM_RECORD_LEN,
                actual: record_len,
            });
        }
        if data.is_null() {
            return Err(DecodingError::NullPayload { what: "spectrum" });
        }
        let mut record = [0u8; SPECTRUM_RECORD_LEN];
        if !api.read_memory(data, &mut record) {
            return Err(DecodingError::UnreadableMemory(data.0));
        }

        let length_raw = i32::from_ne_bytes([record[0], record[1], record[2], record[3]]);
        let channels_raw = i32::from_ne_bytes([record[4], record[5], record[6], record[7]]);
        let length = usize::try_from(length_raw).map_err(|_| DecodingError::NegativeDimension {
            what: "spectrum length",
            value: length_raw,
        })?;
        if length > MAX_SPECTRUM_LENGTH {
            return Err(DecodingError::RecordSize {
                record: "spectrum length",
                expected: MAX_SPECTRUM_LENGTH,
                actual: length,
            });
        }
        let num_channels = usize::try_from(channels_raw)
            .ok()
            .filter(|&n| n <= MAX_CHANNELS)
            .ok_or(DecodingError::ChannelCount {
                max: MAX_CHANNELS,
                actual: channels_raw,
            })?;

        let word = mem::size_of::<usize>();
        let mut channels = Vec::with_capacity(num_channels);
        for (index, ptr_bytes) in record[8..].chunks_exact(word).take(num_channels).enumerate() {
            let mut addr = [0u8; mem::size_of::<usize>()];
            addr.copy_from_slice(ptr_bytes);
            let mut bins = vec![0.0f32; length];
            read_f32_slice(api, RawPtr(usize::from_ne_bytes(addr)), &mut bins, "spectrum channel")?;
            tracing::trace!(index, length, "decoded spectrum channel");
            channels.push(bins);
        }
        Ok(Self { length, channels })
    }
}

/// Signal levels measured at a DSP input or output.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MeteringInfo {
    /// Samples considered for this measurement.
    pub num_samples: i32,
    /// Peak level per channel.
    pub peak_level: [f32; MAX_CHANNELS],
    /// RMS level per channel.
    pub rms_level: [f32; MAX_CHANNELS],
    /// Channels measured.
    pub num_channels: i16,
}

impl MeteringInfo {
    fn measured(&self) -> usize {
        usize::try_from(self.num_channels).map_or(0, |n| n.min(MAX_CHANNELS))
    }

    /// Peak levels of the measured channels.
    pub fn peaks(&self) -> &[f32] {
        &self.peak_level[..self.measured()]
    }

    /// RMS levels of the measured channels.
    pub fn rms(&self) -> &[f32] {
        &self.rms_level[..self.measured()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockEngine;

    #[test]
    fn frame_requires_equal_lengths() {
        assert!(SpectrumFrame::new(vec![vec![0.0; 4], vec![0.0; 4]]).is_ok());
        assert_eq!(
            SpectrumFrame::new(vec![vec![0.0; 4], vec![0.0; 3]]).unwrap_err(),
            DecodingError::RecordSize {
                record: "spectrum channel",
                expected: 4,
                actual: 3
            }
        );
        assert!(SpectrumFrame::new(vec![vec![0.0; 2]; 33]).is_err());
    }

    #[test]
    fn decode_reads_every_channel() {
        let mock = MockEngine::new();
        let left = [1.0, 2.0, 3.0];
        let right = [4.0, 5.0, 6.0];
        let record = mock.alloc_spectrum(&[&left, &right]);
        let frame = SpectrumFrame::decode(&mock, record, SPECTRUM_RECORD_LEN).unwrap();
        assert_eq!(frame.length(), 3);
        assert_eq!(frame.num_channels(), 2);
        assert_eq!(frame.channel(0), Some(&left[..]));
        assert_eq!(frame.channel(1), Some(&right[..]));
        assert_eq!(frame.channel(2), None);
    }

    #[test]
    fn decode_rejects_wrong_record_size() {
        let mock = MockEngine::new();
        let record = mock.alloc_spectrum(&[&[0.0]]);
        assert!(matches!(
            SpectrumFrame::decode(&mock, record, SPECTRUM_RECORD_LEN - 1),
            Err(DecodingError::RecordSize { record: "spectrum", .. })
        ));
    }

    #[test]
    fn decode_rejects_too_many_channels() {
        let mock = MockEngine::new();
        let mut bytes = vec![0u8; SPECTRUM_RECORD_LEN];
        bytes[0..4].copy_from_slice(&8i32.to_ne_bytes());
        bytes[4..8].copy_from_slice(&33i32.to_ne_bytes());
        let record = mock.alloc_bytes(&bytes);
        assert_eq!(
            SpectrumFrame::decode(&mock, record, SPECTRUM_RECORD_LEN).unwrap_err(),
            DecodingError::ChannelCount {
                max: MAX_CHANNELS,
                actual: 33
            }
        );
    }

    #[test]
    fn decode_rejects_oversized_length() {
        let mock = MockEngine::new();
        let mut bytes = vec![0u8; SPECTRUM_RECORD_LEN];
        bytes[0..4].copy_from_slice(&i32::MAX.to_ne_bytes());
        bytes[4..8].copy_from_slice(&1i32.to_ne_bytes());
        let record = mock.alloc_bytes(&bytes);
        assert_eq!(
            SpectrumFrame::decode(&mock, record, SPECTRUM_RECORD_LEN).unwrap_err(),
            DecodingError::RecordSize {
                record: "spectrum length",
                expected: MAX_SPECTRUM_LENGTH,
                actual: i32::MAX as usize
            }
        );
    }

    #[test]
    fn decode_accepts_largest_window() {
        let mock = MockEngine::new();
        let bins = vec![0.5f32; MAX_SPECTRUM_LENGTH];
        let record = mock.alloc_spectrum(&[bins.as_slice()]);
        let frame = SpectrumFrame::decode(&mock, record, SPECTRUM_RECORD_LEN).unwrap();
        assert_eq!(frame.length(), MAX_SPECTRUM_LENGTH);
    }

    #[test]
    fn decode_rejects_null_channel_pointer() {
        let mock = MockEngine::new();
        let mut bytes = vec![0u8; SPECTRUM_RECORD_LEN];
        bytes[0..4].copy_from_slice(&8i32.to_ne_bytes());
        bytes[4..8].copy_from_slice(&1i32.to_ne_bytes());
        let record = mock.alloc_bytes(&bytes);
        assert!(matches!(
            SpectrumFrame::decode(&mock, record, SPECTRUM_RECORD_LEN),
            Err(DecodingError::NullPayload { .. })
        ));
    }

    #[test]
    fn metering_slices_follow_channel_count() {
        let mut info = MeteringInfo {
            num_channels: 2,
            ..MeteringInfo::default()
        };
        info.peak_level[..3].copy_from_slice(&[0.5, 0.25, 0.9]);
        assert_eq!(info.peaks(), &[0.5, 0.25]);
        assert_eq!(info.rms().len(), 2);
        info.num_channels = -1;
        assert!(info.peaks().is_empty());
    }
}
