//! Saved engine state
//!
//! Binary layout (all integers little-endian):
//!
//! ```text
//! u32   yaml_len
//! [u8]  yaml_len bytes of YAML (ParamValues)
//! u8    has_user_sample
//! i32   blob_size
//! blob: i32 channels, i32 samples, then channels × samples f32
//! ```
//!
//! The blob is empty (`blob_size == 0`) when no user sample is saved.

use thiserror::Error;

use crate::audio_file::UserSample;
use crate::engine::ParamValues;
use crate::types::AudioBuffer;

/// Errors decoding or encoding saved state
#[derive(Debug, Error)]
pub enum StateError {
    #[error("State data is truncated")]
    Truncated,
    #[error("Invalid parameter data: {0}")]
    InvalidParams(#[source] serde_yaml::Error),
    #[error("Failed to serialize parameters: {0}")]
    Serialize(#[source] serde_yaml::Error),
    #[error("Invalid sample counts in state: {channels} channels, {samples} samples, {blob_size} byte blob")]
    InvalidCounts {
        channels: i64,
        samples: i64,
        blob_size: i64,
    },
    #[error("Engine is busy (command queue full), try again")]
    EngineBusy,
}

/// Decoded state, not yet applied to an engine
#[derive(Debug, Clone, PartialEq)]
pub struct SavedState {
    pub params: ParamValues,
    /// Raw user sample audio, before fitting to the engine format
    pub sample: Option<AudioBuffer>,
}

/// Serialize parameters and an optional user sample
pub fn encode_state(params: &ParamValues, sample: Option<&UserSample>) -> Result<Vec<u8>, StateError> {
    let yaml = serde_yaml::to_string(params).map_err(StateError::Serialize)?;
    let sample = sample.filter(|s| !s.is_empty() && s.num_channels() > 0);

    let blob_size = sample.map_or(0, |s| 8 + s.num_channels() * s.len() * 4);
    let mut out = Vec::with_capacity(4 + yaml.len() + 1 + 4 + blob_size);

    out.extend_from_slice(&(yaml.len() as u32).to_le_bytes());
    out.extend_from_slice(yaml.as_bytes());
    out.push(sample.is_some() as u8);
    out.extend_from_slice(&(blob_size as i32).to_le_bytes());

    if let Some(sample) = sample {
        out.extend_from_slice(&(sample.num_channels() as i32).to_le_bytes());
        out.extend_from_slice(&(sample.len() as i32).to_le_bytes());
        for ch in 0..sample.num_channels() {
            for &s in sample.channel(ch) {
                out.extend_from_slice(&s.to_le_bytes());
            }
        }
    }
    Ok(out)
}

/// Parse saved state; nothing is returned unless the whole input is valid
pub fn decode_state(bytes: &[u8]) -> Result<SavedState, StateError> {
    let mut reader = ByteReader::new(bytes);

    let yaml_len = reader.u32()? as usize;
    let yaml = reader.take(yaml_len)?;
    let params: ParamValues = serde_yaml::from_slice(yaml).map_err(StateError::InvalidParams)?;

    let has_sample = reader.u8()? != 0;
    let blob_size = reader.i32()?;
    let invalid = |channels: i64, samples: i64| StateError::InvalidCounts {
        channels,
        samples,
        blob_size: blob_size as i64,
    };
    if blob_size < 0 {
        return Err(invalid(0, 0));
    }
    let blob = reader.take(blob_size as usize)?;

    let sample = if has_sample && !blob.is_empty() {
        let mut blob = ByteReader::new(blob);
        let channels = blob.i32()?;
        let samples = blob.i32()?;
        if channels <= 0 || samples < 0 {
            return Err(invalid(channels as i64, samples as i64));
        }
        let expected = 8 + channels as i64 * samples as i64 * 4;
        if expected != blob_size as i64 {
            return Err(invalid(channels as i64, samples as i64));
        }

        let data: Vec<Vec<f32>> = (0..channels)
            .map(|_| {
                (0..samples)
                    .map(|_| blob.f32())
                    .collect::<Result<Vec<f32>, StateError>>()
            })
            .collect::<Result<_, _>>()?;
        Some(AudioBuffer::from_channels(data)).filter(|b| !b.is_empty())
    } else {
        None
    };

    Ok(SavedState {
        params: params.clamped(),
        sample,
    })
}

/// Little-endian cursor over a byte slice
struct ByteReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], StateError> {
        let end = self.pos.checked_add(len).ok_or(StateError::Truncated)?;
        let slice = self.bytes.get(self.pos..end).ok_or(StateError::Truncated)?;
        self.pos = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], StateError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8, StateError> {
        Ok(self.array::<1>()?[0])
    }

    fn u32(&mut self) -> Result<u32, StateError> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    fn i32(&mut self) -> Result<i32, StateError> {
        Ok(i32::from_le_bytes(self.array()?))
    }

    fn f32(&mut self) -> Result<f32, StateError> {
        Ok(f32::from_le_bytes(self.array()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn custom_params() -> ParamValues {
        ParamValues {
            hold: true,
            squeeze: 55.0,
            release_ms: 750.0,
            mix: 0.4,
            ..Default::default()
        }
    }

    fn stereo_sample() -> UserSample {
        let buffer = AudioBuffer::from_channels(vec![vec![0.1, 0.2, 0.3], vec![-0.1, -0.2, -0.3]]);
        UserSample::new(buffer, 48000, "take.wav")
    }

    #[test]
    fn test_state_with_sample() {
        let bytes = encode_state(&custom_params(), Some(&stereo_sample())).unwrap();
        let state = decode_state(&bytes).unwrap();
        assert_eq!(state.params, custom_params());
        assert_eq!(state.sample.as_ref(), Some(stereo_sample().buffer()));
    }

    #[test]
    fn test_state_without_sample() {
        let bytes = encode_state(&ParamValues::default(), None).unwrap();
        let yaml_len = u32::from_le_bytes(bytes[..4].try_into().unwrap()) as usize;
        // Flag and an empty blob follow the YAML
        assert_eq!(bytes.len(), 4 + yaml_len + 1 + 4);
        assert_eq!(bytes[4 + yaml_len], 0);

        let state = decode_state(&bytes).unwrap();
        assert_eq!(state.params, ParamValues::default());
        assert!(state.sample.is_none());
    }

    #[test]
    fn test_blob_layout() {
        let bytes = encode_state(&custom_params(), Some(&stereo_sample())).unwrap();
        let yaml_len = u32::from_le_bytes(bytes[..4].try_into().unwrap()) as usize;
        let rest = &bytes[4 + yaml_len..];
        assert_eq!(rest[0], 1);
        assert_eq!(i32::from_le_bytes(rest[1..5].try_into().unwrap()), 8 + 2 * 3 * 4);
        assert_eq!(i32::from_le_bytes(rest[5..9].try_into().unwrap()), 2);
        assert_eq!(i32::from_le_bytes(rest[9..13].try_into().unwrap()), 3);
        assert_eq!(f32::from_le_bytes(rest[13..17].try_into().unwrap()), 0.1);
        // Channel-major: second channel starts after all of the first
        assert_eq!(f32::from_le_bytes(rest[25..29].try_into().unwrap()), -0.1);
    }

    #[test]
    fn test_truncated_input() {
        let bytes = encode_state(&custom_params(), Some(&stereo_sample())).unwrap();
        for cut in [0, 3, 10, bytes.len() - 30, bytes.len() - 1] {
            assert!(
                matches!(decode_state(&bytes[..cut]), Err(StateError::Truncated)),
                "cut at {}",
                cut
            );
        }
    }

    #[test]
    fn test_invalid_counts() {
        let bytes = encode_state(&custom_params(), Some(&stereo_sample())).unwrap();
        let yaml_len = u32::from_le_bytes(bytes[..4].try_into().unwrap()) as usize;
        let channels_at = 4 + yaml_len + 1 + 4;

        let mut negative = bytes.clone();
        negative[channels_at..channels_at + 4].copy_from_slice(&(-2i32).to_le_bytes());
        assert!(matches!(decode_state(&negative), Err(StateError::InvalidCounts { .. })));

        let mut inconsistent = bytes.clone();
        inconsistent[channels_at + 4..channels_at + 8].copy_from_slice(&5i32.to_le_bytes());
        assert!(matches!(decode_state(&inconsistent), Err(StateError::InvalidCounts { .. })));

        let mut negative_blob = bytes;
        negative_blob[channels_at - 4..channels_at].copy_from_slice(&(-1i32).to_le_bytes());
        assert!(matches!(decode_state(&negative_blob), Err(StateError::InvalidCounts { .. })));
    }

    #[test]
    fn test_invalid_yaml() {
        let yaml = b"squeeze: [not, a, number]";
        let mut bytes = (yaml.len() as u32).to_le_bytes().to_vec();
        bytes.extend_from_slice(yaml);
        bytes.push(0);
        bytes.extend_from_slice(&0i32.to_le_bytes());
        assert!(matches!(decode_state(&bytes), Err(StateError::InvalidParams(_))));
    }

    #[test]
    fn test_out_of_range_params_are_clamped() {
        let yaml = b"squeeze: 400\nmix: -1\n";
        let mut bytes = (yaml.len() as u32).to_le_bytes().to_vec();
        bytes.extend_from_slice(yaml);
        bytes.push(0);
        bytes.extend_from_slice(&0i32.to_le_bytes());
        let state = decode_state(&bytes).unwrap();
        assert_eq!(state.params.squeeze, 100.0);
        assert_eq!(state.params.mix, 0.0);
        assert_eq!(state.params.release_ms, 30.0);
    }
}
