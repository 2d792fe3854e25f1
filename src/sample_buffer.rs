// src/sample_buffer.rs

//! Immutable decoded audio, shared by every voice that plays it.

use crate::error::LoadError;
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Mono PCM samples at a known sample rate. Cloning shares the data.
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    data: Arc<Vec<f32>>,
    sample_rate: u32,
}

impl SampleBuffer {
    pub fn new(data: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            data: Arc::new(data),
            sample_rate,
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Decodes a WAV file, folds it down to mono and resamples it to `target_sr`.
    pub fn load_wav(path: &Path, target_sr: u32) -> Result<Self, LoadError> {
        let file = File::open(path).map_err(|e| LoadError::Decode {
            path: path.to_path_buf(),
            source: hound::Error::IoError(e),
        })?;
        let reader =
            hound::WavReader::new(BufReader::new(file)).map_err(|source| LoadError::Decode {
                path: path.to_path_buf(),
                source,
            })?;
        let spec = reader.spec();
        let num_channels = spec.channels as usize;
        if num_channels == 0 {
            return Err(LoadError::UnsupportedFormat {
                path: path.to_path_buf(),
                detail: "zero channels".to_string(),
            });
        }

        let all_samples: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
            (hound::SampleFormat::Float, 32) => reader
                .into_samples::<f32>()
                .collect::<Result<_, _>>()
                .map_err(|source| LoadError::Decode {
                    path: path.to_path_buf(),
                    source,
                })?,
            (hound::SampleFormat::Int, bits @ 8..=32) => {
                let scale = (1_i64 << (bits - 1)) as f32;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|s| s as f32 / scale))
                    .collect::<Result<_, _>>()
                    .map_err(|source| LoadError::Decode {
                        path: path.to_path_buf(),
                        source,
                    })?
            }
            (format, bits) => {
                return Err(LoadError::UnsupportedFormat {
                    path: path.to_path_buf(),
                    detail: format!("{:?} at {} bits", format, bits),
                })
            }
        };

        let mono_samples: Vec<f32> = if num_channels > 1 {
            all_samples
                .chunks_exact(num_channels)
                .map(|chunk| chunk.iter().sum::<f32>() / num_channels as f32)
                .collect()
        } else {
            all_samples
        };

        let source_sr = spec.sample_rate;
        if source_sr != target_sr && !mono_samples.is_empty() {
            info!(
                path = %path.display(),
                source_rate = source_sr,
                target_rate = target_sr,
                "Resampling sample"
            );
            let resampled = resample(mono_samples, source_sr, target_sr).map_err(|detail| {
                LoadError::Resample {
                    path: path.to_path_buf(),
                    detail,
                }
            })?;
            Ok(Self::new(resampled, target_sr))
        } else {
            debug!(path = %path.display(), frames = mono_samples.len(), "Decoded sample");
            Ok(Self::new(mono_samples, target_sr))
        }
    }
}

fn resample(mono_samples: Vec<f32>, source_sr: u32, target_sr: u32) -> Result<Vec<f32>, String> {
    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };
    let mut resampler = SincFixedIn::<f32>::new(
        target_sr as f64 / source_sr as f64,
        2.0,
        params,
        mono_samples.len(),
        1,
    )
    .map_err(|e| e.to_string())?;
    let waves_in = vec![mono_samples];
    let waves_out = resampler
        .process(&waves_in, None)
        .map_err(|e| e.to_string())?;
    Ok(waves_out.into_iter().next().unwrap_or_default())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::path::PathBuf;

    pub(crate) fn write_test_wav(
        dir: &Path,
        name: &str,
        channels: u16,
        sample_rate: u32,
        frames: &[i16],
    ) -> PathBuf {
        let path = dir.join(name);
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for &s in frames {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
        path
    }

    #[test]
    fn test_load_mono_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_test_wav(dir.path(), "mono.wav", 1, 44100, &[0, 16384, -16384, 32767]);
        let buffer = SampleBuffer::load_wav(&path, 44100).unwrap();
        assert_eq!(buffer.len(), 4);
        assert_eq!(buffer.sample_rate(), 44100);
        assert!((buffer.samples()[1] - 0.5).abs() < 1e-4);
        assert!((buffer.samples()[2] + 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_stereo_is_folded_to_mono() {
        let dir = tempfile::tempdir().unwrap();
        // Two frames: (0.5, 0.0) and (-0.5, -0.5)
        let path = write_test_wav(
            dir.path(),
            "stereo.wav",
            2,
            44100,
            &[16384, 0, -16384, -16384],
        );
        let buffer = SampleBuffer::load_wav(&path, 44100).unwrap();
        assert_eq!(buffer.len(), 2);
        assert!((buffer.samples()[0] - 0.25).abs() < 1e-4);
        assert!((buffer.samples()[1] + 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_resamples_to_target_rate() {
        let dir = tempfile::tempdir().unwrap();
        let frames = vec![1000_i16; 22050];
        let path = write_test_wav(dir.path(), "half.wav", 1, 22050, &frames);
        let buffer = SampleBuffer::load_wav(&path, 44100).unwrap();
        assert_eq!(buffer.sample_rate(), 44100);
        // Roughly twice as many frames, allowing for resampler edge effects.
        assert!(buffer.len() > 40000 && buffer.len() < 48000, "len {}", buffer.len());
    }

    #[test]
    fn test_missing_file_is_decode_error() {
        let result = SampleBuffer::load_wav(Path::new("/definitely/not/here.wav"), 44100);
        assert!(matches!(result, Err(LoadError::Decode { .. })));
    }
}
