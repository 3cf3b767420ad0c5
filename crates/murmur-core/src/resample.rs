//! Resampling of captured audio for the local engine.
//!
//! whisper.cpp consumes 16kHz mono f32 PCM; microphones rarely deliver
//! that natively, so live mode funnels everything through here.

use anyhow::{Context, Result};
use audioadapter_buffers::direct::InterleavedSlice;
use rubato::{Fft, FixedSync, Resampler};

/// Sample rate the recognition engine expects
pub const ENGINE_SAMPLE_RATE: u32 = 16000;

/// Input frames consumed per resampler pass.
const BLOCK_FRAMES: usize = 1024;

/// Average all channels of interleaved audio into one.
pub fn downmix_to_mono(samples: &[f32], channels: u16) -> Vec<f32> {
    samples
        .chunks(channels as usize)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Block-buffered resampler for live capture.
///
/// Capture callbacks deliver chunks far smaller than the resampler's
/// block size; padding each one would smear zeros into the signal. This
/// buffers input and only resamples full blocks, padding once at
/// [`StreamResampler::finish`].
pub struct StreamResampler {
    inner: Option<Fft<f32>>,
    out_max: usize,
    pending: Vec<f32>,
    channels: u16,
}

impl StreamResampler {
    pub fn new(source_rate: u32, channels: u16) -> Result<Self> {
        let (inner, out_max) = if source_rate == ENGINE_SAMPLE_RATE {
            (None, 0)
        } else {
            let resampler = Fft::<f32>::new(
                source_rate as usize,
                ENGINE_SAMPLE_RATE as usize,
                BLOCK_FRAMES,
                2, // sub-chunks
                1, // mono
                FixedSync::Input,
            )
            .context("Failed to create resampler")?;
            let out_max = resampler.output_frames_max();
            (Some(resampler), out_max)
        };
        Ok(Self {
            inner,
            out_max,
            pending: Vec::new(),
            channels,
        })
    }

    /// Feed one interleaved capture chunk; returns whatever full blocks
    /// it completed, resampled to the engine rate.
    pub fn push(&mut self, samples: &[f32]) -> Result<Vec<f32>> {
        let mono = if self.channels > 1 {
            downmix_to_mono(samples, self.channels)
        } else {
            samples.to_vec()
        };

        let Some(resampler) = self.inner.as_mut() else {
            return Ok(mono);
        };

        self.pending.extend_from_slice(&mono);
        let mut output = Vec::new();
        while self.pending.len() >= BLOCK_FRAMES {
            let block: Vec<f32> = self.pending.drain(..BLOCK_FRAMES).collect();
            resample_block(resampler, &block, self.out_max, &mut output)?;
        }
        Ok(output)
    }

    /// Flush the buffered tail, zero-padded to a full block.
    pub fn finish(&mut self) -> Result<Vec<f32>> {
        let Some(resampler) = self.inner.as_mut() else {
            return Ok(Vec::new());
        };
        if self.pending.is_empty() {
            return Ok(Vec::new());
        }
        let mut block = std::mem::take(&mut self.pending);
        block.resize(BLOCK_FRAMES, 0.0);
        let mut output = Vec::new();
        resample_block(resampler, &block, self.out_max, &mut output)?;
        Ok(output)
    }
}

/// Run one full input block through the resampler, appending the frames
/// it produced to `out`.
fn resample_block(
    resampler: &mut Fft<f32>,
    block: &[f32],
    out_max: usize,
    out: &mut Vec<f32>,
) -> Result<()> {
    let input = InterleavedSlice::new(block, 1, block.len())
        .map_err(|e| anyhow::anyhow!("Bad input buffer layout: {e}"))?;
    let mut scratch = vec![0.0f32; out_max];
    let mut output = InterleavedSlice::new_mut(&mut scratch, 1, out_max)
        .map_err(|e| anyhow::anyhow!("Bad output buffer layout: {e}"))?;
    let (_consumed, written) = resampler
        .process_into_buffer(&input, &mut output, None)
        .context("Resampling failed")?;
    out.extend_from_slice(&scratch[..written]);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_downmix_averages_channels() {
        let stereo = vec![0.5, 0.3, 0.8, 0.2, 1.0, 0.0];
        let mono = downmix_to_mono(&stereo, 2);
        assert_eq!(mono.len(), 3);
        assert!((mono[0] - 0.4).abs() < 0.001);
        assert!((mono[1] - 0.5).abs() < 0.001);
        assert!((mono[2] - 0.5).abs() < 0.001);
    }

    #[test]
    fn test_stream_passthrough_at_engine_rate() {
        let mut rs = StreamResampler::new(ENGINE_SAMPLE_RATE, 1).unwrap();
        let chunk = vec![0.1, 0.2, 0.3];
        assert_eq!(rs.push(&chunk).unwrap(), chunk);
        assert!(rs.finish().unwrap().is_empty());
    }

    #[test]
    fn test_stream_passthrough_downmixes_stereo() {
        let mut rs = StreamResampler::new(ENGINE_SAMPLE_RATE, 2).unwrap();
        let out = rs.push(&[0.5, 0.3, 0.8, 0.2]).unwrap();
        assert_eq!(out.len(), 2);
        assert!((out[0] - 0.4).abs() < 0.001);
        assert!((out[1] - 0.5).abs() < 0.001);
    }

    #[test]
    fn test_stream_emits_only_on_full_blocks() {
        let mut rs = StreamResampler::new(48000, 1).unwrap();
        // Small chunks buffer up silently until a full block is in.
        assert!(rs.push(&vec![0.2f32; 500]).unwrap().is_empty());
        assert!(!rs.push(&vec![0.2f32; 600]).unwrap().is_empty());
    }

    #[test]
    fn test_stream_total_output_matches_ratio() {
        let mut rs = StreamResampler::new(48000, 2).unwrap();
        let mut total = 0usize;
        for _ in 0..10 {
            // 500 stereo frames per push
            total += rs.push(&vec![0.2f32; 1000]).unwrap().len();
        }
        total += rs.finish().unwrap().len();
        // 5000 frames at 48k is roughly 1666 at 16k, plus tail padding
        let delta = (total as i64 - 1666).abs();
        assert!(delta < 400, "unexpected total {total}");
    }
}
