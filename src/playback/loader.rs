use std::path::Path;

use anyhow::Context;

/// Decoded mono audio plus the rate it was recorded at. The player resamples
/// on the fly, so the file rate does not need to match the device rate.
#[derive(Debug)]
pub struct LoadedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl LoadedAudio {
    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        self.samples.len() as u64 * 1000 / self.sample_rate as u64
    }
}

// Load a WAV from disk, downmixed to mono f32
pub fn load_wav(path: &Path) -> anyhow::Result<LoadedAudio> {
    let mut reader = hound::WavReader::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let spec = reader.spec();

    let raw: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<Vec<_>, _>>()
            .context("failed to decode float samples")?,
        hound::SampleFormat::Int => {
            let max = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|x| x as f32 / max))
                .collect::<Result<Vec<_>, _>>()
                .context("failed to decode int samples")?
        }
    };

    let channels = spec.channels as usize;
    if channels == 0 {
        anyhow::bail!("wav reports zero channels");
    }

    let samples = if channels == 1 {
        raw
    } else {
        raw.chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    };

    Ok(LoadedAudio {
        samples,
        sample_rate: spec.sample_rate,
    })
}
