//! WAV 读取

use log::{debug, error};
use std::path::Path;

use super::error::AudioError;

/// ffmpeg 抽取和切分时统一输出的采样率，也是 whisper 要求的输入
pub const TARGET_SAMPLE_RATE: u32 = 16_000;

/// 读取 WAV 头得到时长（秒）
pub fn wav_duration(path: &Path) -> Result<f64, AudioError> {
    let reader = hound::WavReader::open(path)?;
    let spec = reader.spec();
    if spec.sample_rate == 0 {
        return Err(AudioError::Wav(hound::Error::FormatError("invalid sample rate")));
    }
    // duration() 是每声道的采样数
    Ok(reader.duration() as f64 / spec.sample_rate as f64)
}

/// 读取 16 kHz 的 WAV，多声道取平均混为单声道
///
/// 片段都由 ffmpeg 以 16 kHz 写出，其他采样率直接报错。
pub fn load_wav_mono_f32(path: &Path) -> Result<Vec<f32>, AudioError> {
    debug!("📖 Reading WAV file: {}", path.display());
    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();
    if spec.sample_rate != TARGET_SAMPLE_RATE {
        error!(
            "❌ {}: {} Hz, expected {} Hz",
            path.display(),
            spec.sample_rate,
            TARGET_SAMPLE_RATE
        );
        return Err(AudioError::SampleRate(spec.sample_rate));
    }

    let channels = spec.channels.max(1) as usize;
    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
        hound::SampleFormat::Int => {
            let scale = (1_i64 << (spec.bits_per_sample.clamp(1, 32) - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()?
        }
    };

    let mono: Vec<f32> = if channels == 1 {
        interleaved
    } else {
        interleaved
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    };

    debug!(
        "📊 WAV: {} Hz, {} channels, {} bits -> {} mono samples",
        spec.sample_rate,
        spec.channels,
        spec.bits_per_sample,
        mono.len()
    );

    Ok(mono)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_wav(path: &Path, sample_rate: u32, channels: u16, samples: &[i16]) {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_wav_duration() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.wav");
        write_wav(&path, 16_000, 2, &vec![0i16; 16_000 * 2 * 3]);
        assert!((wav_duration(&path).unwrap() - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_stereo_is_mixed_down() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        write_wav(&path, 16_000, 2, &[16_384, 0, 16_384, 0]);

        let mono = load_wav_mono_f32(&path).unwrap();
        assert_eq!(mono.len(), 2);
        assert!((mono[0] - 0.25).abs() < 1e-4);
    }

    #[test]
    fn test_other_sample_rates_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cd.wav");
        write_wav(&path, 44_100, 1, &[0i16; 441]);

        assert!(matches!(
            load_wav_mono_f32(&path),
            Err(AudioError::SampleRate(44_100))
        ));
        // 时长读取不受采样率限制
        assert!((wav_duration(&path).unwrap() - 0.01).abs() < 1e-9);
    }
}
