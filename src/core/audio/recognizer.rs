//! 语音识别

use log::{debug, error, info};
use once_cell::sync::OnceCell;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::error::AudioError;

/// 语音转文字引擎，一次运行内共享，需支持并发调用
pub trait SpeechRecognizer: Send + Sync {
    fn transcribe(&self, clip: &Path) -> Result<String, AudioError>;

    /// 一次运行的全部片段，结果与 `clips` 同序
    ///
    /// 默认在当前 rayon 线程池中逐段并行调用 `transcribe`。
    fn transcribe_batch(&self, clips: &[PathBuf]) -> Vec<Result<String, AudioError>> {
        clips.par_iter().map(|clip| self.transcribe(clip)).collect()
    }
}

impl<T: SpeechRecognizer + ?Sized> SpeechRecognizer for Arc<T> {
    fn transcribe(&self, clip: &Path) -> Result<String, AudioError> {
        (**self).transcribe(clip)
    }

    fn transcribe_batch(&self, clips: &[PathBuf]) -> Vec<Result<String, AudioError>> {
        (**self).transcribe_batch(clips)
    }
}

/// 调用 `whisper` 命令行，读取生成的 txt
///
/// 同一目录下的片段在一次进程中转写，模型每批只加载一次。
pub struct WhisperCliRecognizer {
    model: String,
    language: String,
}

impl WhisperCliRecognizer {
    pub fn new(model: &str, language: &str) -> Self {
        info!("🎙️ Whisper CLI recognizer: model {}, language {}", model, language);
        Self {
            model: model.to_string(),
            language: language.to_string(),
        }
    }

    fn command(&self, clips: &[&Path], output_dir: &Path) -> Command {
        let mut command = Command::new("whisper");
        command
            .args(clips)
            .arg("--model")
            .arg(&self.model)
            .arg("--language")
            .arg(&self.language)
            .arg("--output_format")
            .arg("txt")
            .arg("--output_dir")
            .arg(output_dir)
            .arg("--verbose")
            .arg("False");
        command
    }

    /// 同一输出目录的片段跑一次 whisper，返回各片段的文本
    fn run_group(&self, output_dir: &Path, clips: &[&Path]) -> Vec<Result<String, AudioError>> {
        info!("🎤 whisper: {} clips in {}", clips.len(), output_dir.display());
        let output = match self.command(clips, output_dir).output() {
            Ok(output) => output,
            Err(e) => {
                error!("❌ Failed to start whisper: {}", e);
                let reason = format!("failed to start whisper: {}", e);
                return clips
                    .iter()
                    .map(|_| Err(AudioError::Recognizer(reason.clone())))
                    .collect();
            }
        };

        if !output.status.success() {
            let reason = String::from_utf8_lossy(&output.stderr).trim().to_string();
            error!("❌ whisper failed in {}: {}", output_dir.display(), reason);
            return clips
                .iter()
                .map(|_| Err(AudioError::Recognizer(reason.clone())))
                .collect();
        }

        clips
            .iter()
            .map(|clip| read_transcript(output_dir, clip))
            .collect()
    }
}

/// whisper 按输入文件名命名输出，读完即删
fn read_transcript(output_dir: &Path, clip: &Path) -> Result<String, AudioError> {
    let stem = clip
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .ok_or_else(|| AudioError::Recognizer(format!("invalid clip path {}", clip.display())))?;

    let txt = output_dir.join(format!("{}.txt", stem));
    let text = std::fs::read_to_string(&txt).map_err(|e| {
        AudioError::Recognizer(format!("no transcript for {}: {}", clip.display(), e))
    })?;
    let _ = std::fs::remove_file(&txt);

    let text = text.lines().map(str::trim).collect::<Vec<_>>().join(" ");
    debug!("📝 {}: {} chars", clip.display(), text.len());
    Ok(text.trim().to_string())
}

/// 按所在目录分组，记录每个片段在输入中的位置
fn group_by_dir(clips: &[PathBuf]) -> BTreeMap<&Path, Vec<(usize, &Path)>> {
    let mut groups: BTreeMap<&Path, Vec<(usize, &Path)>> = BTreeMap::new();
    for (index, clip) in clips.iter().enumerate() {
        let dir = clip.parent().unwrap_or(Path::new("."));
        groups.entry(dir).or_default().push((index, clip.as_path()));
    }
    groups
}

impl SpeechRecognizer for WhisperCliRecognizer {
    fn transcribe(&self, clip: &Path) -> Result<String, AudioError> {
        self.transcribe_batch(&[clip.to_path_buf()])
            .pop()
            .unwrap_or_else(|| Err(AudioError::Recognizer("whisper returned nothing".into())))
    }

    fn transcribe_batch(&self, clips: &[PathBuf]) -> Vec<Result<String, AudioError>> {
        let mut results: Vec<Option<Result<String, AudioError>>> =
            clips.iter().map(|_| None).collect();

        for (dir, members) in group_by_dir(clips) {
            let paths: Vec<&Path> = members.iter().map(|(_, path)| *path).collect();
            for ((index, _), result) in members.iter().zip(self.run_group(dir, &paths)) {
                results[*index] = Some(result);
            }
        }

        results
            .into_iter()
            .map(|r| {
                r.unwrap_or_else(|| Err(AudioError::Recognizer("clip was not transcribed".into())))
            })
            .collect()
    }
}

/// 本地 whisper.cpp 模型，加载一次后在所有片段间复用
#[cfg(feature = "whisper")]
pub struct WhisperHandle {
    ctx: whisper_rs::WhisperContext,
    language: String,
}

#[cfg(feature = "whisper")]
impl WhisperHandle {
    pub fn new(model_path: &Path, language: &str) -> Result<Self, AudioError> {
        info!("🔧 Loading whisper model from: {}", model_path.display());
        let path = model_path.to_str().ok_or_else(|| {
            AudioError::ModelLoadFailed(format!("non UTF-8 model path {}", model_path.display()))
        })?;

        let ctx = whisper_rs::WhisperContext::new_with_params(
            path,
            whisper_rs::WhisperContextParameters::default(),
        )
        .map_err(|e| {
            error!("❌ Failed to load whisper model: {}", e);
            AudioError::ModelLoadFailed(e.to_string())
        })?;

        info!("✅ Whisper model loaded successfully");
        Ok(Self {
            ctx,
            language: language.to_string(),
        })
    }
}

#[cfg(feature = "whisper")]
impl SpeechRecognizer for WhisperHandle {
    fn transcribe(&self, clip: &Path) -> Result<String, AudioError> {
        use whisper_rs::{FullParams, SamplingStrategy};

        let samples = super::utils::load_wav_mono_f32(clip)?;
        debug!("🎤 Transcribing {} samples from {}", samples.len(), clip.display());

        // 每次调用独立的 state，context 只读共享
        let mut state = self
            .ctx
            .create_state()
            .map_err(|e| AudioError::Recognizer(e.to_string()))?;

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        params.set_language(Some(self.language.as_str()));
        params.set_translate(false);
        params.set_print_progress(false);
        params.set_print_special(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);

        state
            .full(params, &samples)
            .map_err(|e| AudioError::Recognizer(e.to_string()))?;

        let mut text = String::new();
        for segment in state.as_iter() {
            if let Ok(s) = segment.to_str() {
                text.push_str(s);
            }
        }
        Ok(text.trim().to_string())
    }
}

#[cfg(feature = "whisper")]
impl Drop for WhisperHandle {
    fn drop(&mut self) {
        info!("🗑️ WhisperHandle: releasing whisper model");
    }
}

type RecognizerFactory = Box<dyn Fn() -> Result<Box<dyn SpeechRecognizer>, AudioError> + Send + Sync>;

/// 首次使用时初始化，之后只读共享，`shutdown` 后拒绝调用
pub struct LazyRecognizer {
    factory: RecognizerFactory,
    cell: OnceCell<Box<dyn SpeechRecognizer>>,
    shut_down: AtomicBool,
}

impl LazyRecognizer {
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> Result<Box<dyn SpeechRecognizer>, AudioError> + Send + Sync + 'static,
    {
        Self {
            factory: Box::new(factory),
            cell: OnceCell::new(),
            shut_down: AtomicBool::new(false),
        }
    }

    /// 显式初始化；已初始化时直接返回
    pub fn init(&self) -> Result<&dyn SpeechRecognizer, AudioError> {
        if self.shut_down.load(Ordering::SeqCst) {
            return Err(AudioError::NotInitialized);
        }
        self.cell
            .get_or_try_init(|| {
                info!("🎙️ Initializing speech recognizer");
                (self.factory)()
            })
            .map(|r| &**r)
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.get().is_some()
    }

    pub fn shutdown(&mut self) {
        self.shut_down.store(true, Ordering::SeqCst);
        if self.cell.take().is_some() {
            info!("🗑️ Speech recognizer released");
        }
    }
}

impl SpeechRecognizer for LazyRecognizer {
    fn transcribe(&self, clip: &Path) -> Result<String, AudioError> {
        self.init()?.transcribe(clip)
    }

    fn transcribe_batch(&self, clips: &[PathBuf]) -> Vec<Result<String, AudioError>> {
        match self.init() {
            Ok(recognizer) => recognizer.transcribe_batch(clips),
            Err(AudioError::NotInitialized) => {
                clips.iter().map(|_| Err(AudioError::NotInitialized)).collect()
            }
            Err(e) => {
                let reason = match e {
                    AudioError::ModelLoadFailed(reason) => reason,
                    other => other.to_string(),
                };
                clips
                    .iter()
                    .map(|_| Err(AudioError::ModelLoadFailed(reason.clone())))
                    .collect()
            }
        }
    }
}
