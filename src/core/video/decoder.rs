//! 视频解码 - ffmpeg 输出 rgb24 原始帧到管道

use log::{debug, info, warn};
use std::io::{BufReader, ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};

use super::error::VideoError;
use super::frame::Frame;
use super::info::VideoInfo;

/// 顺序帧来源。有限序列，不可重启
pub trait FrameSource {
    fn info(&self) -> &VideoInfo;

    /// `Ok(None)` 表示流结束
    fn next_frame(&mut self) -> Result<Option<Frame>, VideoError>;
}

/// 基于 ffmpeg 子进程的解码器
///
/// 子进程在 drop 时被终止并回收，正常结束与出错路径都一样
pub struct FfmpegDecoder {
    path: PathBuf,
    info: VideoInfo,
    child: Child,
    stdout: BufReader<ChildStdout>,
    frame_bytes: usize,
    frame_number: u64,
    finished: bool,
}

impl FfmpegDecoder {
    pub fn open(path: &Path) -> Result<Self, VideoError> {
        let info = VideoInfo::probe(path)?;
        Self::with_info(path, info)
    }

    pub fn with_info(path: &Path, info: VideoInfo) -> Result<Self, VideoError> {
        info!("🎬 Opening decoder for {}", path.display());

        let mut child = decode_command(path, &info)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| VideoError::Decode("ffmpeg stdout not captured".into()))?;

        Ok(Self {
            path: path.to_path_buf(),
            frame_bytes: Frame::byte_len(info.width, info.height),
            info,
            child,
            stdout: BufReader::with_capacity(1 << 20, stdout),
            frame_number: 0,
            finished: false,
        })
    }

    fn finish(&mut self) -> Result<(), VideoError> {
        self.finished = true;
        let status = self.child.wait()?;
        if !status.success() && self.frame_number == 0 {
            return Err(VideoError::Decode(format!(
                "ffmpeg exited with {} before producing a frame from {}",
                status,
                self.path.display()
            )));
        }
        if !status.success() {
            warn!("⚠️ ffmpeg exited with {} after {} frames", status, self.frame_number);
        }
        info!("✅ Decoded {} frames", self.frame_number);
        Ok(())
    }
}

/// 按探测到的帧率重定时输出，变帧率源也按 `info.fps` 补帧或丢帧，
/// 第 n 帧的 pts 因此恰为 `n / fps`
fn decode_command(path: &Path, info: &VideoInfo) -> Command {
    let mut command = Command::new("ffmpeg");
    command
        .arg("-v")
        .arg("error")
        .arg("-i")
        .arg(path)
        .arg("-map")
        .arg("0:v:0")
        .arg("-vf")
        .arg(format!("fps={}", info.fps))
        .arg("-fps_mode")
        .arg("cfr")
        .arg("-f")
        .arg("rawvideo")
        .arg("-pix_fmt")
        .arg("rgb24")
        .arg("-");
    command
}

impl FrameSource for FfmpegDecoder {
    fn info(&self) -> &VideoInfo {
        &self.info
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, VideoError> {
        if self.finished {
            return Ok(None);
        }

        let mut data = vec![0u8; self.frame_bytes];
        match self.stdout.read_exact(&mut data) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                self.finish()?;
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        }

        // 输出已固定为恒定帧率
        let pts = self.frame_number as f64 / self.info.fps;
        let frame = Frame::new(self.info.width, self.info.height, data, pts, self.frame_number);
        self.frame_number += 1;
        Ok(Some(frame))
    }
}

impl Drop for FfmpegDecoder {
    fn drop(&mut self) {
        if !self.finished {
            debug!("🗑️ FfmpegDecoder: stopping ffmpeg for {}", self.path.display());
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

/// 内存帧来源，测试与预解码场景使用
pub struct VecFrameSource {
    info: VideoInfo,
    frames: std::vec::IntoIter<Frame>,
}

impl VecFrameSource {
    pub fn new(info: VideoInfo, frames: Vec<Frame>) -> Self {
        Self {
            info,
            frames: frames.into_iter(),
        }
    }

    /// 生成 `duration` 秒、帧率 `fps` 的纯色帧序列
    pub fn synthetic(width: u32, height: u32, fps: f64, duration: f64) -> Self {
        let count = (duration * fps).round() as u64;
        let frames = (0..count)
            .map(|n| Frame::filled(width, height, (n % 251) as u8, n as f64 / fps, n))
            .collect();
        let info = VideoInfo {
            width,
            height,
            num_frames: count,
            fps,
            duration,
            bit_rate_kbps: 0.0,
            size_bytes: 0,
        };
        Self::new(info, frames)
    }
}

impl FrameSource for VecFrameSource {
    fn info(&self) -> &VideoInfo {
        &self.info
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, VideoError> {
        Ok(self.frames.next())
    }
}
