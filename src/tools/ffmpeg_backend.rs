//! 以 ffmpeg/ffprobe 子程序實作媒體邊界
//!
//! 解碼端讀取 ffmpeg 輸出的 rawvideo，編碼端把 rawvideo 寫進 ffmpeg 的 stdin。
//! 子程序與管道都由 handle 擁有，`Drop` 時一定會等待（必要時終止）子程序。

use crate::error::PipelineError;
use crate::tools::ffmpeg_command::{DecodeCommand, EncodeCommand};
use crate::tools::ffprobe_info::probe_media_info;
use crate::tools::{EncodeSettings, Frame, FrameSink, FrameSource, MediaBackend, MediaInfo};
use log::{debug, warn};
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Stdio};
use std::thread::{self, JoinHandle};

#[derive(Debug, Default, Clone, Copy)]
pub struct FfmpegBackend;

impl FfmpegBackend {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl MediaBackend for FfmpegBackend {
    fn probe(&self, path: &Path) -> Result<MediaInfo, PipelineError> {
        probe_media_info(path)
    }

    fn open_decoder(&self, path: &Path) -> Result<Box<dyn FrameSource>, PipelineError> {
        let info = probe_media_info(path)?;
        Ok(Box::new(FfmpegDecoder::spawn(path, info)?))
    }

    fn open_encoder(
        &self,
        path: &Path,
        settings: &EncodeSettings,
    ) -> Result<Box<dyn FrameSink>, PipelineError> {
        Ok(Box::new(FfmpegEncoder::spawn(path, settings)?))
    }
}

/// 在背景收集 stderr，避免管道塞滿造成子程序卡住
fn spawn_stderr_collector(child: &mut Child) -> Option<JoinHandle<String>> {
    let stderr = child.stderr.take()?;
    Some(thread::spawn(move || {
        let mut buffer = String::new();
        let _ = BufReader::new(stderr).read_to_string(&mut buffer);
        buffer
    }))
}

fn collect_stderr(handle: Option<JoinHandle<String>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "未知錯誤".to_string())
}

pub struct FfmpegDecoder {
    path: PathBuf,
    info: MediaInfo,
    frame_len: usize,
    child: Child,
    stdout: BufReader<ChildStdout>,
    stderr: Option<JoinHandle<String>>,
    finished: bool,
}

impl FfmpegDecoder {
    fn spawn(path: &Path, info: MediaInfo) -> Result<Self, PipelineError> {
        let mut child = DecodeCommand::new(path)
            .build_command()
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| PipelineError::unreadable(path, format!("無法啟動 ffmpeg 解碼: {e}")))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| PipelineError::unreadable(path, "無法取得 ffmpeg stdout"))?;
        let stderr = spawn_stderr_collector(&mut child);

        debug!("啟動解碼 [{}]: {}", child.id(), path.display());

        Ok(Self {
            path: path.to_path_buf(),
            frame_len: Frame::byte_len(info.width, info.height),
            info,
            child,
            stdout: BufReader::new(stdout),
            stderr,
            finished: false,
        })
    }

    /// 讀滿緩衝區，回傳實際讀到的位元組數（小於長度代表串流結束）
    fn fill(&mut self, buffer: &mut [u8]) -> std::io::Result<usize> {
        let mut filled = 0;
        while filled < buffer.len() {
            match self.stdout.read(&mut buffer[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(filled)
    }

    fn finish_stream(&mut self) -> Result<(), PipelineError> {
        self.finished = true;
        let status = self
            .child
            .wait()
            .map_err(|e| PipelineError::decode(&self.path, format!("無法等待 ffmpeg: {e}")))?;
        if status.success() {
            Ok(())
        } else {
            Err(PipelineError::decode(
                &self.path,
                collect_stderr(self.stderr.take()),
            ))
        }
    }
}

impl FrameSource for FfmpegDecoder {
    fn info(&self) -> &MediaInfo {
        &self.info
    }

    fn read_frame(&mut self) -> Result<Option<Frame>, PipelineError> {
        if self.finished {
            return Ok(None);
        }

        let mut data = vec![0u8; self.frame_len];
        let read = self
            .fill(&mut data)
            .map_err(|e| PipelineError::decode(&self.path, e))?;

        if read == 0 {
            self.finish_stream()?;
            return Ok(None);
        }
        if read < self.frame_len {
            self.finish_stream()?;
            return Err(PipelineError::decode(
                &self.path,
                format!("影格資料不完整: {read}/{} bytes", self.frame_len),
            ));
        }

        Ok(Some(Frame::new(self.info.width, self.info.height, data)))
    }
}

impl Drop for FfmpegDecoder {
    fn drop(&mut self) {
        if !self.finished {
            // 提早結束時子程序可能還在輸出
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

pub struct FfmpegEncoder {
    path: PathBuf,
    frame_len: usize,
    child: Option<Child>,
    stdin: Option<BufWriter<ChildStdin>>,
    stderr: Option<JoinHandle<String>>,
}

impl FfmpegEncoder {
    fn spawn(path: &Path, settings: &EncodeSettings) -> Result<Self, PipelineError> {
        let mut child = EncodeCommand::new(
            path,
            settings.width,
            settings.height,
            settings.frame_rate,
        )
        .with_comment(&settings.comment)
        .build_command()
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| PipelineError::encoder_open(path, format!("無法啟動 ffmpeg 編碼: {e}")))?;

        let Some(stdin) = child.stdin.take() else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(PipelineError::encoder_open(path, "無法取得 ffmpeg stdin"));
        };
        let stderr = spawn_stderr_collector(&mut child);

        debug!("啟動編碼 [{}]: {}", child.id(), path.display());

        Ok(Self {
            path: path.to_path_buf(),
            frame_len: Frame::byte_len(settings.width, settings.height),
            child: Some(child),
            stdin: Some(BufWriter::with_capacity(8 * 1024 * 1024, stdin)),
            stderr,
        })
    }

    fn close(&mut self) -> Result<(), PipelineError> {
        let flushed = match self.stdin.take() {
            Some(mut stdin) => stdin.flush(),
            None => Ok(()),
        };

        let Some(mut child) = self.child.take() else {
            return Ok(());
        };
        let status = child.wait().map_err(|e| {
            PipelineError::destination_write(&self.path, format!("無法等待 ffmpeg: {e}"))
        })?;

        if !status.success() {
            return Err(PipelineError::destination_write(
                &self.path,
                collect_stderr(self.stderr.take()),
            ));
        }
        flushed.map_err(|e| PipelineError::destination_write(&self.path, e))
    }
}

impl FrameSink for FfmpegEncoder {
    fn write_frame(&mut self, frame: &Frame) -> Result<(), PipelineError> {
        if frame.data.len() != self.frame_len {
            return Err(PipelineError::destination_write(
                &self.path,
                format!("影格大小不符: {}/{} bytes", frame.data.len(), self.frame_len),
            ));
        }
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| PipelineError::destination_write(&self.path, "編碼器已關閉"))?;
        stdin
            .write_all(&frame.data)
            .map_err(|e| PipelineError::destination_write(&self.path, e))
    }

    fn finish(mut self: Box<Self>) -> Result<(), PipelineError> {
        self.close()
    }
}

impl Drop for FfmpegEncoder {
    fn drop(&mut self) {
        if self.child.is_none() {
            return;
        }
        if let Err(e) = self.close() {
            warn!("關閉編碼器失敗: {e}");
        }
    }
}
