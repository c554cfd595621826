//! 不需要 ffmpeg 的合成媒體後端
//!
//! 來源檔內容是一份 `key=value` 配方，描述幀率、幀數與像素值；
//! 編碼輸出是一行 `comment=...` 標頭加上原始影格位元組，
//! 讀取輸出檔時視為 30 fps、幀數由影格位元組數換算。

#![allow(dead_code)]

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use timelapse_archiver::PipelineError;
use timelapse_archiver::component::archive_router::date_folder_name;
use timelapse_archiver::config::RunConfig;
use timelapse_archiver::tools::{
    EncodeSettings, Frame, FrameSink, FrameSource, MediaBackend, MediaInfo,
};

pub const WIDTH: u32 = 2;
pub const HEIGHT: u32 = 2;

#[derive(Debug, Clone)]
pub struct Recipe {
    pub fps: f64,
    pub frames: u64,
    pub value: u8,
    pub fail_after: Option<u64>,
    pub panic: bool,
}

impl Recipe {
    pub fn new(fps: f64, frames: u64) -> Self {
        Self {
            fps,
            frames,
            value: 100,
            fail_after: None,
            panic: false,
        }
    }

    /// 指定秒數、30 fps 的影片
    pub fn seconds(seconds: u64) -> Self {
        Self::new(30.0, seconds * 30)
    }

    pub fn failing_after(mut self, frames: u64) -> Self {
        self.fail_after = Some(frames);
        self
    }

    pub fn panicking(mut self) -> Self {
        self.panic = true;
        self
    }

    pub fn write(&self, path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        let mut text = format!(
            "fps={}\nframes={}\nvalue={}\n",
            self.fps, self.frames, self.value
        );
        if let Some(n) = self.fail_after {
            text.push_str(&format!("fail_after={n}\n"));
        }
        if self.panic {
            text.push_str("panic=true\n");
        }
        fs::write(path, text).unwrap();
    }

    fn read(path: &Path) -> Result<Self, PipelineError> {
        let text = fs::read_to_string(path).map_err(|e| PipelineError::unreadable(path, e))?;
        let mut recipe = Self::new(0.0, 0);
        let mut seen_fps = false;

        for line in text.lines() {
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            match key {
                "fps" => {
                    recipe.fps = parse(path, key, value)?;
                    seen_fps = true;
                }
                "frames" => recipe.frames = parse(path, key, value)?,
                "value" => recipe.value = parse(path, key, value)?,
                "fail_after" => recipe.fail_after = Some(parse(path, key, value)?),
                "panic" => recipe.panic = value == "true",
                _ => {}
            }
        }

        if !seen_fps {
            return Err(PipelineError::unreadable(path, "not a video"));
        }
        Ok(recipe)
    }
}

fn parse<T: FromStr>(path: &Path, key: &str, value: &str) -> Result<T, PipelineError> {
    value
        .trim()
        .parse()
        .map_err(|_| PipelineError::unreadable(path, format!("bad value for {key}")))
}

pub struct SyntheticBackend;

impl MediaBackend for SyntheticBackend {
    fn probe(&self, path: &Path) -> Result<MediaInfo, PipelineError> {
        if let Some((comment, frames)) = read_encoded(path) {
            return Ok(MediaInfo {
                frame_rate: 30.0,
                frame_count: (frames.len() / Frame::byte_len(WIDTH, HEIGHT)) as u64,
                width: WIDTH,
                height: HEIGHT,
                comment: Some(comment),
            });
        }
        let recipe = Recipe::read(path)?;
        Ok(MediaInfo {
            frame_rate: recipe.fps,
            frame_count: recipe.frames,
            width: WIDTH,
            height: HEIGHT,
            comment: None,
        })
    }

    fn open_decoder(&self, path: &Path) -> Result<Box<dyn FrameSource>, PipelineError> {
        let info = self.probe(path)?;
        Ok(Box::new(RecipeSource {
            path: path.to_path_buf(),
            info,
            recipe: Recipe::read(path)?,
            next: 0,
        }))
    }

    fn open_encoder(
        &self,
        path: &Path,
        settings: &EncodeSettings,
    ) -> Result<Box<dyn FrameSink>, PipelineError> {
        let file = File::create(path).map_err(|e| PipelineError::encoder_open(path, e))?;
        let mut writer = BufWriter::new(file);
        writeln!(writer, "comment={}", settings.comment)
            .map_err(|e| PipelineError::encoder_open(path, e))?;
        Ok(Box::new(RawSink {
            path: path.to_path_buf(),
            writer,
        }))
    }
}

/// 由 `RawSink` 寫出的檔案：`comment=` 標頭與影格位元組
fn read_encoded(path: &Path) -> Option<(String, Vec<u8>)> {
    let bytes = fs::read(path).ok()?;
    let rest = bytes.strip_prefix(b"comment=")?;
    let end = rest.iter().position(|&b| b == b'\n')?;
    let comment = String::from_utf8(rest[..end].to_vec()).ok()?;
    let frames = rest[end + 1..].to_vec();
    if frames.len() % Frame::byte_len(WIDTH, HEIGHT) != 0 {
        return None;
    }
    Some((comment, frames))
}

struct RecipeSource {
    path: PathBuf,
    info: MediaInfo,
    recipe: Recipe,
    next: u64,
}

impl FrameSource for RecipeSource {
    fn info(&self) -> &MediaInfo {
        &self.info
    }

    fn read_frame(&mut self) -> Result<Option<Frame>, PipelineError> {
        if self.recipe.panic {
            panic!("synthetic decoder crashed on {}", self.path.display());
        }
        if self.recipe.fail_after.is_some_and(|n| self.next >= n) {
            return Err(PipelineError::decode(&self.path, "corrupt packet"));
        }
        if self.next >= self.recipe.frames {
            return Ok(None);
        }
        self.next += 1;
        Ok(Some(Frame::filled(WIDTH, HEIGHT, self.recipe.value)))
    }
}

struct RawSink {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl FrameSink for RawSink {
    fn write_frame(&mut self, frame: &Frame) -> Result<(), PipelineError> {
        self.writer
            .write_all(&frame.data)
            .map_err(|e| PipelineError::destination_write(&self.path, e))
    }

    fn finish(mut self: Box<Self>) -> Result<(), PipelineError> {
        self.writer
            .flush()
            .map_err(|e| PipelineError::destination_write(&self.path, e))
    }
}

/// 輸出檔案中的影格數
pub fn output_frames(path: &Path) -> u64 {
    (output_samples(path).len() / Frame::byte_len(WIDTH, HEIGHT)) as u64
}

/// 輸出檔案中所有樣本值
pub fn output_samples(path: &Path) -> Vec<u8> {
    read_encoded(path).unwrap().1
}

/// 輸出檔案記錄的來源識別
pub fn output_comment(path: &Path) -> String {
    read_encoded(path).unwrap().0
}

/// 與掃描器相同的方式取得日期資料夾
pub fn date_folder_of(path: &Path) -> String {
    let metadata = fs::metadata(path).unwrap();
    let captured_at = metadata
        .created()
        .or_else(|_| metadata.modified())
        .unwrap();
    date_folder_name(captured_at)
}

pub fn config(scan_root: &Path, archive_root: &Path) -> RunConfig {
    RunConfig {
        scan_root_paths: vec![scan_root.to_path_buf()],
        archive_root_path: Some(archive_root.to_path_buf()),
        worker_pool_size: Some(2),
        ..RunConfig::default()
    }
}

/// 資料夾中的檔名（排序）
pub fn entries(dir: &Path) -> Vec<String> {
    let Ok(read_dir) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = read_dir
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
