use std::path::{Path, PathBuf};
use std::process::Command;

/// 管線使用的 rawvideo 像素格式，需與 `media::CHANNELS` 一致
pub const PIXEL_FORMAT: &str = "bgr24";

/// 將來源解碼為 rawvideo 寫到 stdout 的 ffmpeg 命令
pub struct DecodeCommand {
    source_path: PathBuf,
}

impl DecodeCommand {
    #[must_use]
    pub fn new(source_path: &Path) -> Self {
        Self {
            source_path: source_path.to_path_buf(),
        }
    }

    #[must_use]
    pub fn args(&self) -> Vec<String> {
        vec![
            "-hide_banner".to_string(),
            "-nostdin".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            // 輸出影格必須是 ffprobe 回報的編碼尺寸，不套用旋轉資訊
            "-noautorotate".to_string(),
            "-i".to_string(),
            format!("file:{}", self.source_path.display()),
            "-map".to_string(),
            "0:v:0".to_string(),
            "-an".to_string(),
            "-sn".to_string(),
            "-dn".to_string(),
            // 每個解碼後的影格原樣輸出，不補幀也不丟幀
            "-vsync".to_string(),
            "passthrough".to_string(),
            "-f".to_string(),
            "rawvideo".to_string(),
            "-pix_fmt".to_string(),
            PIXEL_FORMAT.to_string(),
            "pipe:1".to_string(),
        ]
    }

    #[must_use]
    pub fn build_command(&self) -> Command {
        let mut cmd = Command::new("ffmpeg");
        cmd.args(self.args());
        cmd
    }
}

/// 從 stdin 讀取 rawvideo 並寫出 MP4（mp4v）的 ffmpeg 命令
pub struct EncodeCommand {
    destination_path: PathBuf,
    width: u32,
    height: u32,
    frame_rate: f64,
    comment: Option<String>,
}

impl EncodeCommand {
    #[must_use]
    pub fn new(destination_path: &Path, width: u32, height: u32, frame_rate: f64) -> Self {
        Self {
            destination_path: destination_path.to_path_buf(),
            width,
            height,
            frame_rate,
            comment: None,
        }
    }

    #[must_use]
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    #[must_use]
    pub fn destination_path(&self) -> &Path {
        &self.destination_path
    }

    #[must_use]
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-y".to_string(),
            "-f".to_string(),
            "rawvideo".to_string(),
            "-pix_fmt".to_string(),
            PIXEL_FORMAT.to_string(),
            "-s".to_string(),
            format!("{}x{}", self.width, self.height),
            "-r".to_string(),
            format!("{}", self.frame_rate),
            "-i".to_string(),
            "pipe:0".to_string(),
            "-an".to_string(),
            "-c:v".to_string(),
            "mpeg4".to_string(),
            "-tag:v".to_string(),
            "mp4v".to_string(),
            "-q:v".to_string(),
            "2".to_string(),
            "-pix_fmt".to_string(),
            "yuv420p".to_string(),
        ];
        if let Some(comment) = &self.comment {
            args.push("-metadata".to_string());
            args.push(format!("comment={comment}"));
        }
        args.extend([
            // 輸出先寫到暫存檔名，無法從副檔名推斷容器
            "-f".to_string(),
            "mp4".to_string(),
            format!("file:{}", self.destination_path.display()),
        ]);
        args
    }

    #[must_use]
    pub fn build_command(&self) -> Command {
        let mut cmd = Command::new("ffmpeg");
        cmd.args(self.args());
        cmd
    }
}
