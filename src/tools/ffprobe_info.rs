use crate::error::PipelineError;
use crate::tools::MediaInfo;
use serde::Deserialize;
use std::path::Path;
use std::process::Command;

#[derive(Deserialize)]
struct FfprobeOutput {
    format: Option<FormatInfo>,
    streams: Option<Vec<StreamInfo>>,
}

#[derive(Deserialize)]
struct FormatInfo {
    duration: Option<String>,
    tags: Option<FormatTags>,
}

#[derive(Deserialize)]
struct FormatTags {
    comment: Option<String>,
}

#[derive(Deserialize)]
struct StreamInfo {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    avg_frame_rate: Option<String>,
    r_frame_rate: Option<String>,
    nb_frames: Option<String>,
    duration: Option<String>,
}

/// 使用 ffprobe 取得幀率、幀數與尺寸（只讀容器資訊，不解碼影格）
pub fn probe_media_info(path: &Path) -> Result<MediaInfo, PipelineError> {
    let output = Command::new("ffprobe")
        .args(ffprobe_args(path))
        .output()
        .map_err(|e| PipelineError::unreadable(path, format!("無法執行 ffprobe: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(PipelineError::unreadable(
            path,
            format!("ffprobe 執行失敗: {}", stderr.trim()),
        ));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    parse_ffprobe_output(path, &stdout)
}

/// 與解碼器相同使用 `file:` 前綴，檔名中的 `:` 或開頭的 `-` 不會被當成協定或選項
#[must_use]
pub fn ffprobe_args(path: &Path) -> Vec<String> {
    vec![
        "-v".to_string(),
        "quiet".to_string(),
        "-print_format".to_string(),
        "json".to_string(),
        "-show_format".to_string(),
        "-show_streams".to_string(),
        "-select_streams".to_string(),
        "v:0".to_string(),
        format!("file:{}", path.display()),
    ]
}

/// 解析 ffprobe 的 JSON 輸出
///
/// 幀率優先使用 `avg_frame_rate`，其次 `r_frame_rate`；
/// 幀數優先使用 `nb_frames`，沒有時以長度乘以幀率估算
pub fn parse_ffprobe_output(path: &Path, json: &str) -> Result<MediaInfo, PipelineError> {
    let probe: FfprobeOutput = serde_json::from_str(json)
        .map_err(|e| PipelineError::unreadable(path, format!("無法解析 ffprobe 輸出: {e}")))?;

    let video_stream = probe
        .streams
        .as_ref()
        .and_then(|streams| {
            streams
                .iter()
                .find(|s| s.codec_type.as_deref() == Some("video"))
        })
        .ok_or_else(|| PipelineError::unreadable(path, "找不到視訊串流"))?;

    let width = video_stream
        .width
        .ok_or_else(|| PipelineError::unreadable(path, "無法取得影片寬度"))?;
    let height = video_stream
        .height
        .ok_or_else(|| PipelineError::unreadable(path, "無法取得影片高度"))?;

    let frame_rate = video_stream
        .avg_frame_rate
        .as_deref()
        .and_then(parse_frame_rate)
        .or_else(|| video_stream.r_frame_rate.as_deref().and_then(parse_frame_rate))
        .unwrap_or(0.0);

    let frame_count = video_stream
        .nb_frames
        .as_deref()
        .and_then(|n| n.parse::<u64>().ok())
        .or_else(|| {
            let duration = video_stream
                .duration
                .as_ref()
                .or(probe.format.as_ref().and_then(|f| f.duration.as_ref()))
                .and_then(|d| d.parse::<f64>().ok())?;
            (frame_rate > 0.0).then(|| (duration * frame_rate).round() as u64)
        })
        .unwrap_or(0);

    let comment = probe
        .format
        .as_ref()
        .and_then(|f| f.tags.as_ref())
        .and_then(|t| t.comment.clone());

    Ok(MediaInfo {
        frame_rate,
        frame_count,
        width,
        height,
        comment,
    })
}

/// 解析幀率字串（例如 "30/1" 或 "30000/1001"）
fn parse_frame_rate(rate: &str) -> Option<f64> {
    if let Some((num_str, den_str)) = rate.split_once('/') {
        let num: f64 = num_str.parse().ok()?;
        let den: f64 = den_str.parse().ok()?;
        if den > 0.0 && num > 0.0 {
            return Some(num / den);
        }
        return None;
    }
    rate.parse::<f64>().ok().filter(|r| *r > 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "streams": [
            {
                "codec_type": "video",
                "width": 1920,
                "height": 1080,
                "avg_frame_rate": "30/1",
                "r_frame_rate": "30/1",
                "nb_frames": "4500",
                "duration": "150.000000"
            }
        ],
        "format": { "duration": "150.021000" }
    }"#;

    #[test]
    fn test_ffprobe_args_use_file_protocol() {
        let args = ffprobe_args(Path::new("/videos/cam:1.mp4"));
        assert_eq!(args.last().map(String::as_str), Some("file:/videos/cam:1.mp4"));

        let args = ffprobe_args(Path::new("-clip.mp4"));
        assert_eq!(args.last().map(String::as_str), Some("file:-clip.mp4"));
    }

    #[test]
    fn test_parse_frame_rate_fraction() {
        assert!((parse_frame_rate("30/1").unwrap() - 30.0).abs() < 0.01);
        assert!((parse_frame_rate("30000/1001").unwrap() - 29.97).abs() < 0.01);
    }

    #[test]
    fn test_parse_frame_rate_invalid() {
        assert!(parse_frame_rate("invalid").is_none());
        assert!(parse_frame_rate("30/0").is_none());
        assert!(parse_frame_rate("0/0").is_none());
    }

    #[test]
    fn test_parse_sample_output() {
        let info = parse_ffprobe_output(Path::new("a.mp4"), SAMPLE).unwrap();
        assert_eq!(info.width, 1920);
        assert_eq!(info.height, 1080);
        assert_eq!(info.frame_count, 4500);
        assert!((info.frame_rate - 30.0).abs() < 1e-9);
        assert_eq!(info.comment, None);
    }

    #[test]
    fn test_parse_comment_tag() {
        let json = r#"{
            "streams": [
                { "codec_type": "video", "width": 2, "height": 2,
                  "avg_frame_rate": "30/1", "nb_frames": "900" }
            ],
            "format": { "duration": "30.0", "tags": { "comment": "source=a.mp4" } }
        }"#;
        let info = parse_ffprobe_output(Path::new("speedup_a.mp4"), json).unwrap();
        assert_eq!(info.comment.as_deref(), Some("source=a.mp4"));
    }

    #[test]
    fn test_frame_count_estimated_from_duration() {
        let json = r#"{
            "streams": [
                { "codec_type": "video", "width": 640, "height": 360,
                  "avg_frame_rate": "0/0", "r_frame_rate": "25/1" }
            ],
            "format": { "duration": "10.0" }
        }"#;
        let info = parse_ffprobe_output(Path::new("a.mp4"), json).unwrap();
        assert_eq!(info.frame_count, 250);
        assert!((info.frame_rate - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_frame_rate_yields_zero() {
        let json = r#"{
            "streams": [
                { "codec_type": "video", "width": 640, "height": 360, "avg_frame_rate": "0/0" }
            ]
        }"#;
        let info = parse_ffprobe_output(Path::new("a.mp4"), json).unwrap();
        assert!(info.frame_rate.abs() < f64::EPSILON);
        assert_eq!(info.frame_count, 0);
    }

    #[test]
    fn test_no_video_stream() {
        let json = r#"{ "streams": [ { "codec_type": "audio" } ] }"#;
        let err = parse_ffprobe_output(Path::new("a.mp4"), json).unwrap_err();
        assert!(matches!(err, PipelineError::UnreadableMedia { .. }));
    }
}
