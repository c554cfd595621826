use super::accumulator::FrameAccumulator;
use crate::error::PipelineError;
use crate::tools::{EncodeSettings, FrameSink, MediaBackend, MediaInfo, VideoAsset};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::time::{Instant, UNIX_EPOCH};

/// 單一縮時工作，建立後只交給編碼器使用一次
#[derive(Debug, Clone, PartialEq)]
pub struct TimelapseJob {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub speed_up_factor: u32,
    pub output_frame_rate: f64,
    pub width: u32,
    pub height: u32,
    /// 寫進輸出 comment 標籤，用來辨認既有輸出是否來自同一個來源
    pub source_tag: String,
}

/// 檔名、大小與拍攝時間（秒）組成的來源識別
#[must_use]
pub fn source_tag(asset: &VideoAsset) -> String {
    let name = asset
        .path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let captured = asset
        .captured_at
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    format!("source={name};size={};captured={captured}", asset.size)
}

impl TimelapseJob {
    pub fn new(
        asset: &VideoAsset,
        destination: PathBuf,
        speed_up_factor: u32,
        output_frame_rate: f64,
    ) -> Result<Self, PipelineError> {
        if speed_up_factor == 0 {
            return Err(PipelineError::configuration(format!(
                "{} 的加速倍率不可為 0",
                asset.path.display()
            )));
        }
        if !output_frame_rate.is_finite() || output_frame_rate <= 0.0 {
            return Err(PipelineError::configuration(format!(
                "輸出幀率必須大於 0: {output_frame_rate}"
            )));
        }

        Ok(Self {
            source: asset.path.clone(),
            destination,
            speed_up_factor,
            output_frame_rate,
            width: asset.width,
            height: asset.height,
            source_tag: source_tag(asset),
        })
    }

    #[must_use]
    pub fn encode_settings(&self) -> EncodeSettings {
        EncodeSettings {
            width: self.width,
            height: self.height,
            frame_rate: self.output_frame_rate,
            comment: self.source_tag.clone(),
        }
    }

    /// `ceil(frame_count / speed_up_factor)`
    #[must_use]
    pub const fn expected_output_frames(&self, frame_count: u64) -> u64 {
        frame_count.div_ceil(self.speed_up_factor as u64)
    }

    /// 既有檔案是否為這個來源完整編碼的結果：來源識別、尺寸與幀數都要相同
    #[must_use]
    pub fn matches_output(&self, info: &MediaInfo, source_frame_count: u64) -> bool {
        info.comment.as_deref() == Some(self.source_tag.as_str())
            && info.width == self.width
            && info.height == self.height
            && info.frame_count == self.expected_output_frames(source_frame_count)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncodeSummary {
    pub frames_read: u64,
    pub frames_written: u64,
    /// 中途解碼失敗但已輸出部分結果時的說明
    pub warning: Option<String>,
}

pub struct TimelapseEncoder<'a> {
    backend: &'a dyn MediaBackend,
}

impl<'a> TimelapseEncoder<'a> {
    #[must_use]
    pub const fn new(backend: &'a dyn MediaBackend) -> Self {
        Self { backend }
    }

    /// 依 `job` 將來源平均成縮時影片並寫到 `output`
    ///
    /// `output` 通常是目的地旁的暫存檔，由呼叫端決定何時改名到最終位置。
    /// 來源與輸出 handle 在任何返回路徑上都會被釋放。
    pub fn encode(
        &self,
        job: &TimelapseJob,
        output: &Path,
    ) -> Result<EncodeSummary, PipelineError> {
        let started = Instant::now();

        let mut source = self
            .backend
            .open_decoder(&job.source)
            .map_err(|e| as_open_error(&job.source, e))?;
        let mut sink = self
            .backend
            .open_encoder(output, &job.encode_settings())
            .map_err(|e| as_open_error(output, e))?;

        let expected = job.expected_output_frames(source.info().frame_count);
        debug!(
            "開始縮時 {} ({}x, {}x{})，預計輸出約 {} 幀",
            job.source.display(),
            job.speed_up_factor,
            job.width,
            job.height,
            expected
        );

        let mut accumulator = FrameAccumulator::new(job.width, job.height);
        let mut summary = EncodeSummary::default();
        let mut decode_error = None;

        loop {
            let frame = match source.read_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(e) => {
                    decode_error = Some(e);
                    break;
                }
            };
            if let Err(e) = accumulator.add(&job.source, &frame) {
                decode_error = Some(e);
                break;
            }
            summary.frames_read += 1;

            if accumulator.count() >= job.speed_up_factor {
                emit(&mut accumulator, sink.as_mut(), output, &mut summary)?;
            }
        }
        drop(source);

        if let Some(e) = decode_error {
            if summary.frames_read == 0 {
                // 沒有任何影格可保留，整個工作失敗
                return Err(e);
            }
            warn!(
                "{} 在第 {} 幀後解碼失敗，保留已處理的部分: {}",
                job.source.display(),
                summary.frames_read,
                e
            );
            summary.warning = Some(e.to_string());
        }

        // 最後一批不足倍率時仍輸出一幀
        emit(&mut accumulator, sink.as_mut(), output, &mut summary)?;
        sink.finish().map_err(|e| as_write_error(output, e))?;

        let elapsed = started.elapsed().as_secs_f64();
        let rate = if elapsed > 0.0 {
            summary.frames_read as f64 / elapsed
        } else {
            0.0
        };
        info!(
            "縮時完成 {}: {} 幀 -> {} 幀，{:.2} 秒 ({:.1} fps)",
            job.source.display(),
            summary.frames_read,
            summary.frames_written,
            elapsed,
            rate
        );

        Ok(summary)
    }
}

fn emit(
    accumulator: &mut FrameAccumulator,
    sink: &mut dyn FrameSink,
    output: &Path,
    summary: &mut EncodeSummary,
) -> Result<(), PipelineError> {
    let Some(mean) = accumulator.take_mean() else {
        return Ok(());
    };
    sink.write_frame(&mean)
        .map_err(|e| as_write_error(output, e))?;
    summary.frames_written += 1;
    Ok(())
}

fn as_open_error(path: &Path, error: PipelineError) -> PipelineError {
    match error {
        PipelineError::EncoderOpen { .. } => error,
        other => PipelineError::encoder_open(path, other),
    }
}

fn as_write_error(path: &Path, error: PipelineError) -> PipelineError {
    match error {
        PipelineError::DestinationWrite { .. } => error,
        other => PipelineError::destination_write(path, other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{Frame, FrameSource};
    use std::sync::{Arc, Mutex};
    use std::time::SystemTime;

    /// 以記憶體中的影格模擬解碼，輸出收集到共用的 Vec
    struct FakeBackend {
        frames: Vec<Frame>,
        fail_after: Option<usize>,
        fail_encoder: bool,
        written: Arc<Mutex<Vec<Frame>>>,
        finished: Arc<Mutex<bool>>,
    }

    impl FakeBackend {
        fn new(frames: Vec<Frame>) -> Self {
            Self {
                frames,
                fail_after: None,
                fail_encoder: false,
                written: Arc::default(),
                finished: Arc::default(),
            }
        }

        fn written(&self) -> Vec<Frame> {
            self.written.lock().unwrap().clone()
        }
    }

    struct FakeSource {
        info: MediaInfo,
        frames: std::vec::IntoIter<Frame>,
        remaining_before_failure: Option<usize>,
    }

    impl FrameSource for FakeSource {
        fn info(&self) -> &MediaInfo {
            &self.info
        }

        fn read_frame(&mut self) -> Result<Option<Frame>, PipelineError> {
            if let Some(remaining) = self.remaining_before_failure.as_mut() {
                if *remaining == 0 {
                    return Err(PipelineError::decode(Path::new("fake"), "corrupt packet"));
                }
                *remaining -= 1;
            }
            Ok(self.frames.next())
        }
    }

    struct FakeSink {
        written: Arc<Mutex<Vec<Frame>>>,
        finished: Arc<Mutex<bool>>,
    }

    impl FrameSink for FakeSink {
        fn write_frame(&mut self, frame: &Frame) -> Result<(), PipelineError> {
            self.written.lock().unwrap().push(frame.clone());
            Ok(())
        }

        fn finish(self: Box<Self>) -> Result<(), PipelineError> {
            *self.finished.lock().unwrap() = true;
            Ok(())
        }
    }

    impl MediaBackend for FakeBackend {
        fn probe(&self, _path: &Path) -> Result<MediaInfo, PipelineError> {
            Ok(MediaInfo {
                frame_rate: 30.0,
                frame_count: self.frames.len() as u64,
                width: 2,
                height: 2,
                comment: None,
            })
        }

        fn open_decoder(&self, path: &Path) -> Result<Box<dyn FrameSource>, PipelineError> {
            Ok(Box::new(FakeSource {
                info: self.probe(path)?,
                frames: self.frames.clone().into_iter(),
                remaining_before_failure: self.fail_after,
            }))
        }

        fn open_encoder(
            &self,
            path: &Path,
            _settings: &EncodeSettings,
        ) -> Result<Box<dyn FrameSink>, PipelineError> {
            if self.fail_encoder {
                return Err(PipelineError::unreadable(path, "codec unavailable"));
            }
            Ok(Box::new(FakeSink {
                written: Arc::clone(&self.written),
                finished: Arc::clone(&self.finished),
            }))
        }
    }

    fn asset() -> VideoAsset {
        VideoAsset {
            path: PathBuf::from("/videos/a.mp4"),
            captured_at: SystemTime::UNIX_EPOCH,
            frame_rate: 30.0,
            frame_count: 0,
            width: 2,
            height: 2,
            size: 0,
        }
    }

    fn job(factor: u32) -> TimelapseJob {
        TimelapseJob::new(&asset(), PathBuf::from("/archive/speedup_a.mp4"), factor, 30.0)
            .unwrap()
    }

    fn frames(values: &[u8]) -> Vec<Frame> {
        values.iter().map(|&v| Frame::filled(2, 2, v)).collect()
    }

    fn run(backend: &FakeBackend, factor: u32) -> Result<EncodeSummary, PipelineError> {
        TimelapseEncoder::new(backend).encode(&job(factor), Path::new("/archive/out.partial"))
    }

    #[test]
    fn test_constant_input_stays_constant() {
        let backend = FakeBackend::new(frames(&[100; 12]));
        let summary = run(&backend, 4).unwrap();

        assert_eq!(summary.frames_written, 3);
        assert!(
            backend
                .written()
                .iter()
                .all(|f| f.data.iter().all(|&v| v == 100))
        );
    }

    #[test]
    fn test_truncated_average() {
        let backend = FakeBackend::new(frames(&[10, 11]));
        run(&backend, 2).unwrap();

        let written = backend.written();
        assert_eq!(written.len(), 1);
        assert!(written[0].data.iter().all(|&v| v == 10));
    }

    #[test]
    fn test_partial_batch_is_flushed() {
        let backend = FakeBackend::new(frames(&[3, 3, 3, 6, 6, 6, 9]));
        let summary = run(&backend, 3).unwrap();

        assert_eq!(summary.frames_read, 7);
        assert_eq!(summary.frames_written, 3);
        let written = backend.written();
        assert!(written[2].data.iter().all(|&v| v == 9));
        assert!(*backend.finished.lock().unwrap());
    }

    #[test]
    fn test_output_count_is_ceiling() {
        for (input, factor) in [(0usize, 1u32), (1, 1), (5, 1), (9, 2), (10, 3), (12, 4), (13, 5)] {
            let backend = FakeBackend::new(frames(&vec![1; input]));
            let summary = run(&backend, factor).unwrap();
            let expected = job(factor).expected_output_frames(input as u64);
            assert_eq!(summary.frames_written, expected, "{input} 幀 / {factor}x");
            assert_eq!(backend.written().len() as u64, expected);
        }
    }

    #[test]
    fn test_factor_equal_to_frame_count_gives_one_frame() {
        let backend = FakeBackend::new(frames(&[0, 50, 100, 250]));
        run(&backend, 4).unwrap();

        let written = backend.written();
        assert_eq!(written.len(), 1);
        assert!(written[0].data.iter().all(|&v| v == 100));
    }

    #[test]
    fn test_zero_frames_is_valid_empty_output() {
        let backend = FakeBackend::new(Vec::new());
        let summary = run(&backend, 5).unwrap();

        assert_eq!(summary, EncodeSummary::default());
        assert!(*backend.finished.lock().unwrap());
    }

    #[test]
    fn test_mid_stream_decode_error_flushes_partial() {
        let mut backend = FakeBackend::new(frames(&[20; 10]));
        backend.fail_after = Some(5);
        let summary = run(&backend, 3).unwrap();

        assert_eq!(summary.frames_read, 5);
        assert_eq!(summary.frames_written, 2);
        assert!(summary.warning.is_some());
        assert!(*backend.finished.lock().unwrap());
    }

    #[test]
    fn test_immediate_decode_error_fails_job() {
        let mut backend = FakeBackend::new(frames(&[20; 10]));
        backend.fail_after = Some(0);
        let err = run(&backend, 3).unwrap_err();

        assert!(matches!(err, PipelineError::Decode { .. }));
        assert!(backend.written().is_empty());
    }

    #[test]
    fn test_encoder_open_failure_is_encoder_open_error() {
        let mut backend = FakeBackend::new(frames(&[1; 3]));
        backend.fail_encoder = true;
        let err = run(&backend, 2).unwrap_err();

        assert!(matches!(err, PipelineError::EncoderOpen { .. }));
    }

    #[test]
    fn test_zero_factor_rejected() {
        let err = TimelapseJob::new(&asset(), PathBuf::from("/out.mp4"), 0, 30.0).unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(_)));
    }

    #[test]
    fn test_matches_only_complete_output_of_same_source() {
        let job = job(5);
        let info = |frame_count, width, comment: &str| MediaInfo {
            frame_rate: 30.0,
            frame_count,
            width,
            height: 2,
            comment: Some(comment.to_string()),
        };
        let tag = job.source_tag.clone();

        assert!(job.matches_output(&info(900, 2, &tag), 4500));
        assert!(!job.matches_output(&info(21, 2, &tag), 4500));
        assert!(!job.matches_output(&info(900, 4, &tag), 4500));
        assert!(!job.matches_output(&info(900, 2, "source=other.mp4"), 4500));
    }

    #[test]
    fn test_source_tag_distinguishes_same_name() {
        let first = asset();
        let second = VideoAsset {
            path: PathBuf::from("/cardB/a.mp4"),
            size: 99,
            ..asset()
        };
        assert_eq!(source_tag(&first), "source=a.mp4;size=0;captured=0");
        assert_ne!(source_tag(&first), source_tag(&second));
        assert_eq!(job(5).encode_settings().comment, source_tag(&first));
    }

    #[test]
    fn test_job_copies_dimensions() {
        let job = job(5);
        assert_eq!((job.width, job.height), (2, 2));
        assert_eq!(job.source, PathBuf::from("/videos/a.mp4"));
    }
}
