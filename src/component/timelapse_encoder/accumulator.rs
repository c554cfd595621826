use crate::error::PipelineError;
use crate::tools::Frame;
use std::path::Path;

/// 以浮點數累加連續影格，記憶體固定為一個影格大小
#[derive(Debug)]
pub struct FrameAccumulator {
    width: u32,
    height: u32,
    sums: Vec<f64>,
    count: u32,
}

impl FrameAccumulator {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            sums: vec![0.0; Frame::byte_len(width, height)],
            count: 0,
        }
    }

    /// 逐元素加入一個影格；尺寸不符視為解碼錯誤
    pub fn add(&mut self, source: &Path, frame: &Frame) -> Result<(), PipelineError> {
        if frame.width != self.width || frame.height != self.height || !frame.is_well_formed() {
            return Err(PipelineError::decode(
                source,
                format!(
                    "影格尺寸不符: {}x{} ({} bytes)，預期 {}x{}",
                    frame.width,
                    frame.height,
                    frame.data.len(),
                    self.width,
                    self.height
                ),
            ));
        }

        for (sum, &sample) in self.sums.iter_mut().zip(&frame.data) {
            *sum += f64::from(sample);
        }
        self.count += 1;
        Ok(())
    }

    #[must_use]
    pub const fn count(&self) -> u32 {
        self.count
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// 取出平均影格並歸零；平均值以截斷（非四捨五入）轉成 u8
    pub fn take_mean(&mut self) -> Option<Frame> {
        if self.is_empty() {
            return None;
        }

        let count = f64::from(self.count);
        let data = self.sums.iter().map(|sum| (sum / count) as u8).collect();

        self.sums.fill(0.0);
        self.count = 0;

        Some(Frame::new(self.width, self.height, data))
    }
}
