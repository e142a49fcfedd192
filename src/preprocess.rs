//! 图像预处理（灰度 + 二值化 + 放大）
//!
//! 独立于规范化管线的无状态过滤器，只为提高识别引擎的命中率。
//! 输入输出都是编码后的图像字节，对核心逻辑没有影响。

use std::io::Cursor;

use anyhow::{Context, Result};
use image::{imageops::FilterType, DynamicImage, ImageFormat};
use serde::{Deserialize, Serialize};

/// 预处理参数
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PreprocessParams {
    /// 二值化阈值（0-255，亮于该值的像素置白，其余置黑）
    pub threshold: u8,
    /// 放大倍数（1-4）
    pub scale: u32,
}

impl Default for PreprocessParams {
    fn default() -> Self {
        Self {
            threshold: 160,
            scale: 2,
        }
    }
}

/// 无状态的图像预处理器
#[derive(Debug, Clone, Default)]
pub struct Preprocessor {
    params: PreprocessParams,
}

impl Preprocessor {
    const MIN_SCALE: u32 = 1;
    const MAX_SCALE: u32 = 4;

    pub fn new(params: PreprocessParams) -> Result<Self> {
        if params.scale < Self::MIN_SCALE || params.scale > Self::MAX_SCALE {
            anyhow::bail!(
                "放大倍数 {} 超出允许范围 {}-{}",
                params.scale,
                Self::MIN_SCALE,
                Self::MAX_SCALE
            );
        }
        Ok(Self { params })
    }

    /// 对图像字节执行 灰度 → 二值化 → 放大，返回 PNG 编码结果
    pub fn apply(&self, image_bytes: &[u8]) -> Result<Vec<u8>> {
        let decoded =
            image::load_from_memory(image_bytes).context("无法解码输入图像")?;

        let mut gray = decoded.to_luma8();
        for pixel in gray.pixels_mut() {
            pixel.0[0] = if pixel.0[0] > self.params.threshold {
                255
            } else {
                0
            };
        }

        let (width, height) = gray.dimensions();
        let scaled = image::imageops::resize(
            &gray,
            width * self.params.scale,
            height * self.params.scale,
            // 二值图用最近邻放大，避免插值重新引入灰阶
            FilterType::Nearest,
        );

        let mut output = Cursor::new(Vec::new());
        DynamicImage::ImageLuma8(scaled)
            .write_to(&mut output, ImageFormat::Png)
            .context("无法编码预处理结果")?;

        tracing::debug!(
            "预处理完成: {}x{} → {}x{}",
            width,
            height,
            width * self.params.scale,
            height * self.params.scale
        );
        Ok(output.into_inner())
    }
}
