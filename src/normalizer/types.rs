//! 规范化结果类型定义

use serde::{Deserialize, Serialize};

/// 规范化选项
///
/// 按识别后端逐项开关，而不是全局生效
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct NormalizerOptions {
    /// 是否启用字符混淆纠正（阶段 2）
    ///
    /// 该阶段是全局盲替换，对正常数字内容有破坏性，
    /// 仅建议对本地启发式引擎的输出开启
    #[serde(default)]
    pub correct_confusions: bool,
}

/// 数学模式包裹方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MathWrap {
    /// 未检测到数学内容，原样输出
    Plain,
    /// 包裹为 `$$ ... $$` 展示公式
    Display,
    /// 多行方程组，包裹为 align 环境
    Align,
    /// 输入已带数学定界符，不再重复包裹
    Preserved,
}

/// 规范化结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizationResult {
    /// 规范化后的 LaTeX 文本
    pub text: String,
    /// 是否有改动
    pub changed: bool,
    /// 采用的包裹方式
    pub wrap: MathWrap,
    /// 处理耗时（微秒）
    pub elapsed_us: u64,
}

impl NormalizationResult {
    /// 创建无修改的结果
    pub fn unchanged(text: String, elapsed_us: u64) -> Self {
        Self {
            text,
            changed: false,
            wrap: MathWrap::Plain,
            elapsed_us,
        }
    }
}
