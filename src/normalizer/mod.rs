//! LaTeX 规范化管线（本库的核心）
//!
//! 把识别后端输出的纯文本按固定顺序改写为语法上合理的 LaTeX。
//!
//! ## 处理流程
//! 1. 行尾统一
//! 2. 字符混淆纠正（可选，按后端开关）
//! 3. 空白折叠（保留换行）
//! 4. 关键词 / 希腊字母 → LaTeX 命令
//! 5. Unicode 数学符号替换
//! 6. 结构推断（分数、上下标、多行方程组）
//! 7. 数学模式包裹决策（含防二次包裹守卫）

mod engine;
mod rules;
mod types;

pub use engine::LatexNormalizer;
pub use types::{MathWrap, NormalizationResult, NormalizerOptions};
