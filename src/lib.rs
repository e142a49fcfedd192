//! latex-ocr - 数学表达式图片转 LaTeX 的核心库
//!
//! 整体是一条直线管线，两端各有一个外部边界：
//!
//! 1. **识别适配层** [`recognize`]：把图像字节发给可互换的识别后端
//!    （本地启发式引擎 / pix2tex 服务 / Mathpix 风格云端服务），
//!    把三种响应形状统一为 `(原文, LaTeX)` 的结果对。
//! 2. **规范化管线** [`normalizer`]（核心）：对识别出的纯文本按固定
//!    顺序应用改写规则，产出语法上合理的 LaTeX；后端已返回 LaTeX
//!    时整条管线被绕过。
//!
//! [`session`] 把两者接成完整流程并用显式状态机管理一次会话；
//! 图片获取、排版渲染、剪贴板等展示层职责都在库外。

pub mod config;
pub mod normalizer;
pub mod preprocess;
pub mod recognize;
pub mod session;

pub use config::{AppConfig, OcrProvider};
pub use normalizer::{LatexNormalizer, MathWrap, NormalizationResult, NormalizerOptions};
pub use preprocess::{PreprocessParams, Preprocessor};
pub use recognize::{
    recognize_with_fallback, LocalEngineClient, LocalMathEngine, MathpixClient,
    Pix2TexClient, ProgressSink, RecognitionResult, RecognizeError, Recognizer,
    DEFAULT_PIX2TEX_URL,
};
pub use session::{RecognitionSession, SessionError, SessionOutcome, SessionState};
