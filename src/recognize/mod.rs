//! 识别后端适配层
//!
//! 把三种互不兼容的识别来源统一为同一个契约：
//! `recognize(图像字节) -> RecognitionResult`。
//!
//! - 本地启发式引擎：只返回纯文本，结果必须经过规范化管线
//! - pix2tex 数学图像服务：直接返回 LaTeX，绕过规范化
//! - Mathpix 风格的云端服务：可能返回带格式的 LaTeX 字段或纯文本字段

pub mod local;
pub mod mathpix;
pub mod pix2tex;

pub use local::{LocalEngineClient, LocalMathEngine, ProgressSink};
pub use mathpix::MathpixClient;
pub use pix2tex::{Pix2TexClient, DEFAULT_PIX2TEX_URL};

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

/// 一次识别调用的统一结果
///
/// 不变式：识别成功时至少一个字段非空；两个都为空视为失败，
/// 客户端在该情况下返回 [`RecognizeError::EmptyResult`] 而不是本结构
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognitionResult {
    /// 识别出的纯文本（需要规范化）
    pub raw_text: Option<String>,
    /// 后端已格式化好的 LaTeX（存在时绕过规范化）
    pub latex: Option<String>,
}

impl RecognitionResult {
    /// 从纯文本构造（需后续规范化）
    pub fn from_raw(text: String) -> Self {
        Self {
            raw_text: Some(text),
            latex: None,
        }
    }

    /// 从已格式化的 LaTeX 构造（绕过规范化）
    pub fn from_latex(latex: String) -> Self {
        Self {
            raw_text: None,
            latex: Some(latex),
        }
    }

    /// 后端是否已经返回了格式化好的 LaTeX
    pub fn already_latex(&self) -> Option<&str> {
        self.latex.as_deref()
    }
}

/// 识别失败的类别
///
/// 调用方的补救提示依赖「服务不可达」和「可达但无结果」的区分，
/// 前者是配置 / 部署问题，后者是图片质量问题
#[derive(Debug, thiserror::Error)]
pub enum RecognizeError {
    /// 服务无法连接（网络或配置问题）
    #[error("识别服务不可达: {0}")]
    ServiceUnreachable(#[source] reqwest::Error),
    /// 服务可达但返回了非成功状态码
    #[error("识别服务返回错误 ({status}): {body}")]
    BadStatus {
        status: reqwest::StatusCode,
        body: String,
    },
    /// 服务可达但没有可用的识别结果
    #[error("识别服务未返回可用结果")]
    EmptyResult,
    /// 本地识别引擎执行失败
    #[error("本地识别引擎执行失败: {0}")]
    EngineFailed(#[source] anyhow::Error),
}

impl RecognizeError {
    /// 是否属于部署 / 配置类问题（而不是图片质量问题）
    pub fn is_setup_problem(&self) -> bool {
        matches!(self, RecognizeError::ServiceUnreachable(_))
    }

    /// 面向用户的补救提示
    pub fn user_hint(&self) -> &'static str {
        if self.is_setup_problem() {
            "无法连接识别服务。请确认服务已启动并检查地址配置。\
             pix2tex 服务的启动方式：pip install \"pix2tex[gui]\"，\
             然后运行 python -m pix2tex.api.run（默认地址 http://localhost:8502）"
        } else {
            "未能从图片中识别出内容，请尝试裁剪更紧凑、对比度更高的图片"
        }
    }
}

/// 创建标准配置的 HTTP 客户端（30s 超时，禁用代理）
pub fn create_http_client() -> Client {
    Client::builder()
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .pool_idle_timeout(Duration::from_secs(30))
        .pool_max_idle_per_host(10)
        .no_proxy()
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// 统一的识别器（按配置选择具体后端）
pub enum Recognizer {
    /// 本地启发式引擎
    Local(LocalEngineClient),
    /// pix2tex 数学图像服务
    Pix2Tex(Pix2TexClient),
    /// Mathpix 风格的云端识别服务
    Mathpix(MathpixClient),
}

impl Recognizer {
    /// 对一张图片执行一次识别
    pub async fn recognize(&self, image: &[u8]) -> Result<RecognitionResult, RecognizeError> {
        match self {
            Recognizer::Local(client) => client.recognize(image).await,
            Recognizer::Pix2Tex(client) => client.recognize(image).await,
            Recognizer::Mathpix(client) => client.recognize(image).await,
        }
    }

    /// 后端名称（用于日志）
    pub fn provider_name(&self) -> &'static str {
        match self {
            Recognizer::Local(_) => "本地引擎",
            Recognizer::Pix2Tex(_) => "pix2tex",
            Recognizer::Mathpix(_) => "Mathpix",
        }
    }

    /// 该后端的纯文本输出是否需要字符混淆纠正
    ///
    /// 只有本地启发式引擎的输出存在系统性字符混淆
    pub fn needs_confusion_correction(&self) -> bool {
        matches!(self, Recognizer::Local(_))
    }
}

/// 主后端失败时自动切换到备用后端
///
/// 每次调用都是独立的全新识别，没有重试逻辑
pub async fn recognize_with_fallback(
    primary: &Recognizer,
    fallback: Option<&Recognizer>,
    image: &[u8],
) -> Result<RecognitionResult, RecognizeError> {
    match primary.recognize(image).await {
        Ok(result) => Ok(result),
        Err(err) => {
            let Some(backup) = fallback else {
                return Err(err);
            };
            tracing::warn!(
                "{} 识别失败，切换到备用后端 {}: {}",
                primary.provider_name(),
                backup.provider_name(),
                err
            );
            backup.recognize(image).await
        }
    }
}
