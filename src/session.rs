//! 识别会话控制器
//!
//! 用显式状态机取代散落的界面可见性开关：
//! 空闲 → 预览 → 识别中 → 展示结果 / 出错。
//!
//! 会话持有当前图片与识别产物，施加「同一时刻最多一次识别」的
//! 准入控制（对应界面在识别期间禁用提交按钮）。识别尚未返回时
//! 用户重新提交产生的旧结果由展示层按后写者胜出的方式丢弃，
//! 不在这里做取消。

use std::sync::Arc;

use serde::Serialize;

use crate::config::{AppConfig, OcrProvider};
use crate::normalizer::{LatexNormalizer, NormalizerOptions};
use crate::preprocess::Preprocessor;
use crate::recognize::{
    self, LocalEngineClient, LocalMathEngine, MathpixClient, Pix2TexClient,
    RecognitionResult, RecognizeError, Recognizer,
};

/// 会话状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// 空闲，等待图片
    #[default]
    Idle,
    /// 已载入图片，可提交识别
    Previewing,
    /// 识别进行中（拒绝新的提交）
    Recognizing,
    /// 已有可展示 / 可复制的结果
    ShowingResult,
    /// 识别失败，持有面向用户的提示
    Error,
}

/// 一次成功识别的产物
#[derive(Debug, Clone, Serialize)]
pub struct SessionOutcome {
    /// 最终 LaTeX 字符串（交给展示层排版和复制）
    pub latex: String,
    /// 识别原文（仅在非空且与最终结果不同时保留，供用户对照）
    pub raw_text: Option<String>,
}

/// 会话层错误
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("当前没有可处理的图片")]
    NoImage,
    #[error("已有识别任务在进行中")]
    Busy,
    #[error("图像预处理失败: {0}")]
    Preprocess(#[source] anyhow::Error),
    #[error(transparent)]
    Recognize(#[from] RecognizeError),
}

impl SessionError {
    /// 面向用户的提示文案
    pub fn user_message(&self) -> String {
        match self {
            SessionError::NoImage => "请先上传一张图片".to_string(),
            SessionError::Busy => "正在识别上一张图片，请稍候".to_string(),
            SessionError::Preprocess(_) => {
                "图像预处理失败，请确认上传的是有效的图片文件".to_string()
            }
            SessionError::Recognize(err) => err.user_hint().to_string(),
        }
    }
}

/// 识别会话
pub struct RecognitionSession {
    recognizer: Recognizer,
    fallback: Option<Recognizer>,
    normalizer: LatexNormalizer,
    preprocessor: Option<Preprocessor>,
    state: SessionState,
    image: Option<Vec<u8>>,
    outcome: Option<SessionOutcome>,
    last_error: Option<String>,
}

impl RecognitionSession {
    pub fn new(recognizer: Recognizer, normalizer: LatexNormalizer) -> Self {
        Self {
            recognizer,
            fallback: None,
            normalizer,
            preprocessor: None,
            state: SessionState::Idle,
            image: None,
            outcome: None,
            last_error: None,
        }
    }

    /// 按配置组装会话（后端、备用后端、规范化选项、预处理）
    ///
    /// 选择本地引擎时必须提供引擎实现
    pub fn from_config(
        config: &AppConfig,
        local_engine: Option<Arc<dyn LocalMathEngine>>,
    ) -> anyhow::Result<Self> {
        config.validate()?;
        let selection = &config.ocr_config.selection;

        let recognizer =
            build_recognizer(config, selection.active_provider, local_engine.as_ref())?;
        let fallback = if selection.enable_fallback {
            selection
                .fallback_provider
                .map(|provider| build_recognizer(config, provider, local_engine.as_ref()))
                .transpose()?
        } else {
            None
        };

        // 混淆纠正只对本地引擎的输出生效
        let options = NormalizerOptions {
            correct_confusions: config.enable_confusion_correction
                && recognizer.needs_confusion_correction(),
        };

        let preprocessor = if config.preprocess.enabled {
            Some(Preprocessor::new(config.preprocess.params)?)
        } else {
            None
        };

        let mut session = Self::new(recognizer, LatexNormalizer::new(options));
        session.fallback = fallback;
        session.preprocessor = preprocessor;
        Ok(session)
    }

    pub fn with_fallback(mut self, fallback: Recognizer) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn with_preprocessor(mut self, preprocessor: Preprocessor) -> Self {
        self.preprocessor = Some(preprocessor);
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn outcome(&self) -> Option<&SessionOutcome> {
        self.outcome.as_ref()
    }

    /// 当前可编辑 / 可复制的 LaTeX 字符串
    ///
    /// 用户编辑后的再预览是纯重渲染，这里不做任何二次规范化
    pub fn latex(&self) -> Option<&str> {
        self.outcome.as_ref().map(|o| o.latex.as_str())
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// 载入一张新图片
    ///
    /// 识别进行中拒绝载入（准入控制），返回 false
    pub fn load_image(&mut self, image: Vec<u8>) -> bool {
        if self.state == SessionState::Recognizing {
            tracing::warn!("识别进行中，拒绝载入新图片");
            return false;
        }
        self.image = Some(image);
        self.outcome = None;
        self.last_error = None;
        self.state = SessionState::Previewing;
        true
    }

    /// 对当前图片执行一次完整的识别流程
    ///
    /// 预处理（可选）→ 识别（含备用后端）→ 绕过或规范化
    pub async fn process(&mut self) -> Result<SessionOutcome, SessionError> {
        if self.state == SessionState::Recognizing {
            return Err(SessionError::Busy);
        }
        let Some(image) = self.image.clone() else {
            return Err(SessionError::NoImage);
        };

        self.state = SessionState::Recognizing;
        tracing::info!(
            "开始识别: 后端 {} ({} bytes)",
            self.recognizer.provider_name(),
            image.len()
        );

        let prepared = if let Some(preprocessor) = &self.preprocessor {
            match preprocessor.apply(&image) {
                Ok(bytes) => bytes,
                Err(err) => {
                    let session_err = SessionError::Preprocess(err);
                    self.enter_error(&session_err);
                    return Err(session_err);
                }
            }
        } else {
            image
        };

        let result = recognize::recognize_with_fallback(
            &self.recognizer,
            self.fallback.as_ref(),
            &prepared,
        )
        .await;

        match result.map_err(SessionError::from).and_then(|r| self.resolve(r)) {
            Ok(outcome) => {
                self.outcome = Some(outcome.clone());
                self.state = SessionState::ShowingResult;
                tracing::info!("识别完成: {}", outcome.latex);
                Ok(outcome)
            }
            Err(err) => {
                self.enter_error(&err);
                Err(err)
            }
        }
    }

    /// 清空会话，回到空闲态
    pub fn reset(&mut self) {
        self.image = None;
        self.outcome = None;
        self.last_error = None;
        self.state = SessionState::Idle;
    }

    fn enter_error(&mut self, err: &SessionError) {
        tracing::error!("识别流程失败: {}", err);
        self.last_error = Some(err.user_message());
        self.state = SessionState::Error;
    }

    /// 把统一识别结果落成最终产物
    ///
    /// 后端已返回 LaTeX 时逐字采用（绕过规范化），
    /// 否则把纯文本交给规范化管线
    fn resolve(&self, result: RecognitionResult) -> Result<SessionOutcome, SessionError> {
        if let Some(latex) = result.latex {
            let raw_text = result
                .raw_text
                .filter(|t| !t.trim().is_empty() && *t != latex);
            return Ok(SessionOutcome { latex, raw_text });
        }

        let Some(raw) = result.raw_text.filter(|t| !t.trim().is_empty()) else {
            // 两个字段都为空违反结果不变式，按无结果处理
            return Err(RecognizeError::EmptyResult.into());
        };

        let normalized = self.normalizer.normalize(&raw);
        let raw_text = (normalized.text != raw).then_some(raw);
        Ok(SessionOutcome {
            latex: normalized.text,
            raw_text,
        })
    }
}

/// 按配置构造具体后端
fn build_recognizer(
    config: &AppConfig,
    provider: OcrProvider,
    local_engine: Option<&Arc<dyn LocalMathEngine>>,
) -> anyhow::Result<Recognizer> {
    let credentials = &config.ocr_config.credentials;
    Ok(match provider {
        OcrProvider::Local => {
            let engine = local_engine
                .ok_or_else(|| anyhow::anyhow!("选择了本地引擎但没有提供引擎实现"))?;
            Recognizer::Local(LocalEngineClient::new(Arc::clone(engine)))
        }
        OcrProvider::Pix2tex => {
            Recognizer::Pix2Tex(Pix2TexClient::new(credentials.pix2tex_base_url.clone()))
        }
        OcrProvider::Mathpix => Recognizer::Mathpix(MathpixClient::new(
            credentials.mathpix_app_id.clone(),
            credentials.mathpix_app_key.clone(),
        )),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedEngine(&'static str);

    impl LocalMathEngine for FixedEngine {
        fn recognize(
            &self,
            _image: &[u8],
            progress: &mut dyn FnMut(f32, &str),
        ) -> anyhow::Result<String> {
            progress(1.0, "完成");
            Ok(self.0.to_string())
        }
    }

    struct FailingEngine;

    impl LocalMathEngine for FailingEngine {
        fn recognize(
            &self,
            _image: &[u8],
            _progress: &mut dyn FnMut(f32, &str),
        ) -> anyhow::Result<String> {
            anyhow::bail!("引擎内部错误")
        }
    }

    fn local_session(engine: impl LocalMathEngine + 'static) -> RecognitionSession {
        let recognizer = Recognizer::Local(LocalEngineClient::new(Arc::new(engine)));
        RecognitionSession::new(recognizer, LatexNormalizer::default())
    }

    #[tokio::test]
    async fn test_full_flow_raw_text_is_normalized() {
        let mut session = local_session(FixedEngine("sin x = 1"));
        assert_eq!(session.state(), SessionState::Idle);

        assert!(session.load_image(vec![1, 2, 3]));
        assert_eq!(session.state(), SessionState::Previewing);

        let outcome = session.process().await.unwrap();
        assert_eq!(session.state(), SessionState::ShowingResult);
        assert!(outcome.latex.contains("\\sin"));
        assert!(outcome.latex.starts_with("$$"));
        // 原文与结果不同，应保留供对照
        assert_eq!(outcome.raw_text.as_deref(), Some("sin x = 1"));
    }

    #[tokio::test]
    async fn test_styled_latex_bypasses_normalizer() {
        let session = local_session(FixedEngine("unused"));

        // 后端返回的 styled LaTeX 必须逐字保留
        let outcome = session
            .resolve(RecognitionResult::from_latex("x^2".to_string()))
            .unwrap();
        assert_eq!(outcome.latex, "x^2");
        assert!(outcome.raw_text.is_none());
    }

    #[tokio::test]
    async fn test_raw_text_suppressed_when_identical() {
        let session = local_session(FixedEngine("unused"));

        let result = RecognitionResult {
            raw_text: Some("x^{2}".to_string()),
            latex: Some("x^{2}".to_string()),
        };
        let outcome = session.resolve(result).unwrap();
        assert!(outcome.raw_text.is_none());
    }

    #[tokio::test]
    async fn test_process_without_image() {
        let mut session = local_session(FixedEngine("x"));

        let err = session.process().await.unwrap_err();
        assert!(matches!(err, SessionError::NoImage));
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn test_engine_failure_enters_error_state() {
        let mut session = local_session(FailingEngine);
        session.load_image(vec![0u8]);

        let err = session.process().await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::Recognize(RecognizeError::EngineFailed(_))
        ));
        assert_eq!(session.state(), SessionState::Error);
        assert!(session.last_error().is_some());
    }

    #[tokio::test]
    async fn test_retry_after_error() {
        let mut session = local_session(FailingEngine);
        session.load_image(vec![0u8]);
        let _ = session.process().await;
        assert_eq!(session.state(), SessionState::Error);

        // 出错后允许直接重试（图片还在）
        let err = session.process().await.unwrap_err();
        assert!(!matches!(err, SessionError::Busy));
    }

    #[tokio::test]
    async fn test_reset_returns_to_idle() {
        let mut session = local_session(FixedEngine("a = b"));
        session.load_image(vec![0u8]);
        session.process().await.unwrap();

        session.reset();
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.latex().is_none());
        assert!(session.last_error().is_none());
    }

    #[tokio::test]
    async fn test_from_config_requires_local_engine() {
        let mut config = AppConfig::default();
        config.ocr_config.selection.active_provider = OcrProvider::Local;

        assert!(RecognitionSession::from_config(&config, None).is_err());
        assert!(RecognitionSession::from_config(
            &config,
            Some(Arc::new(FixedEngine("x")) as Arc<dyn LocalMathEngine>)
        )
        .is_ok());
    }

    #[tokio::test]
    async fn test_fallback_used_after_primary_failure() {
        let primary = Recognizer::Local(LocalEngineClient::new(Arc::new(FailingEngine)));
        let fallback = Recognizer::Local(LocalEngineClient::new(Arc::new(FixedEngine("3/4"))));
        let mut session = RecognitionSession::new(primary, LatexNormalizer::default())
            .with_fallback(fallback);

        session.load_image(vec![0u8]);
        let outcome = session.process().await.unwrap();
        assert!(outcome.latex.contains("\\frac{3}{4}"));
    }
}
