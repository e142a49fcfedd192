//! 本地启发式识别引擎的适配客户端
//!
//! 引擎本体由使用方提供（同步调用 + 分步进度回调），
//! 这里只负责桥接到异步契约并统一结果形状。

use std::sync::Arc;

use crate::recognize::{RecognitionResult, RecognizeError};

/// 本地数学识别引擎的能力契约
///
/// 引擎接收图像字节、返回识别出的纯文本；
/// `progress` 在每个处理步骤上报完成度（0.0–1.0）和阶段标签
pub trait LocalMathEngine: Send + Sync {
    fn recognize(
        &self,
        image: &[u8],
        progress: &mut dyn FnMut(f32, &str),
    ) -> anyhow::Result<String>;
}

/// 进度回调（由展示层注入，用于驱动进度条）
pub type ProgressSink = Arc<dyn Fn(f32, &str) + Send + Sync>;

/// 本地引擎客户端
///
/// 引擎是同步计算，通过 `spawn_blocking` 桥接，
/// 不阻塞调用方所在的异步任务
#[derive(Clone)]
pub struct LocalEngineClient {
    engine: Arc<dyn LocalMathEngine>,
    progress: Option<ProgressSink>,
}

impl LocalEngineClient {
    pub fn new(engine: Arc<dyn LocalMathEngine>) -> Self {
        Self {
            engine,
            progress: None,
        }
    }

    /// 注入进度回调
    pub fn with_progress(mut self, sink: ProgressSink) -> Self {
        self.progress = Some(sink);
        self
    }

    /// 执行一次识别
    ///
    /// 本地引擎只产出纯文本，结果总是需要经过规范化管线
    pub async fn recognize(&self, image: &[u8]) -> Result<RecognitionResult, RecognizeError> {
        tracing::info!("开始本地引擎识别: {} bytes", image.len());

        let engine = Arc::clone(&self.engine);
        let progress = self.progress.clone();
        let image = image.to_vec();

        let text = tokio::task::spawn_blocking(move || {
            let mut report = |fraction: f32, label: &str| {
                if let Some(sink) = &progress {
                    sink(fraction, label);
                }
            };
            engine.recognize(&image, &mut report)
        })
        .await
        .map_err(|e| RecognizeError::EngineFailed(anyhow::anyhow!("引擎任务中断: {}", e)))?
        .map_err(RecognizeError::EngineFailed)?;

        let text = text.trim().to_string();
        if text.is_empty() {
            tracing::warn!("本地引擎未识别出任何文本");
            return Err(RecognizeError::EmptyResult);
        }

        tracing::info!("本地引擎识别完成: {}", text);
        Ok(RecognitionResult::from_raw(text))
    }
}
