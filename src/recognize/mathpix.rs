//! Mathpix 风格的云端识别客户端
//!
//! 图片以 base64 数据 URI 放在 JSON 请求体里上传。
//! 响应可能带 `latex_styled`（已格式化的 LaTeX）或只有 `text`
//! （纯文本），失败时是空对象 `{}`。两种字段的优先级在
//! [`unify_response`] 里统一：有 styled 字段就原样采用并绕过
//! 规范化，否则把纯文本交给规范化管线。

use base64::{engine::general_purpose, Engine as _};
use serde::Deserialize;

use crate::recognize::{self, RecognitionResult, RecognizeError};

const MATHPIX_API_URL: &str = "https://api.mathpix.com/v3/text";

#[derive(Clone)]
pub struct MathpixClient {
    app_id: String,
    app_key: String,
    client: reqwest::Client,
}

/// Mathpix 响应形状（失败时为 `{}`，所有字段缺省）
#[derive(Debug, Default, Deserialize)]
pub(crate) struct MathpixResponse {
    #[serde(default)]
    latex_styled: Option<String>,
    #[serde(default)]
    text: Option<String>,
}

impl MathpixClient {
    pub fn new(app_id: String, app_key: String) -> Self {
        Self {
            app_id,
            app_key,
            client: recognize::create_http_client(),
        }
    }

    /// 执行一次识别
    pub async fn recognize(&self, image: &[u8]) -> Result<RecognitionResult, RecognizeError> {
        tracing::info!("开始 Mathpix 识别: {} bytes", image.len());

        let image_base64 = general_purpose::STANDARD.encode(image);
        let request_body = serde_json::json!({
            "src": format!("data:image/png;base64,{}", image_base64),
            "formats": ["text", "latex_styled"],
        });

        let response = self
            .client
            .post(MATHPIX_API_URL)
            .header("app_id", &self.app_id)
            .header("app_key", &self.app_key)
            .header("Content-Type", "application/json")
            .json(&request_body)
            .send()
            .await
            .map_err(RecognizeError::ServiceUnreachable)?;

        let status = response.status();
        tracing::info!("Mathpix 响应状态: {}", status);

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Mathpix 错误响应: {}", body);
            return Err(RecognizeError::BadStatus { status, body });
        }

        let payload: MathpixResponse = response
            .json()
            .await
            .map_err(|_| RecognizeError::EmptyResult)?;

        unify_response(payload)
    }
}

/// 把两种可能的响应字段统一为 RecognitionResult
///
/// `latex_styled` 优先：存在即视为「已是 LaTeX」；
/// 否则 `text` 作为待规范化的纯文本；两者皆空视为无结果
pub(crate) fn unify_response(
    payload: MathpixResponse,
) -> Result<RecognitionResult, RecognizeError> {
    if let Some(latex) = payload
        .latex_styled
        .filter(|s| !s.trim().is_empty())
    {
        tracing::info!("Mathpix 返回格式化 LaTeX: {}", latex);
        return Ok(RecognitionResult::from_latex(latex));
    }

    if let Some(text) = payload.text.filter(|s| !s.trim().is_empty()) {
        tracing::info!("Mathpix 返回纯文本: {}", text);
        return Ok(RecognitionResult::from_raw(text));
    }

    tracing::warn!("Mathpix 响应中没有可用字段");
    Err(RecognizeError::EmptyResult)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> MathpixResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_styled_field_wins() {
        let payload = parse(r#"{"latex_styled": "x^{2}", "text": "x^2"}"#);

        let result = unify_response(payload).unwrap();
        // styled 字段必须逐字保留，不得经过任何改写
        assert_eq!(result.already_latex(), Some("x^{2}"));
        assert!(result.raw_text.is_none());
    }

    #[test]
    fn test_text_only_goes_to_normalizer() {
        let payload = parse(r#"{"text": "sin x = 1"}"#);

        let result = unify_response(payload).unwrap();
        assert!(result.already_latex().is_none());
        assert_eq!(result.raw_text.as_deref(), Some("sin x = 1"));
    }

    #[test]
    fn test_empty_object_is_empty_result() {
        let payload = parse("{}");

        let err = unify_response(payload).unwrap_err();
        assert!(matches!(err, RecognizeError::EmptyResult));
    }

    #[test]
    fn test_blank_styled_falls_back_to_text() {
        let payload = parse(r#"{"latex_styled": "  ", "text": "a+b"}"#);

        let result = unify_response(payload).unwrap();
        assert_eq!(result.raw_text.as_deref(), Some("a+b"));
    }
}
