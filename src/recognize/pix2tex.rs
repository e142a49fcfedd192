//! pix2tex 数学图像服务客户端
//!
//! 专用的公式识别服务器：接收 multipart 图片，直接返回一个
//! JSON 字符串形式的 LaTeX。它的输出已经是格式化好的 LaTeX，
//! 适配层必须标记「已是 LaTeX」，调用方绝不能再走规范化管线。

use crate::recognize::{self, RecognitionResult, RecognizeError};

/// pix2tex 服务默认地址
pub const DEFAULT_PIX2TEX_URL: &str = "http://localhost:8502";

#[derive(Clone)]
pub struct Pix2TexClient {
    base_url: String,
    client: reqwest::Client,
}

impl Pix2TexClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            client: recognize::create_http_client(),
        }
    }

    /// 服务健康检查
    ///
    /// 展示层据此决定是否允许提交识别（服务未就绪时给出部署指引）
    pub async fn health_check(&self) -> Result<(), RecognizeError> {
        let url = format!("{}/", self.base_url);
        tracing::info!("检查 pix2tex 服务状态: {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(RecognizeError::ServiceUnreachable)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("pix2tex 服务状态异常 ({}): {}", status, body);
            return Err(RecognizeError::BadStatus { status, body });
        }

        tracing::info!("pix2tex 服务就绪");
        Ok(())
    }

    /// 执行一次识别
    pub async fn recognize(&self, image: &[u8]) -> Result<RecognitionResult, RecognizeError> {
        let url = format!("{}/predict/", self.base_url);
        tracing::info!("发送图片到 pix2tex: {} ({} bytes)", url, image.len());

        let form = reqwest::multipart::Form::new().part(
            "file",
            reqwest::multipart::Part::bytes(image.to_vec())
                .file_name("formula.png")
                .mime_str("image/png")
                .map_err(RecognizeError::ServiceUnreachable)?,
        );

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(RecognizeError::ServiceUnreachable)?;

        let status = response.status();
        tracing::info!("pix2tex 响应状态: {}", status);

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("pix2tex 错误响应: {}", body);
            return Err(RecognizeError::BadStatus { status, body });
        }

        // 响应体是一个裸 JSON 字符串
        let latex: String = response
            .json()
            .await
            .map_err(|_| RecognizeError::EmptyResult)?;

        parse_latex_payload(latex)
    }
}

/// 把服务返回的裸字符串统一为 RecognitionResult
///
/// 空白字符串视为「可达但无结果」
fn parse_latex_payload(latex: String) -> Result<RecognitionResult, RecognizeError> {
    let latex = latex.trim().to_string();
    if latex.is_empty() {
        return Err(RecognizeError::EmptyResult);
    }
    tracing::info!("pix2tex 识别完成: {}", latex);
    Ok(RecognitionResult::from_latex(latex))
}
