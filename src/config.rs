//! 应用配置
//!
//! 识别后端选择、凭据、预处理与规范化开关。
//! JSON 文件持久化在用户配置目录下。

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::recognize::DEFAULT_PIX2TEX_URL;

lazy_static::lazy_static! {
    /// 全局配置操作锁
    ///
    /// 保护 load->modify->save 序列，防止并发写入导致的数据丢失
    pub static ref CONFIG_LOCK: Mutex<()> = Mutex::new(());
}

/// 识别后端
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OcrProvider {
    /// 本地启发式引擎（只产纯文本，必须走规范化管线）
    Local,
    /// pix2tex 数学图像服务（直接返回 LaTeX）
    Pix2tex,
    /// Mathpix 风格的云端服务（可能返回 styled LaTeX 或纯文本）
    Mathpix,
}

impl Default for OcrProvider {
    fn default() -> Self {
        OcrProvider::Pix2tex
    }
}

impl OcrProvider {
    /// 显示名称（用于日志）
    pub fn display_name(&self) -> &'static str {
        match self {
            OcrProvider::Local => "本地引擎",
            OcrProvider::Pix2tex => "pix2tex",
            OcrProvider::Mathpix => "Mathpix",
        }
    }
}

fn default_pix2tex_url() -> String {
    DEFAULT_PIX2TEX_URL.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrCredentials {
    #[serde(default = "default_pix2tex_url")]
    pub pix2tex_base_url: String,
    #[serde(default)]
    pub mathpix_app_id: String,
    #[serde(default)]
    pub mathpix_app_key: String,
}

impl Default for OcrCredentials {
    fn default() -> Self {
        Self {
            pix2tex_base_url: default_pix2tex_url(),
            mathpix_app_id: String::new(),
            mathpix_app_key: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OcrSelection {
    #[serde(default)]
    pub active_provider: OcrProvider,
    #[serde(default)]
    pub enable_fallback: bool,
    #[serde(default)]
    pub fallback_provider: Option<OcrProvider>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OcrConfig {
    #[serde(default)]
    pub credentials: OcrCredentials,
    #[serde(default)]
    pub selection: OcrSelection,
}

/// 预处理开关与参数
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PreprocessSettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub params: crate::preprocess::PreprocessParams,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub ocr_config: OcrConfig,
    /// 是否对本地引擎的输出启用字符混淆纠正（规范化阶段 2）
    ///
    /// 该阶段是全局盲替换，对正常数字有破坏性，默认关闭
    #[serde(default)]
    pub enable_confusion_correction: bool,
    #[serde(default)]
    pub preprocess: PreprocessSettings,
}

impl AppConfig {
    pub fn config_path() -> Result<PathBuf> {
        let config_dir =
            dirs::config_dir().ok_or_else(|| anyhow::anyhow!("无法获取配置目录"))?;
        Ok(config_dir.join("latex-ocr").join("config.json"))
    }

    /// 从默认路径加载配置，文件不存在时返回默认配置
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        tracing::info!("尝试从以下路径加载配置: {:?}", path);
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!("配置文件不存在，使用默认配置");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// 保存配置到默认路径
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        self.validate()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        tracing::info!("配置已保存到: {:?}", path);
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let selection = &self.ocr_config.selection;

        if !self.is_provider_configured(selection.active_provider) {
            anyhow::bail!(
                "后端 {} 缺少必要的凭据或地址配置",
                selection.active_provider.display_name()
            );
        }

        if selection.enable_fallback {
            let Some(fallback) = selection.fallback_provider else {
                anyhow::bail!("启用了备用后端但没有选择具体后端");
            };
            if fallback == selection.active_provider {
                anyhow::bail!("备用后端不能与主后端相同");
            }
            if !self.is_provider_configured(fallback) {
                anyhow::bail!(
                    "备用后端 {} 缺少必要的凭据或地址配置",
                    fallback.display_name()
                );
            }
        }

        Ok(())
    }

    /// 某个后端的凭据 / 地址是否配置完整
    pub fn is_provider_configured(&self, provider: OcrProvider) -> bool {
        let credentials = &self.ocr_config.credentials;
        match provider {
            OcrProvider::Local => true,
            OcrProvider::Pix2tex => !credentials.pix2tex_base_url.trim().is_empty(),
            OcrProvider::Mathpix => {
                !credentials.mathpix_app_id.trim().is_empty()
                    && !credentials.mathpix_app_key.trim().is_empty()
            }
        }
    }
}
