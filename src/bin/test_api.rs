// API 测试工具 - 独立测试 pix2tex 识别服务
use anyhow::Result;
use std::path::PathBuf;

use latex_ocr::{LatexNormalizer, Pix2TexClient, DEFAULT_PIX2TEX_URL};

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::fmt::init();

    println!("=== pix2tex 识别服务测试工具 ===\n");

    // 1. 服务地址
    let base_url =
        std::env::var("PIX2TEX_URL").unwrap_or_else(|_| DEFAULT_PIX2TEX_URL.to_string());
    println!("✓ 服务地址: {}\n", base_url);

    let client = Pix2TexClient::new(base_url);

    // 2. 健康检查
    println!("正在检查服务状态...");
    match client.health_check().await {
        Ok(()) => println!("✓ 服务就绪\n"),
        Err(err) => {
            println!("❌ {}\n", err.user_hint());
            anyhow::bail!("服务不可用");
        }
    }

    // 3. 图片路径
    println!("请输入公式图片路径 (PNG/JPG):");
    let mut image_path = String::new();
    std::io::stdin().read_line(&mut image_path)?;
    let image_path = image_path.trim();

    let image_file = PathBuf::from(image_path);
    if !image_file.exists() {
        anyhow::bail!("文件不存在: {}", image_path);
    }

    // 4. 读取并识别
    println!("正在读取图片...");
    let image_data = tokio::fs::read(&image_file).await?;
    println!("✓ 文件大小: {} bytes\n", image_data.len());

    println!("正在识别...");
    let result = client.recognize(&image_data).await?;

    // 5. 输出结果（pix2tex 直接返回 LaTeX，不经过规范化）
    match result.latex {
        Some(latex) => {
            println!("✅ 识别成功！\n");
            println!("📝 LaTeX:");
            println!("─────────────────────────────────");
            println!("{}", latex);
            println!("─────────────────────────────────\n");
        }
        None => {
            let raw = result.raw_text.unwrap_or_default();
            let normalized = LatexNormalizer::default().normalize(&raw);
            println!("✅ 识别成功（经规范化）！\n");
            println!("📝 原文: {}", raw);
            println!("📝 LaTeX: {}", normalized.text);
        }
    }

    Ok(())
}
