//! 规范化主引擎
//!
//! 按固定顺序组合七个阶段，把带噪声的识别文本改写为可用的 LaTeX：
//! 1. 行尾统一
//! 2. 字符混淆纠正（可选，按后端开关）
//! 3. 空白折叠（仅水平空白，保留换行）
//! 4. 关键词 → LaTeX 命令
//! 5. Unicode 数学符号替换
//! 6. 结构推断（分数 / 上下标 / 多行方程组）
//! 7. 数学模式包裹决策
//!
//! 每个阶段都是字符串上的全函数，未命中的模式原样通过，
//! 整条管线没有失败路径。

use std::time::Instant;

use regex::Regex;

use crate::normalizer::rules::{
    keyword_pattern, CONFUSION_RULES, ROW_SEPARATOR, SYMBOL_RULES,
};
use crate::normalizer::types::{MathWrap, NormalizationResult, NormalizerOptions};

lazy_static::lazy_static! {
    /// 阶段 4：大小写不敏感 + 双侧词边界的关键词匹配
    static ref KEYWORD_RE: Regex =
        Regex::new(&keyword_pattern()).expect("内置关键词正则必定合法");
    /// 阶段 6：纯数字分数（常见情形，先于通用规则执行）
    static ref DIGIT_FRAC_RE: Regex =
        Regex::new(r"\b(\d+)\s*/\s*(\d+)\b").expect("内置分数正则必定合法");
    /// 阶段 6：通用字母数字分数
    static ref WORD_FRAC_RE: Regex =
        Regex::new(r"\b([A-Za-z0-9]+)\s*/\s*([A-Za-z0-9]+)\b").expect("内置分数正则必定合法");
    /// 阶段 6：裸指数（`^` 后紧跟字母数字，已有花括号的不会命中）
    static ref SUPERSCRIPT_RE: Regex =
        Regex::new(r"([A-Za-z0-9])\^([A-Za-z0-9]+)").expect("内置上标正则必定合法");
    /// 阶段 6：裸下标
    static ref SUBSCRIPT_RE: Regex =
        Regex::new(r"([A-Za-z0-9])_([A-Za-z0-9]+)").expect("内置下标正则必定合法");
}

/// LaTeX 规范化引擎（可复用，规则预编译）
#[derive(Debug, Clone, Default)]
pub struct LatexNormalizer {
    options: NormalizerOptions,
}

impl LatexNormalizer {
    /// 创建引擎
    pub fn new(options: NormalizerOptions) -> Self {
        Self { options }
    }

    /// 规范化文本
    ///
    /// 纯函数，不可失败，相同输入产生相同输出
    pub fn normalize(&self, text: &str) -> NormalizationResult {
        let start = Instant::now();

        if text.is_empty() {
            return NormalizationResult::unchanged(String::new(), 0);
        }

        // 1. 行尾统一
        let mut current = normalize_line_endings(text);

        // 2. 字符混淆纠正（可选）
        if self.options.correct_confusions {
            current = correct_confusions(&current);
        }

        // 3. 空白折叠（保留换行）
        current = collapse_whitespace(&current);

        // 4. 关键词 → 命令
        current = substitute_keywords(&current);

        // 5. Unicode 符号替换
        current = substitute_symbols(&current);

        // 6. 结构推断
        current = infer_structure(&current);

        // 7. 包裹决策
        let (wrapped, wrap) = wrap_math(current);

        let elapsed_us = start.elapsed().as_micros() as u64;
        let changed = wrapped != text;

        NormalizationResult {
            text: wrapped,
            changed,
            wrap,
            elapsed_us,
        }
    }

    /// 只取规范化后的字符串
    pub fn normalize_text(&self, text: &str) -> String {
        self.normalize(text).text
    }
}

/// 阶段 1：把所有换行变体统一为 `\n`
pub(crate) fn normalize_line_endings(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

/// 阶段 2：字符混淆纠正
///
/// 严格按 [`CONFUSION_RULES`] 的声明顺序逐条全局替换，
/// 不能合并为单趟，后面的规则假定前面的已经执行
pub(crate) fn correct_confusions(text: &str) -> String {
    let mut result = text.to_string();
    for (from, to) in CONFUSION_RULES {
        result = result.replace(from, to);
    }
    result
}

/// 阶段 3：折叠水平空白
///
/// 逐行折叠并去除行首尾空白，`\n` 作为独立记号保留，
/// 阶段 6 的多行检测依赖它
pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split('\n')
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .collect::<Vec<_>>()
        .join("\n")
}

/// 阶段 4：整词匹配的关键词改写（前缀反斜杠，保留原词字符）
pub(crate) fn substitute_keywords(text: &str) -> String {
    KEYWORD_RE.replace_all(text, "\\$1").into_owned()
}

/// 阶段 5：Unicode 数学符号替换
///
/// 替换结果带尾随空格避免粘连，替换后重新折叠一次清理多余空格
pub(crate) fn substitute_symbols(text: &str) -> String {
    let mut result = text.to_string();
    for (symbol, command) in SYMBOL_RULES {
        result = result.replace(symbol, command);
    }
    collapse_whitespace(&result)
}

/// 阶段 6：结构推断
///
/// 分数（数字规则先行）→ 上下标补花括号 → 多行方程组连接
pub(crate) fn infer_structure(text: &str) -> String {
    let current = DIGIT_FRAC_RE
        .replace_all(text, "\\frac{${1}}{${2}}")
        .into_owned();
    let current = WORD_FRAC_RE
        .replace_all(&current, "\\frac{${1}}{${2}}")
        .into_owned();
    let current = SUPERSCRIPT_RE
        .replace_all(&current, "${1}^{${2}}")
        .into_owned();
    let current = SUBSCRIPT_RE
        .replace_all(&current, "${1}_{${2}}")
        .into_owned();
    join_equation_rows(&current)
}

/// 多行方程组检测
///
/// 仅当同时存在换行和（等号或分数命令）时才触发，
/// 避免把普通多行文本当作方程组
fn join_equation_rows(text: &str) -> String {
    let looks_like_system =
        text.contains('\n') && (text.contains('=') || text.contains("\\frac"));
    if !looks_like_system {
        return text.to_string();
    }

    text.split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(ROW_SEPARATOR)
}

/// 阶段 7：数学模式包裹决策
///
/// 已带定界符的输入绝不重复包裹
pub(crate) fn wrap_math(text: String) -> (String, MathWrap) {
    let has_math = text.contains('=')
        || text.contains('\\')
        || text.contains('^')
        || text.contains('_');

    if !has_math {
        return (text, MathWrap::Plain);
    }

    // 防二次包裹守卫
    if text.starts_with("$$") || text.starts_with("\\begin{align") {
        return (text, MathWrap::Preserved);
    }

    if text.contains(ROW_SEPARATOR) {
        let wrapped = format!("\\begin{{align*}}{}\\end{{align*}}", text);
        (wrapped, MathWrap::Align)
    } else {
        let wrapped = format!("$${}$$", text);
        (wrapped, MathWrap::Display)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_function_keyword() {
        let engine = LatexNormalizer::default();

        let result = engine.normalize("sin x = 1");
        assert!(result.changed);
        assert!(result.text.contains("\\sin"));
        assert!(result.text.starts_with("$$"));
        assert!(result.text.ends_with("$$"));
        assert_eq!(result.wrap, MathWrap::Display);
    }

    #[test]
    fn test_normalize_digit_fraction() {
        let engine = LatexNormalizer::default();

        let result = engine.normalize("3/4");
        assert!(result.text.contains("\\frac{3}{4}"));
    }

    #[test]
    fn test_normalize_word_fraction() {
        let engine = LatexNormalizer::default();

        let result = engine.normalize("x / y");
        assert!(result.text.contains("\\frac{x}{y}"));
    }

    #[test]
    fn test_normalize_superscript() {
        let engine = LatexNormalizer::default();

        let result = engine.normalize("x^2");
        assert!(result.text.contains("x^{2}"));
    }

    #[test]
    fn test_normalize_subscript() {
        let engine = LatexNormalizer::default();

        let result = engine.normalize("a_1");
        assert!(result.text.contains("a_{1}"));
    }

    #[test]
    fn test_braced_superscript_untouched() {
        // 已有花括号的上标不应再次加括号
        assert_eq!(infer_structure("x^{2}"), "x^{2}");
    }

    #[test]
    fn test_normalize_equation_system() {
        let engine = LatexNormalizer::default();

        let result = engine.normalize("a=1\nb=2");
        assert!(result.text.contains(" \\\\ "));
        assert!(result.text.starts_with("\\begin{align*}"));
        assert!(result.text.ends_with("\\end{align*}"));
        assert!(!result.text.starts_with("$$"));
        assert_eq!(result.wrap, MathWrap::Align);
    }

    #[test]
    fn test_multiline_prose_not_joined() {
        // 有换行但没有等号 / 分数命令，不应当作方程组
        let engine = LatexNormalizer::default();

        let result = engine.normalize("hello\nworld");
        assert!(result.text.contains('\n'));
        assert_eq!(result.wrap, MathWrap::Plain);
    }

    #[test]
    fn test_word_boundary_guard() {
        let engine = LatexNormalizer::default();

        // "pi" 不得在 "pineapple" 内部命中
        let result = engine.normalize("pineapple");
        assert_eq!(result.text, "pineapple");
        assert!(!result.changed);
    }

    #[test]
    fn test_non_math_input_passthrough() {
        let engine = LatexNormalizer::default();

        // 无 = / 反斜杠 / ^ / _ 的输入：输出等于空白折叠后的原文，不包裹
        let result = engine.normalize("hello    world");
        assert_eq!(result.text, "hello world");
        assert_eq!(result.wrap, MathWrap::Plain);
    }

    #[test]
    fn test_unicode_symbols() {
        let engine = LatexNormalizer::default();

        let result = engine.normalize("a ≤ b");
        assert!(result.text.contains("\\leq"));
        assert!(!result.text.contains("  "));

        let result = engine.normalize("x × y ÷ z");
        assert!(result.text.contains("\\times"));
        assert!(result.text.contains("\\div"));
    }

    #[test]
    fn test_double_wrap_guard_display() {
        let engine = LatexNormalizer::default();

        let once = engine.normalize("x^2").text;
        let twice = engine.normalize(&once);
        assert_eq!(twice.text, once);
        assert_eq!(twice.wrap, MathWrap::Preserved);
    }

    #[test]
    fn test_double_wrap_guard_align() {
        let engine = LatexNormalizer::default();

        let once = engine.normalize("a=1\nb=2").text;
        let twice = engine.normalize(&once);
        assert!(twice.text.starts_with("\\begin{align*}"));
        assert!(!twice.text.contains("\\begin{align*}\\begin{align*}"));
    }

    #[test]
    fn test_line_ending_normalization() {
        assert_eq!(normalize_line_endings("a\r\nb\rc"), "a\nb\nc");
    }

    #[test]
    fn test_confusion_corrections_ordered() {
        // 默认关闭
        let engine = LatexNormalizer::default();
        assert_eq!(engine.normalize("lO").text, "lO");

        // 开启后逐条按序执行
        assert_eq!(correct_confusions("lO"), "10");
        assert_eq!(correct_confusions("|I"), "11");
        // 顺序敏感：o → 0 先于 p → %，"po" 得到 "%0" 而不是 "%o"
        assert_eq!(correct_confusions("po"), "%0");
    }

    #[test]
    fn test_confusion_enabled_pipeline() {
        let engine = LatexNormalizer::new(NormalizerOptions {
            correct_confusions: true,
        });

        let result = engine.normalize("x = lO");
        assert!(result.text.contains("x = 10"));
        assert_eq!(result.wrap, MathWrap::Display);
    }

    #[test]
    fn test_digit_fraction_precedes_word_rule() {
        // 数字规则先执行，两者同时存在时数字分数不被通用规则抢占
        let out = infer_structure("3/4 and x/y");
        assert!(out.contains("\\frac{3}{4}"));
        assert!(out.contains("\\frac{x}{y}"));
    }

    #[test]
    fn test_performance() {
        let engine = LatexNormalizer::default();

        let text = "sum of alpha^2 / beta_1 ≤ pi\nlim x = ∞";
        let result = engine.normalize(text);

        // 目标 <10ms = 10000us
        assert!(
            result.elapsed_us < 10_000,
            "耗时 {}us 超过 10ms",
            result.elapsed_us
        );
    }

    #[test]
    fn test_empty_input() {
        let engine = LatexNormalizer::default();

        let result = engine.normalize("");
        assert_eq!(result.text, "");
        assert!(!result.changed);
    }
}
