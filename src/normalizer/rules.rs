//! 规范化规则表
//!
//! 包含字符混淆纠正表、数学关键词表、希腊字母表、Unicode 符号映射表。
//! 所有表都是进程级静态配置，运行期不可变。

/// 字符混淆纠正规则（阶段 2）
///
/// 顺序敏感：后面的规则假定前面的规则已经执行，
/// 必须严格按声明顺序逐条应用，不能合并为单趟替换。
///
/// 这些是全局盲替换，只针对识别引擎的系统性混淆方向
/// （把误识出的字符换回本意字符），对含有同名字母的
/// 正常文本有破坏性，因此整个阶段默认关闭。
pub(crate) const CONFUSION_RULES: &[(&str, &str)] = &[
    // 字母 O 误识自数字 0
    ("O", "0"),
    ("o", "0"),
    // 竖线 / 小写 l / 大写 I 误识自数字 1
    ("|", "1"),
    ("l", "1"),
    ("I", "1"),
    // 字母 p 误识自百分号（必须放在最后，避免影响上面的字母规则）
    ("p", "%"),
];

/// 数学函数 / 运算符关键词（阶段 4）
///
/// 命中后在原词前加反斜杠，保留原词字符
pub(crate) const FUNCTION_KEYWORDS: &[&str] = &[
    "sum", "int", "lim", "sin", "cos", "tan", "ln", "log", "sqrt",
];

/// 希腊字母名称（标准 12 字母子集，阶段 4）
pub(crate) const GREEK_KEYWORDS: &[&str] = &[
    "alpha", "beta", "gamma", "delta", "epsilon", "theta", "lambda", "mu",
    "pi", "sigma", "phi", "omega",
];

/// Unicode 数学符号映射（阶段 5）
///
/// 替换结果带尾随空格，避免命令与后续字母粘连（如 `a≤b` → `a\leq b`）
pub(crate) const SYMBOL_RULES: &[(&str, &str)] = &[
    ("≤", "\\leq "),
    ("≥", "\\geq "),
    ("≠", "\\neq "),
    ("±", "\\pm "),
    ("∞", "\\infty "),
    ("∈", "\\in "),
    ("∑", "\\sum "),
    ("∫", "\\int "),
    ("√", "\\sqrt "),
    ("×", "\\times "),
    ("÷", "\\div "),
];

/// 多行方程组的行连接标记（阶段 6 / 阶段 7 共用）
pub(crate) const ROW_SEPARATOR: &str = " \\\\ ";

/// 构造阶段 4 的关键词整体匹配模式（大小写不敏感 + 双侧词边界）
pub(crate) fn keyword_pattern() -> String {
    let mut words: Vec<&str> = FUNCTION_KEYWORDS
        .iter()
        .chain(GREEK_KEYWORDS.iter())
        .copied()
        .collect();
    // 长词优先，避免备选分支之间的前缀遮蔽
    words.sort_by_key(|w| std::cmp::Reverse(w.len()));
    format!(r"(?i)\b({})\b", words.join("|"))
}
