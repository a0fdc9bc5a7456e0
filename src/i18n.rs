// ==========================================
// 国际化 (i18n) 模块
// ==========================================
// 使用 rust-i18n 库
// 支持中文（默认）和英文
// ==========================================
// 注意: rust_i18n::i18n! 宏已在 lib.rs 中初始化
// ==========================================

/// 支持的语言
pub const SUPPORTED_LOCALES: [&str; 2] = ["zh-CN", "en"];

/// 获取当前语言
pub fn current_locale() -> String {
    rust_i18n::locale().to_string()
}

/// 设置语言
///
/// # 参数
/// - locale: 语言代码（"zh-CN" 或 "en"）
pub fn set_locale(locale: &str) {
    rust_i18n::set_locale(locale);
}

/// 翻译消息（当前语言）
pub fn t(key: &str) -> String {
    rust_i18n::t!(key).to_string()
}

/// 翻译消息（指定语言，不修改全局语言）
///
/// 审计文档按配置语言渲染，与进程当前语言无关。
pub fn t_in(key: &str, locale: &str) -> String {
    rust_i18n::t!(key, locale = locale).to_string()
}

/// 规范化语言代码，未知语言回退到 zh-CN
///
/// 先精确匹配（忽略大小写），再按主语言子标签匹配（en-US → en，zh → zh-CN）。
pub fn normalize_locale(locale: &str) -> &'static str {
    let trimmed = locale.trim();
    let primary = |tag: &str| tag.split(['-', '_']).next().unwrap_or("").to_ascii_lowercase();

    SUPPORTED_LOCALES
        .iter()
        .copied()
        .find(|l| l.eq_ignore_ascii_case(trimmed))
        .or_else(|| {
            let wanted = primary(trimmed);
            SUPPORTED_LOCALES
                .iter()
                .copied()
                .find(|l| !wanted.is_empty() && primary(l) == wanted)
        })
        .unwrap_or("zh-CN")
}
