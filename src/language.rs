//! 界面语言协商。
//!
//! 优先级（先命中者胜出，不做组合）：查询参数 → Cookie → `Accept-Language` → 进程默认语言。

use log::debug;
use std::fmt;

/// 决定界面语言的信号来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageSelector {
    QueryParam,
    Cookie,
    AcceptLanguageHeader,
    Default,
}

impl fmt::Display for LanguageSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            LanguageSelector::QueryParam => write!(f, "query parameter"),
            LanguageSelector::Cookie => write!(f, "cookie"),
            LanguageSelector::AcceptLanguageHeader => write!(f, "Accept-Language header"),
            LanguageSelector::Default => write!(f, "default"),
        }
    }
}

/// 协商得到的语言及其来源
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserLanguage {
    pub selected_by: LanguageSelector,
    pub lang: String,
}

/// 服务器支持的语言集合与默认语言，由配置提供。
#[derive(Debug, Clone)]
pub struct LanguageSettings {
    default_language: String,
    supported: Vec<String>,
}

impl LanguageSettings {
    pub fn new(default_language: &str, supported: &[String]) -> Self {
        Self {
            default_language: default_language.to_string(),
            supported: supported.to_vec(),
        }
    }

    pub fn default_language(&self) -> &str {
        &self.default_language
    }

    /// 在支持列表中查找标签：先精确匹配，再按主子标签（`fr-CH` → `fr`）匹配。
    fn find_supported(&self, tag: &str) -> Option<&str> {
        if let Some(lang) = self
            .supported
            .iter()
            .find(|s| s.eq_ignore_ascii_case(tag))
        {
            return Some(lang);
        }
        let primary = tag.split('-').next().unwrap_or(tag);
        self.supported
            .iter()
            .find(|s| s.eq_ignore_ascii_case(primary))
            .map(|s| s.as_str())
    }

    /// 按质量值从高到低挑选第一个受支持的语言
    pub fn best_match(&self, accept_language: &str) -> Option<String> {
        parse_accept_language(accept_language)
            .into_iter()
            .find_map(|tag| match self.find_supported(&tag) {
                Some(lang) => Some(lang.to_string()),
                None => {
                    debug!("不受支持的Accept-Language条目：{}", tag);
                    None
                }
            })
    }
}

impl Default for LanguageSettings {
    fn default() -> Self {
        Self::new("en", &["en".to_string()])
    }
}

/// 语言标签只允许 ASCII 字母数字与 `-`
pub fn is_language_tag(tag: &str) -> bool {
    !tag.is_empty() && tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

/// 把 `Accept-Language` 头解析成按质量值降序排列的语言标签列表。
///
/// 质量值相同时保持原有顺序；`q=0`、通配符 `*` 以及无法解析的条目都会被跳过。
pub fn parse_accept_language(header: &str) -> Vec<String> {
    let mut ranked: Vec<(f32, String)> = vec![];
    for entry in header.split(',') {
        let mut parts = entry.split(';');
        let tag = parts.next().unwrap_or("").trim();
        if tag.is_empty() || tag == "*" {
            continue;
        }
        if !is_language_tag(tag) {
            continue;
        }
        let mut quality = 1.0f32;
        let mut well_formed = true;
        for param in parts {
            if let Some(q) = param.trim().strip_prefix("q=") {
                match q.trim().parse::<f32>() {
                    Ok(v) if (0.0..=1.0).contains(&v) => quality = v,
                    _ => well_formed = false,
                }
            }
        }
        if well_formed && quality > 0.0 {
            ranked.push((quality, tag.to_string()));
        }
    }
    ranked.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    ranked.into_iter().map(|(_, tag)| tag).collect()
}
