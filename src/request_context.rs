// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 请求上下文模块
//!
//! 把一次原始 HTTP 交换解析为不可变的强类型视图，涵盖：
//! 1. 方法、URL（去掉挂载点前缀）、协议版本。
//! 2. 请求头与 Cookie（大小写不敏感、后出现者覆盖先出现者）。
//! 3. 查询参数与表单参数（多值参数按提交顺序保留）。
//! 4. 范围请求、压缩能力、界面语言与输出格式的协商。
//!
//! 构造过程永不失败：单个格式不正确的请求头或 Cookie 被丢弃，整个目标无法解析时
//! 通过 `is_valid_url()` 报告。

use crate::{
    argument::FromArgument,
    byte_range::ByteRange,
    exception::Exception,
    exchange::HttpExchange,
    language::{is_language_tag, LanguageSelector, LanguageSettings, UserLanguage},
    param::*,
};
use log::debug;
use std::{
    collections::{BTreeMap, HashMap},
    fmt,
};
use url::form_urlencoded;

/// 协商得到的输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    Html,
    Json,
    Xml,
}

impl ResponseFormat {
    fn from_argument(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "html" => Some(ResponseFormat::Html),
            "json" => Some(ResponseFormat::Json),
            "xml" | "atom" => Some(ResponseFormat::Xml),
            _ => None,
        }
    }

    fn from_accept(accept: &str) -> Option<Self> {
        if accept.contains("application/json") {
            Some(ResponseFormat::Json)
        } else if accept.contains("application/atom+xml")
            || accept.contains("application/xml")
            || accept.contains("text/xml")
        {
            Some(ResponseFormat::Xml)
        } else {
            None
        }
    }
}

impl fmt::Display for ResponseFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ResponseFormat::Html => write!(f, "html"),
            ResponseFormat::Json => write!(f, "json"),
            ResponseFormat::Xml => write!(f, "xml"),
        }
    }
}

/// 一次请求的完整上下文，构造后不再改变。
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// 全局请求 ID，用于在多线程环境下追踪日志
    id: u128,
    root_location: String,
    /// 请求目标中查询字符串之前的部分，未解码
    full_url: String,
    /// 解码并去掉挂载点之后的路径；为空表示目标无法使用
    url: String,
    method: HttpRequestMethod,
    version: String,
    accept_encoding_gzip: bool,
    byte_range: ByteRange,
    /// 键已转为小写
    headers: HashMap<String, String>,
    cookies: HashMap<String, String>,
    arguments: BTreeMap<String, Vec<String>>,
    query_string: String,
    user_language: UserLanguage,
    requested_format: ResponseFormat,
}

impl RequestContext {
    /// 从原始交换构建上下文。
    ///
    /// # 逻辑步骤
    /// 1. 拆分请求目标：路径、查询字符串；解码路径并去掉挂载点前缀。
    /// 2. 折叠请求头（小写键，后者覆盖前者），从所有 `Cookie` 头中提取 Cookie。
    /// 3. 收集查询参数；对可携带表单的方法追加请求体中的表单字段。
    /// 4. 基于以上结果解析 Range、压缩能力、界面语言与输出格式。
    pub fn new(
        exchange: &HttpExchange,
        root_location: &str,
        languages: &LanguageSettings,
        id: u128,
    ) -> Self {
        let root_location = root_location.trim_end_matches('/').to_string();
        let target = exchange.target();
        let (full_url, query_string) = match target.split_once('?') {
            Some((path, query)) => (path.to_string(), query.to_string()),
            None => (target.to_string(), String::new()),
        };
        let url = strip_root(&full_url, &root_location, id);

        let mut headers = HashMap::new();
        let mut cookies = HashMap::new();
        for (name, value) in exchange.headers() {
            let name = name.to_lowercase();
            if name == "cookie" {
                fill_cookies(&mut cookies, value, id);
            }
            headers.insert(name, value.to_string());
        }

        let method = HttpRequestMethod::from_token(exchange.method());
        let mut arguments: BTreeMap<String, Vec<String>> = BTreeMap::new();
        fill_arguments(&mut arguments, &query_string);
        let is_form = headers
            .get("content-type")
            .map_or(false, |t| t.starts_with("application/x-www-form-urlencoded"));
        if method.carries_form_body() && is_form {
            fill_arguments(&mut arguments, exchange.body());
        }

        let accept_encoding_gzip = headers
            .get("accept-encoding")
            .map_or(false, |e| accepts_gzip(e));
        let byte_range = ByteRange::parse(headers.get("range").map(|r| r.as_str()));

        let mut context = Self {
            id,
            root_location,
            full_url,
            url,
            method,
            version: exchange.version().to_string(),
            accept_encoding_gzip,
            byte_range,
            headers,
            cookies,
            arguments,
            query_string,
            user_language: UserLanguage {
                selected_by: LanguageSelector::Default,
                lang: languages.default_language().to_string(),
            },
            requested_format: ResponseFormat::Html,
        };
        context.user_language = context.determine_user_language(languages);
        context.requested_format = context.determine_requested_format();
        context
    }

    fn determine_user_language(&self, languages: &LanguageSettings) -> UserLanguage {
        match self.first_argument(USER_LANGUAGE_KEY) {
            Some(lang) if is_language_tag(lang) => {
                return UserLanguage {
                    selected_by: LanguageSelector::QueryParam,
                    lang: lang.to_string(),
                };
            }
            Some(lang) => debug!("[ID{}]忽略格式不正确的userlang参数：{:?}", self.id, lang),
            None => {}
        }
        match self.cookies.get(USER_LANGUAGE_KEY) {
            Some(lang) if is_language_tag(lang) => {
                return UserLanguage {
                    selected_by: LanguageSelector::Cookie,
                    lang: lang.to_string(),
                };
            }
            Some(lang) => debug!("[ID{}]忽略格式不正确的userlang Cookie：{:?}", self.id, lang),
            None => {}
        }
        if let Some(header) = self.headers.get("accept-language") {
            if let Some(lang) = languages.best_match(header) {
                return UserLanguage {
                    selected_by: LanguageSelector::AcceptLanguageHeader,
                    lang,
                };
            }
        }
        UserLanguage {
            selected_by: LanguageSelector::Default,
            lang: languages.default_language().to_string(),
        }
    }

    fn determine_requested_format(&self) -> ResponseFormat {
        if let Some(format) = self
            .first_argument(FORMAT_KEY)
            .and_then(ResponseFormat::from_argument)
        {
            return format;
        }
        self.headers
            .get("accept")
            .and_then(|a| ResponseFormat::from_accept(a))
            .unwrap_or(ResponseFormat::Html)
    }

    fn first_argument(&self, name: &str) -> Option<&str> {
        self.arguments
            .get(name)
            .and_then(|values| values.first())
            .map(|v| v.as_str())
    }

    /// 把解析结果输出到 debug 日志
    pub fn print_debug_info(&self) {
        debug!("[ID{}]method: {} ({})", self.id, self.method, self.version);
        debug!("[ID{}]full_url: {}", self.id, self.full_url);
        debug!("[ID{}]url: {}", self.id, self.url);
        debug!("[ID{}]acceptEncodingGzip: {}", self.id, self.accept_encoding_gzip);
        debug!("[ID{}]headers:", self.id);
        for (name, value) in &self.headers {
            debug!("[ID{}] - {}: {}", self.id, name, value);
        }
        debug!("[ID{}]cookies:", self.id);
        for (name, value) in &self.cookies {
            debug!("[ID{}] - {}: {}", self.id, name, value);
        }
        debug!("[ID{}]arguments:", self.id);
        for (name, values) in &self.arguments {
            debug!("[ID{}] - {}: {:?}", self.id, name, values);
        }
        debug!("[ID{}]range: {:?}", self.id, self.byte_range);
        debug!(
            "[ID{}]userlang: {} (from {})",
            self.id, self.user_language.lang, self.user_language.selected_by
        );
        debug!("[ID{}]format: {}", self.id, self.requested_format);
    }
}

/// 解码路径并去掉挂载点前缀；不在挂载点之下或解码失败时返回空串。
fn strip_root(full_url: &str, root_location: &str, id: u128) -> String {
    let decoded = match urlencoding::decode(full_url) {
        Ok(d) => d.into_owned(),
        Err(_) => {
            debug!("[ID{}]URL解码失败：{}", id, full_url);
            return String::new();
        }
    };
    match decoded.strip_prefix(root_location) {
        Some(rest) if rest.is_empty() => "/".to_string(),
        Some(rest) if rest.starts_with('/') => rest.to_string(),
        _ => {
            debug!("[ID{}]URL不在挂载点{}之下：{}", id, root_location, full_url);
            String::new()
        }
    }
}

fn fill_cookies(cookies: &mut HashMap<String, String>, header: &str, id: u128) {
    for pair in header.split(';') {
        match pair.split_once('=') {
            Some((name, value)) if !name.trim().is_empty() => {
                cookies.insert(name.trim().to_string(), value.trim().to_string());
            }
            _ => {
                debug!("[ID{}]丢弃格式不正确的Cookie：{}", id, pair);
            }
        }
    }
}

fn fill_arguments(arguments: &mut BTreeMap<String, Vec<String>>, encoded: &str) {
    for (name, value) in form_urlencoded::parse(encoded.as_bytes()) {
        if name.is_empty() {
            continue;
        }
        arguments
            .entry(name.into_owned())
            .or_default()
            .push(value.into_owned());
    }
}

fn accepts_gzip(accept_encoding: &str) -> bool {
    accept_encoding.split(',').any(|entry| {
        let mut parts = entry.split(';');
        let coding = parts.next().unwrap_or("").trim();
        let disabled = parts.any(|p| {
            p.trim()
                .strip_prefix("q=")
                .and_then(|q| q.trim().parse::<f32>().ok())
                .map_or(false, |q| q == 0.0)
        });
        coding.eq_ignore_ascii_case("gzip") && !disabled
    })
}

// --- Getter 访问器实现 ---

impl RequestContext {
    pub fn request_id(&self) -> u128 {
        self.id
    }

    /// 请求目标能否被后续处理使用
    pub fn is_valid_url(&self) -> bool {
        !self.url.is_empty()
    }

    pub fn get_method(&self) -> HttpRequestMethod {
        self.method
    }

    /// 去掉挂载点之后的解码路径
    pub fn get_url(&self) -> &str {
        &self.url
    }

    /// 路径中第 `part` 段（从 0 开始），如 `/raw/wiki/A/B` 的第 1 段是 `wiki`
    pub fn get_url_part(&self, part: usize) -> Result<&str, Exception> {
        self.url
            .get(1..)
            .unwrap_or("")
            .split('/')
            .nth(part)
            .ok_or(Exception::IndexError(part))
    }

    pub fn get_full_url(&self) -> &str {
        &self.full_url
    }

    pub fn get_root_path(&self) -> &str {
        &self.root_location
    }

    pub fn get_version(&self) -> &str {
        &self.version
    }

    /// 大小写不敏感地读取请求头
    pub fn get_header(&self, name: &str) -> Result<&str, Exception> {
        self.headers
            .get(&name.to_lowercase())
            .map(|v| v.as_str())
            .ok_or_else(|| Exception::KeyError(name.to_string()))
    }

    pub fn get_cookie(&self, name: &str) -> Result<&str, Exception> {
        self.cookies
            .get(name)
            .map(|v| v.as_str())
            .ok_or_else(|| Exception::KeyError(name.to_string()))
    }

    /// 参数的第一个值，按 `T` 转换。
    pub fn get_argument<T: FromArgument>(&self, name: &str) -> Result<T, Exception> {
        let value = self
            .first_argument(name)
            .ok_or_else(|| Exception::KeyError(name.to_string()))?;
        T::from_argument(value).ok_or_else(|| Exception::ConversionFailed {
            name: name.to_string(),
            value: value.to_string(),
            target: T::TYPE_NAME,
        })
    }

    /// 多值参数中第 `index` 个值（从 0 开始）
    pub fn get_argument_at(&self, name: &str, index: usize) -> Result<&str, Exception> {
        self.get_arguments(name)?
            .get(index)
            .map(|v| v.as_str())
            .ok_or(Exception::IndexError(index))
    }

    /// 参数的全部值，按提交顺序排列；存在即至少有一个值
    pub fn get_arguments(&self, name: &str) -> Result<&[String], Exception> {
        self.arguments
            .get(name)
            .map(|values| values.as_slice())
            .ok_or_else(|| Exception::KeyError(name.to_string()))
    }

    /// 与 `get_argument` 相同，但任何失败都换成 `default`
    pub fn get_optional_param<T: FromArgument>(&self, name: &str, default: T) -> T {
        self.get_argument(name).unwrap_or(default)
    }

    /// 原样的查询字符串
    pub fn get_query(&self) -> &str {
        &self.query_string
    }

    /// 只保留名字满足 `filter` 的参数，重新编码为查询字符串。
    pub fn get_query_filtered<F>(&self, filter: F) -> String
    where
        F: Fn(&str) -> bool,
    {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (name, values) in &self.arguments {
            if !filter(name) {
                continue;
            }
            for value in values {
                serializer.append_pair(name, value);
            }
        }
        serializer.finish()
    }

    pub fn get_range(&self) -> &ByteRange {
        &self.byte_range
    }

    pub fn can_compress(&self) -> bool {
        self.accept_encoding_gzip
    }

    pub fn get_user_language(&self) -> &str {
        &self.user_language.lang
    }

    pub fn user_language_selector(&self) -> LanguageSelector {
        self.user_language.selected_by
    }

    pub fn user_language_comes_from_cookie(&self) -> bool {
        self.user_language.selected_by == LanguageSelector::Cookie
    }

    /// 需要写回 `userlang` Cookie 的语言：只有来自查询参数或 `Accept-Language` 时才写回
    pub fn language_cookie(&self) -> Option<&str> {
        match self.user_language.selected_by {
            LanguageSelector::QueryParam | LanguageSelector::AcceptLanguageHeader
                if is_language_tag(&self.user_language.lang) =>
            {
                Some(&self.user_language.lang)
            }
            _ => None,
        }
    }

    pub fn get_requested_format(&self) -> ResponseFormat {
        self.requested_format
    }
}
