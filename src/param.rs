// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 协议参数与常量模块
//!
//! 该模块定义了 `archive-server` 遵循的 HTTP 协议相关常量和数据结构，包括：
//! - 常见的 HTTP 状态码及其原因短语（Reason Phrase）。
//! - 归档内容常见的 MIME 类型映射表。
//! - HTTP 方法、内容编码的强类型枚举。
//! - 请求参数名、Cookie 名以及分页长度限制。

use lazy_static::lazy_static;
use std::collections::HashMap;

/// 服务器名称标识，用于 HTTP 响应头的 `Server` 字段
pub const SERVER_NAME: &str = "archive-server";

/// HTTP 协议规定的换行符（Carriage Return Line Feed）
pub const CRLF: &str = "\r\n";

/// 响应使用的协议版本
pub const HTTP_VERSION: &str = "HTTP/1.1";

/// 显式指定界面语言的查询参数名，同时也是持久化语言选择的 Cookie 名
pub const USER_LANGUAGE_KEY: &str = "userlang";

/// 显式指定输出格式的查询参数名
pub const FORMAT_KEY: &str = "format";

/// 每页搜索结果的默认条数
pub const DEFAULT_PAGE_LENGTH: u32 = 25;

/// 每页搜索结果条数的上限
pub const MAX_PAGE_LENGTH: u32 = 140;

lazy_static! {
    /// 服务器当前允许处理的 HTTP 方法列表。
    ///
    /// 不在该列表中的方法将触发 405 Method Not Allowed。
    pub static ref ALLOWED_METHODS: Vec<HttpRequestMethod> = {
        vec![HttpRequestMethod::Get, HttpRequestMethod::Head]
    };
}

lazy_static! {
    /// HTTP 状态码与其对应的标准原因短语映射表。
    ///
    /// 参考标准：[RFC 9110: HTTP Semantics](https://www.rfc-editor.org/rfc/rfc9110.html)。
    pub static ref STATUS_CODES: HashMap<u16, &'static str> = {
        let mut map = HashMap::new();
        map.insert(200, "OK");
        map.insert(204, "No Content");
        map.insert(206, "Partial Content");
        map.insert(304, "Not Modified");
        map.insert(400, "Bad Request");
        map.insert(403, "Forbidden");
        map.insert(404, "Not Found");
        map.insert(405, "Method Not Allowed");
        map.insert(406, "Not Acceptable");
        map.insert(416, "Range Not Satisfiable");
        map.insert(500, "Internal Server Error");
        map.insert(501, "Not Implemented");
        map.insert(503, "Service Unavailable");
        map
    };
}

lazy_static! {
    /// 文件后缀名到 MIME 类型（Media Type）的映射表。
    ///
    /// 用于为归档内的条目设置 `Content-Type`。
    pub static ref MIME_TYPES: HashMap<&'static str, &'static str> = {
        let mut map = HashMap::new();
        map.insert("css", "text/css;charset=utf-8");
        map.insert("gif", "image/gif");
        map.insert("htm", "text/html;charset=utf-8");
        map.insert("html", "text/html;charset=utf-8");
        map.insert("ico", "image/x-icon");
        map.insert("js", "text/javascript;charset=utf-8");
        map.insert("json", "application/json");
        map.insert("jpg", "image/jpeg");
        map.insert("jpeg", "image/jpeg");
        map.insert("mp3", "audio/mpeg");
        map.insert("mp4", "video/mp4");
        map.insert("pdf", "application/pdf");
        map.insert("png", "image/png");
        map.insert("svg", "image/svg+xml");
        map.insert("txt", "text/plain;charset=utf-8");
        map.insert("webm", "video/webm");
        map.insert("webp", "image/webp");
        map.insert("woff2", "font/woff2");
        map.insert("xml", "text/xml");
        // 兜底类型（归档条目大多是无后缀的文章）
        map.insert("_", "text/html;charset=utf-8");
        map
    };
}

/// 标准 HTTP 请求方法。无法识别的方法归入 `Other`，而不是让解析失败。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpRequestMethod {
    Get,
    Head,
    Post,
    Put,
    Delete,
    Connect,
    Options,
    Trace,
    Patch,
    Other,
}

impl HttpRequestMethod {
    /// 从请求行中的方法名解析，大小写不敏感。
    pub fn from_token(token: &str) -> Self {
        match token.to_uppercase().as_str() {
            "GET" => HttpRequestMethod::Get,
            "HEAD" => HttpRequestMethod::Head,
            "POST" => HttpRequestMethod::Post,
            "PUT" => HttpRequestMethod::Put,
            "DELETE" => HttpRequestMethod::Delete,
            "CONNECT" => HttpRequestMethod::Connect,
            "OPTIONS" => HttpRequestMethod::Options,
            "TRACE" => HttpRequestMethod::Trace,
            "PATCH" => HttpRequestMethod::Patch,
            _ => HttpRequestMethod::Other,
        }
    }

    /// 该方法的请求体是否可能携带表单参数
    pub fn carries_form_body(&self) -> bool {
        matches!(
            self,
            HttpRequestMethod::Post | HttpRequestMethod::Put | HttpRequestMethod::Patch
        )
    }
}

/// 支持的内容编码（压缩）格式
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HttpEncoding {
    /// GNU zip 压缩
    Gzip,
}

use std::fmt;

impl fmt::Display for HttpRequestMethod {
    /// 将枚举格式化为 HTTP 标准大写方法名
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match *self {
            HttpRequestMethod::Get => "GET",
            HttpRequestMethod::Head => "HEAD",
            HttpRequestMethod::Post => "POST",
            HttpRequestMethod::Put => "PUT",
            HttpRequestMethod::Delete => "DELETE",
            HttpRequestMethod::Connect => "CONNECT",
            HttpRequestMethod::Options => "OPTIONS",
            HttpRequestMethod::Trace => "TRACE",
            HttpRequestMethod::Patch => "PATCH",
            HttpRequestMethod::Other => "OTHER",
        };
        write!(f, "{}", name)
    }
}

impl fmt::Display for HttpEncoding {
    /// 将枚举格式化为 `Content-Encoding` 头所使用的标识符
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            HttpEncoding::Gzip => write!(f, "gzip"),
        }
    }
}
