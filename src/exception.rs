// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # Exception 模块
//!
//! 该模块定义了请求解析、参数提取、结果渲染过程中可能出现的各类异常情况。
//!
//! ## 设计意图
//! - **严格访问器**：`KeyError` / `IndexError` / `ConversionFailed` 由请求上下文的严格访问器返回，
//!   `get_optional_param` 会把它们统一吞掉并换成调用方给出的默认值。
//! - **协议层**：`RequestIsNotUtf8` / `MalformedRequestLine` 在读取原始报文时产生，`InvalidUrl`
//!   由分发层在目标不在挂载点下时产生。
//! - **协作方**：`RenderFailed` / `BookNotFound` / `LibraryLoadFailed` 来自模板渲染器与书库。

use std::fmt;

/// 服务器处理请求过程中发生的异常类型。
///
/// 该枚举通常作为 `Result` 的 `Err` 部分返回，用于指示处理失败的具体原因。
#[derive(Debug, Clone, PartialEq)]
pub enum Exception {
    /// 客户端发送的请求字节流无法解析为合法的 UTF-8 字符串。
    RequestIsNotUtf8,
    /// 请求行不是 `方法 目标 版本` 的形式。
    MalformedRequestLine,
    /// 参数、请求头或 Cookie 不存在。
    KeyError(String),
    /// 对多段 URL 或多值参数的位置访问越界。
    IndexError(usize),
    /// 参数存在，但无法转换为调用方要求的类型。
    ConversionFailed {
        name: String,
        value: String,
        target: &'static str,
    },
    /// 请求目标无法解析为可用的 URL（不在挂载点下、非 UTF-8 等）。对应 `400 Bad Request`。
    InvalidUrl(String),
    /// 模板渲染器报告的错误，对当前请求是致命的。
    RenderFailed(String),
    /// 书库中找不到给定 ID 的书。
    BookNotFound(String),
    /// 无法从磁盘载入书库描述文件。
    LibraryLoadFailed(String),
}

use Exception::*;

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestIsNotUtf8 => write!(f, "Request bytes can't be parsed in UTF-8"),
            MalformedRequestLine => write!(f, "Malformed HTTP request line"),
            KeyError(name) => write!(f, "No such key: {}", name),
            IndexError(index) => write!(f, "Index out of range: {}", index),
            ConversionFailed {
                name,
                value,
                target,
            } => write!(
                f,
                "Argument {} with value '{}' can't be converted to {}",
                name, value, target
            ),
            InvalidUrl(url) => write!(f, "Invalid url (400): {}", url),
            RenderFailed(msg) => write!(f, "Template rendering failed: {}", msg),
            BookNotFound(id) => write!(f, "No book with id {}", id),
            LibraryLoadFailed(msg) => write!(f, "Couldn't load library: {}", msg),
        }
    }
}

impl std::error::Error for Exception {}
