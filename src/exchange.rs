// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 原始 HTTP 交换模块
//!
//! 负责把 TCP 流中读取的原始字节切分为请求行、按到达顺序排列的请求头键值对以及请求体。
//! 这里不做任何语义解释：大小写折叠、重复键处理、参数解码都留给 `RequestContext`。

use crate::{exception::Exception, param::CRLF};
use log::{debug, error};

/// 一次 HTTP 交换的原始视图。
#[derive(Debug, Clone)]
pub struct HttpExchange {
    /// 请求行中的方法名，原样保留
    method: String,
    /// 请求目标（路径 + 可选的查询字符串）
    target: String,
    /// 协议版本字符串，如 `HTTP/1.1`
    version: String,
    /// 请求头，按到达顺序保留，允许重复
    headers: Vec<(String, String)>,
    /// 请求体
    body: String,
}

impl HttpExchange {
    pub fn new(
        method: &str,
        target: &str,
        version: &str,
        headers: Vec<(String, String)>,
        body: &str,
    ) -> Self {
        Self {
            method: method.to_string(),
            target: target.to_string(),
            version: version.to_string(),
            headers,
            body: body.to_string(),
        }
    }

    /// 从原始字节缓冲区构建 `HttpExchange`。
    ///
    /// # 逻辑步骤
    /// 1. 验证编码：确保请求数据是合法的 UTF-8 字符串。
    /// 2. 在第一个空行处分离报文头与请求体。
    /// 3. 解析请求行：提取方法、目标和协议版本。
    /// 4. 逐行收集请求头；格式不正确的行直接丢弃，不影响整体解析。
    pub fn try_from(buffer: &[u8], id: u128) -> Result<Self, Exception> {
        let request_string = match std::str::from_utf8(buffer) {
            Ok(string) => string,
            Err(_) => {
                error!("[ID{}]无法解析HTTP请求", id);
                return Err(Exception::RequestIsNotUtf8);
            }
        };

        let separator = [CRLF, CRLF].concat();
        let (head, body) = match request_string.split_once(separator.as_str()) {
            Some((head, body)) => (head, body),
            None => (request_string, ""),
        };

        let mut lines = head.split(CRLF);
        let request_line = lines.next().unwrap_or("");

        // 请求行 (e.g., "GET /index.html HTTP/1.1")
        let parts: Vec<&str> = request_line.split(' ').filter(|p| !p.is_empty()).collect();
        if parts.len() != 3 {
            error!("[ID{}]HTTP请求行格式不正确：{}", id, request_line);
            return Err(Exception::MalformedRequestLine);
        }

        let mut headers = vec![];
        for line in lines {
            match line.split_once(':') {
                Some((name, value)) if !name.trim().is_empty() => {
                    headers.push((name.trim().to_string(), value.trim().to_string()));
                }
                _ => {
                    debug!("[ID{}]丢弃格式不正确的请求头：{}", id, line);
                }
            }
        }

        Ok(Self {
            method: parts[0].to_string(),
            target: parts[1].to_string(),
            version: parts[2].to_string(),
            headers,
            body: body.trim_end_matches('\0').to_string(),
        })
    }
}

// --- Getter 访问器实现 ---

impl HttpExchange {
    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// 按到达顺序遍历请求头
    pub fn headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn body(&self) -> &str {
        &self.body
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 验证常规 GET 请求的解析
    #[test]
    fn test_parse_get_request() {
        let request_str = "GET /search?pattern=rust HTTP/1.1\r\nHost: localhost:7878\r\nUser-Agent: Test-Browser\r\n\r\n";
        let exchange = HttpExchange::try_from(request_str.as_bytes(), 0).unwrap();

        assert_eq!(exchange.method(), "GET");
        assert_eq!(exchange.target(), "/search?pattern=rust");
        assert_eq!(exchange.version(), "HTTP/1.1");
        let headers: Vec<_> = exchange.headers().collect();
        assert_eq!(headers, vec![("Host", "localhost:7878"), ("User-Agent", "Test-Browser")]);
    }

    /// 重复的请求头按到达顺序全部保留
    #[test]
    fn test_duplicate_headers_kept_in_order() {
        let request_str = "GET / HTTP/1.1\r\nX-A: 1\r\nx-a: 2\r\n\r\n";
        let exchange = HttpExchange::try_from(request_str.as_bytes(), 0).unwrap();

        let headers: Vec<_> = exchange.headers().collect();
        assert_eq!(headers, vec![("X-A", "1"), ("x-a", "2")]);
    }

    /// 格式不正确的请求头被丢弃，而不是让整个请求失败
    #[test]
    fn test_malformed_header_dropped() {
        let request_str = "GET / HTTP/1.1\r\nno-colon-here\r\n: empty-name\r\nAccept: */*\r\n\r\n";
        let exchange = HttpExchange::try_from(request_str.as_bytes(), 0).unwrap();

        let headers: Vec<_> = exchange.headers().collect();
        assert_eq!(headers, vec![("Accept", "*/*")]);
    }

    /// 请求体在空行之后，读缓冲区末尾的填充字节被去掉
    #[test]
    fn test_parse_post_body() {
        let mut buffer = b"POST /search HTTP/1.1\r\nContent-Type: application/x-www-form-urlencoded\r\n\r\npattern=a+b".to_vec();
        buffer.extend_from_slice(&[0, 0, 0]);
        let exchange = HttpExchange::try_from(&buffer, 0).unwrap();

        assert_eq!(exchange.method(), "POST");
        assert_eq!(exchange.body(), "pattern=a+b");
    }

    #[test]
    fn test_invalid_utf8() {
        let buffer = vec![0xFF, 0xFE, 0xFD];
        assert_eq!(
            HttpExchange::try_from(&buffer, 0).unwrap_err(),
            Exception::RequestIsNotUtf8
        );
    }

    #[test]
    fn test_malformed_request_line() {
        let request_str = "GET /\r\nHost: localhost\r\n\r\n";
        assert_eq!(
            HttpExchange::try_from(request_str.as_bytes(), 0).unwrap_err(),
            Exception::MalformedRequestLine
        );
    }
}
