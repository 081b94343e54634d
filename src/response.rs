use crate::{byte_range::ResolvedRange, param::*, util::HtmlBuilder};

use bytes::Bytes;
use chrono::prelude::*;
use flate2::{write::GzEncoder, Compression};
use log::{debug, error};

use std::io::{self, Write};

#[derive(Debug, Clone)]
pub struct Response {
    status_code: u16,
    information: String,
    content_type: Option<String>,
    content_length: u64,
    date: DateTime<Utc>,
    content_encoding: Option<HttpEncoding>,
    server_name: String,
    allow: Option<Vec<HttpRequestMethod>>,
    content: Option<Bytes>,
    content_range: Option<String>,
    accept_ranges: Option<String>,
    set_cookie: Option<String>,
}

impl Response {
    pub fn new() -> Self {
        Self {
            status_code: 200,
            information: "OK".to_string(),
            content_type: None,
            content_length: 0,
            date: Utc::now(),
            content_encoding: None,
            server_name: SERVER_NAME.to_string(),
            allow: None,
            content: None,
            content_range: None,
            accept_ranges: None,
            set_cookie: None,
        }
    }

    /// 状态码对应的错误页；405 附带 `Allow` 头
    pub fn from_status_code(code: u16, note: Option<&str>, id: u128) -> Self {
        debug!("[ID{}]生成{}页面", id, code);
        let html = HtmlBuilder::from_status_code(code, note).build();
        let mut response = Self::new();
        response.set_code(code);
        response.set_body(Bytes::from(html), "text/html;charset=utf-8");
        if code == 405 {
            response.allow = Some(ALLOWED_METHODS.to_vec());
        }
        response
    }

    /// 文本内容。`gzip` 为真且内容超过阈值时压缩。
    pub fn from_text(text: String, mime: &str, gzip: bool, threshold: usize, id: u128) -> Self {
        let mut response = Self::new();
        let data = text.into_bytes();
        if gzip && data.len() > threshold && !should_skip_compression(mime) {
            match compress(data.clone(), Some(HttpEncoding::Gzip)) {
                Ok(compressed) => {
                    response.content_encoding = Some(HttpEncoding::Gzip);
                    response.set_body(Bytes::from(compressed), mime);
                    return response;
                }
                Err(e) => {
                    error!("[ID{}]压缩响应失败，改为不压缩发送：{}", id, e);
                }
            }
        }
        response.set_body(Bytes::from(data), mime);
        response
    }

    /// 按已解析的范围截取内容：206 / 416 / 200。
    pub fn from_range(data: Bytes, mime: &str, range: ResolvedRange, id: u128) -> Self {
        let total = data.len() as u64;
        let mut response = Self::new();
        response.accept_ranges = Some("bytes".to_string());
        match range {
            ResolvedRange::Full => {
                response.set_body(data, mime);
            }
            ResolvedRange::Partial { first, last } => {
                debug!("[ID{}]处理Range请求: bytes {}-{}/{}", id, first, last, total);
                response.set_code(206);
                response.content_range = Some(format!("bytes {}-{}/{}", first, last, total));
                response.set_body(data.slice(first as usize..=last as usize), mime);
            }
            ResolvedRange::Unsatisfiable => {
                error!("[ID{}]无效的Range请求, 内容大小: {}", id, total);
                let html = HtmlBuilder::from_status_code(416, None).build();
                response.set_code(416);
                response.content_range = Some(format!("bytes */{}", total));
                response.set_body(Bytes::from(html), "text/html;charset=utf-8");
            }
        }
        response
    }

    fn set_body(&mut self, content: Bytes, mime: &str) {
        self.content_length = content.len() as u64;
        self.content = Some(content);
        self.content_type = Some(mime.to_string());
    }

    pub fn set_code(&mut self, code: u16) -> &mut Self {
        self.status_code = code;
        self.information = STATUS_CODES
            .get(&code)
            .map_or("Unknown", |d| *d)
            .to_string();
        self
    }

    /// 值经过百分号编码，不会带入 CR、LF、`;` 或 `,`
    pub fn set_cookie(&mut self, name: &str, value: &str) -> &mut Self {
        self.set_cookie = Some(format!("{}={}; Path=/", name, urlencoding::encode(value)));
        self
    }

    /// HEAD 请求只保留报文头，`Content-Length` 不变
    pub fn strip_body(&mut self) -> &mut Self {
        self.content = None;
        self
    }

    pub fn as_bytes(&self) -> Vec<u8> {
        let mut header = [
            HTTP_VERSION,
            " ",
            &self.status_code.to_string(),
            " ",
            &self.information,
            CRLF,
        ]
        .concat();
        if let Some(t) = &self.content_type {
            header.push_str(&["Content-Type: ", t, CRLF].concat());
        }
        if let Some(e) = self.content_encoding {
            header.push_str(&["Content-Encoding: ", &e.to_string(), CRLF].concat());
        }
        header.push_str(&["Content-Length: ", &self.content_length.to_string(), CRLF].concat());
        header.push_str(&["Date: ", &format_date(&self.date), CRLF].concat());
        header.push_str(&["Server: ", &self.server_name, CRLF].concat());
        if let Some(a) = &self.allow {
            let methods: Vec<String> = a.iter().map(|m| m.to_string()).collect();
            header.push_str(&["Allow: ", &methods.join(", "), CRLF].concat());
        }
        if let Some(r) = &self.accept_ranges {
            header.push_str(&["Accept-Ranges: ", r, CRLF].concat());
        }
        if let Some(r) = &self.content_range {
            header.push_str(&["Content-Range: ", r, CRLF].concat());
        }
        if let Some(c) = &self.set_cookie {
            header.push_str(&["Set-Cookie: ", c, CRLF].concat());
        }
        header.push_str(CRLF);
        let body: &[u8] = match &self.content {
            Some(c) => c,
            None => b"",
        };
        [header.as_bytes(), body].concat()
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl Response {
    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn information(&self) -> &str {
        &self.information
    }

    pub fn content_length(&self) -> u64 {
        self.content_length
    }
}

fn format_date(date: &DateTime<Utc>) -> String {
    date.to_rfc2822()
}

fn compress(data: Vec<u8>, mode: Option<HttpEncoding>) -> io::Result<Vec<u8>> {
    let original_size = data.len();
    let result = match mode {
        Some(HttpEncoding::Gzip) => {
            let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(&data)?;
            encoder.finish()
        }
        None => Ok(data),
    };

    if let Ok(ref compressed) = result {
        debug!(
            "压缩完成: {:?}, 原始大小: {} bytes, 压缩后: {} bytes",
            mode,
            original_size,
            compressed.len()
        );
    }

    result
}

fn should_skip_compression(mime_type: &str) -> bool {
    let skip_types = ["image/", "video/", "audio/", "font/woff", "application/zip", "application/gzip"];

    skip_types
        .iter()
        .any(|&skip_type| mime_type.starts_with(skip_type))
}

/// 按文件后缀查找 MIME 类型，没有后缀时视为 HTML 文章
pub fn get_mime(path: &str) -> &'static str {
    let file_name = path.rsplit('/').next().unwrap_or(path);
    let extension = match file_name.rsplit_once('.') {
        Some((_, ext)) => ext.to_lowercase(),
        None => "_".to_string(),
    };
    match MIME_TYPES.get(extension.as_str()) {
        Some(v) => v,
        None => "application/octet-stream",
    }
}
