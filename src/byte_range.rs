// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 范围请求（Range Requests）模块
//!
//! 解析 RFC 7233 的单段字节范围：`bytes=A-B`、`bytes=A-` 与 `bytes=-N`。
//! 解析只报告“请求了什么”，是否回应 416 由调用方决定。

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref RANGE_RE: Regex = Regex::new(r"^bytes=(\d*)-(\d*)$").unwrap();
}

/// 客户端通过 `Range` 头请求的字节范围。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteRange {
    /// 没有 `Range` 头，或者无法识别：请求整个资源
    Entire,
    /// 语法上是字节范围，但起点大于终点
    Invalid,
    /// `bytes=A-B`，两端都包含
    Bounded { first: u64, last: u64 },
    /// `bytes=A-`，从 A 到资源末尾
    From { first: u64 },
    /// `bytes=-N`，资源末尾的 N 个字节
    Suffix { length: u64 },
}

/// 结合资源实际长度之后的范围
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedRange {
    Full,
    Partial { first: u64, last: u64 },
    Unsatisfiable,
}

impl ResolvedRange {
    /// 需要发送的字节数
    pub fn len(&self, content_length: u64) -> u64 {
        match *self {
            ResolvedRange::Full => content_length,
            ResolvedRange::Partial { first, last } => last - first + 1,
            ResolvedRange::Unsatisfiable => 0,
        }
    }
}

impl ByteRange {
    /// 解析 `Range` 头的值。
    pub fn parse(header: Option<&str>) -> Self {
        let value = match header {
            Some(v) => v.trim(),
            None => return ByteRange::Entire,
        };
        let captures = match RANGE_RE.captures(value) {
            Some(c) => c,
            None => return ByteRange::Entire,
        };
        let start = &captures[1];
        let end = &captures[2];

        match (start.is_empty(), end.is_empty()) {
            (true, true) => ByteRange::Entire,
            (true, false) => match end.parse::<u64>() {
                Ok(length) => ByteRange::Suffix { length },
                Err(_) => ByteRange::Entire,
            },
            (false, true) => match start.parse::<u64>() {
                Ok(first) => ByteRange::From { first },
                Err(_) => ByteRange::Entire,
            },
            (false, false) => match (start.parse::<u64>(), end.parse::<u64>()) {
                (Ok(first), Ok(last)) if first > last => ByteRange::Invalid,
                (Ok(first), Ok(last)) => ByteRange::Bounded { first, last },
                _ => ByteRange::Entire,
            },
        }
    }

    pub fn is_entire(&self) -> bool {
        *self == ByteRange::Entire
    }

    pub fn is_invalid(&self) -> bool {
        *self == ByteRange::Invalid
    }

    /// 把范围落到一个已知长度的资源上。
    pub fn resolve(&self, content_length: u64) -> ResolvedRange {
        if *self == ByteRange::Entire {
            return ResolvedRange::Full;
        }
        if content_length == 0 {
            return ResolvedRange::Unsatisfiable;
        }
        let max = content_length - 1;
        match *self {
            ByteRange::Entire => ResolvedRange::Full,
            ByteRange::Invalid => ResolvedRange::Unsatisfiable,
            ByteRange::Bounded { first, last } => {
                if first > max {
                    ResolvedRange::Unsatisfiable
                } else {
                    ResolvedRange::Partial {
                        first,
                        last: last.min(max),
                    }
                }
            }
            ByteRange::From { first } => {
                if first > max {
                    ResolvedRange::Unsatisfiable
                } else {
                    ResolvedRange::Partial { first, last: max }
                }
            }
            ByteRange::Suffix { length } => {
                if length == 0 {
                    ResolvedRange::Unsatisfiable
                } else {
                    ResolvedRange::Partial {
                        first: content_length.saturating_sub(length),
                        last: max,
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_header_is_entire() {
        assert_eq!(ByteRange::parse(None), ByteRange::Entire);
        assert_eq!(ByteRange::parse(None).resolve(10), ResolvedRange::Full);
    }

    #[test]
    fn test_bounded_range() {
        let range = ByteRange::parse(Some("bytes=100-199"));
        assert_eq!(range, ByteRange::Bounded { first: 100, last: 199 });
        let resolved = range.resolve(1000);
        assert_eq!(resolved, ResolvedRange::Partial { first: 100, last: 199 });
        assert_eq!(resolved.len(1000), 100);
    }

    #[test]
    fn test_suffix_range() {
        let range = ByteRange::parse(Some("bytes=-50"));
        assert_eq!(range, ByteRange::Suffix { length: 50 });
        assert_eq!(range.resolve(1000), ResolvedRange::Partial { first: 950, last: 999 });
    }

    #[test]
    fn test_suffix_longer_than_content() {
        let range = ByteRange::parse(Some("bytes=-5000"));
        assert_eq!(range.resolve(1000), ResolvedRange::Partial { first: 0, last: 999 });
    }

    #[test]
    fn test_open_ended_range() {
        let range = ByteRange::parse(Some("bytes=900-"));
        assert_eq!(range, ByteRange::From { first: 900 });
        assert_eq!(range.resolve(1000), ResolvedRange::Partial { first: 900, last: 999 });
        assert_eq!(range.resolve(900), ResolvedRange::Unsatisfiable);
    }

    /// 起点大于终点是独立的失败情况，不会被静默截断
    #[test]
    fn test_start_after_end_is_invalid() {
        let range = ByteRange::parse(Some("bytes=200-100"));
        assert!(range.is_invalid());
        assert_eq!(range.resolve(1000), ResolvedRange::Unsatisfiable);
    }

    #[test]
    fn test_unparsable_is_entire() {
        for header in ["items=0-10", "bytes=abc", "bytes=-", "bytes=0-1,5-6", "bytes=99999999999999999999999-"] {
            assert_eq!(ByteRange::parse(Some(header)), ByteRange::Entire, "{}", header);
        }
    }

    #[test]
    fn test_end_clamped_to_content() {
        let range = ByteRange::parse(Some("bytes=10-5000"));
        assert_eq!(range.resolve(100), ResolvedRange::Partial { first: 10, last: 99 });
    }

    #[test]
    fn test_empty_content_unsatisfiable() {
        assert_eq!(ByteRange::parse(Some("bytes=0-")).resolve(0), ResolvedRange::Unsatisfiable);
        assert_eq!(ByteRange::parse(Some("bytes=-0")).resolve(10), ResolvedRange::Unsatisfiable);
    }
}
