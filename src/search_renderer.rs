// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 搜索结果组装模块
//!
//! 把搜索协作方给出的、已按页截取的结果集组装为模板数据：
//! - 每条结果一行 `SearchResultRow`（标题、内容路径、摘要、字数、所属书名）。
//! - 结果概要（总数、当前页起止序号）。
//! - 分页窗口（见 `pagination`）。
//! - 生成分页链接所需的查询串。

use crate::{
    exception::Exception,
    library::{Library, NameMapper, SearchResults},
    pagination::build_pagination,
    param::DEFAULT_PAGE_LENGTH,
    template::{TemplateRenderer, SEARCH_RESULT_TEMPLATE},
    util::{beautify_integer, encode_diples, url_encode_path},
};
use log::{debug, warn};
use serde_derive::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeSet;

const DEFAULT_PROTOCOL_PREFIX: &str = "zim://";
const DEFAULT_SEARCH_PROTOCOL_PREFIX: &str = "search://";

/// `SearchRenderer` 的构造参数，可选字段留空即取默认值。
pub struct SearchRendererConfig<'a> {
    pub name_mapper: &'a dyn NameMapper,
    /// 提供时，每行附带所属书的标题
    pub library: Option<&'a dyn Library>,
    pub protocol_prefix: Option<String>,
    pub search_protocol_prefix: Option<String>,
    pub page_length: Option<u32>,
}

impl<'a> SearchRendererConfig<'a> {
    pub fn new(name_mapper: &'a dyn NameMapper) -> Self {
        Self {
            name_mapper,
            library: None,
            protocol_prefix: None,
            search_protocol_prefix: None,
            page_length: None,
        }
    }
}

/// 一条搜索结果的展示数据
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResultRow {
    pub title: String,
    /// URL 编码后的 `书名/条目路径`
    pub absolute_path: String,
    pub snippet: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub word_count: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub book_title: Option<String>,
}

pub struct SearchRenderer<'a> {
    results: SearchResults,
    name_mapper: &'a dyn NameMapper,
    library: Option<&'a dyn Library>,
    protocol_prefix: String,
    search_protocol_prefix: String,
    page_length: u32,
    search_pattern: String,
    search_book_names: BTreeSet<String>,
}

impl<'a> SearchRenderer<'a> {
    pub fn new(results: SearchResults, config: SearchRendererConfig<'a>) -> Self {
        Self {
            results,
            name_mapper: config.name_mapper,
            library: config.library,
            protocol_prefix: config
                .protocol_prefix
                .unwrap_or_else(|| DEFAULT_PROTOCOL_PREFIX.to_string()),
            search_protocol_prefix: config
                .search_protocol_prefix
                .unwrap_or_else(|| DEFAULT_SEARCH_PROTOCOL_PREFIX.to_string()),
            page_length: match config.page_length {
                Some(0) | None => DEFAULT_PAGE_LENGTH,
                Some(n) => n,
            },
            search_pattern: String::new(),
            search_book_names: BTreeSet::new(),
        }
    }

    pub fn set_search_pattern(&mut self, pattern: &str) {
        self.search_pattern = pattern.to_string();
    }

    pub fn set_search_book_names(&mut self, book_names: BTreeSet<String>) {
        self.search_book_names = book_names;
    }

    /// 逐条组装展示行。名字映射失败只清空该行的书名部分，不影响整页。
    pub fn build_rows(&self) -> Vec<SearchResultRow> {
        self.results
            .entries
            .iter()
            .map(|entry| {
                let name = match self.name_mapper.get_name_for_id(&entry.zim_id) {
                    Ok(name) => name,
                    Err(e) => {
                        warn!("无法解析书{}的名字：{}", entry.zim_id, e);
                        String::new()
                    }
                };
                let book_title = self.library.and_then(|library| {
                    match library.get_book_by_id(&entry.zim_id) {
                        Ok(book) => Some(book.title),
                        Err(e) => {
                            warn!("无法取得书{}的标题：{}", entry.zim_id, e);
                            None
                        }
                    }
                });
                SearchResultRow {
                    title: entry.title.clone(),
                    absolute_path: url_encode_path(&format!("{}/{}", name, entry.path)),
                    snippet: entry.snippet.clone(),
                    word_count: if entry.word_count >= 0 {
                        Some(beautify_integer(entry.word_count as u64))
                    } else {
                        None
                    },
                    book_title,
                }
            })
            .collect()
    }

    /// 组装交给模板的全部数据
    pub fn get_data(&self) -> Value {
        let count = self.results.estimated_count;
        let mut start = self.results.start;
        if count != 0 && start >= count {
            let last_page_start = (count - 1) / self.page_length * self.page_length;
            warn!(
                "结果偏移{}超出结果总数{}，概要改为从{}开始",
                start, count, last_page_start
            );
            start = last_page_start;
        }
        let end = start.saturating_add(self.page_length).min(count);

        let results = json!({
            "items": self.build_rows(),
            "count": beautify_integer(count as u64),
            "hasResults": count != 0,
            "start": beautify_integer(start as u64 + 1),
            "end": beautify_integer(end as u64),
        });

        let pagination = if count != 0 {
            json!(build_pagination(self.page_length, count, start))
        } else {
            debug!("没有搜索结果，跳过分页");
            json!({
                "hasPages": false,
                "pages": [],
                "itemsPerPage": self.page_length,
            })
        };

        json!({
            "results": results,
            "protocolPrefix": self.protocol_prefix,
            "searchProtocolPrefix": self.search_protocol_prefix,
            "pagination": pagination,
            "query": build_query_data(&self.search_pattern, &self.search_book_names),
        })
    }

    pub fn get_html(&self, renderer: &dyn TemplateRenderer) -> Result<String, Exception> {
        renderer.render(SEARCH_RESULT_TEMPLATE, &self.get_data())
    }
}

/// 搜索词的展示形式，以及不带分页参数的查询串
pub fn build_query_data(pattern: &str, book_names: &BTreeSet<String>) -> Value {
    let mut path = format!("?pattern={}", urlencoding::encode(pattern));
    for name in book_names {
        path.push_str("&content=");
        path.push_str(&urlencoding::encode(name));
    }
    json!({
        "pattern": encode_diples(pattern),
        "path": path,
    })
}
