//! 书库与搜索协作方。
//!
//! `Library` / `NameMapper` 是结果组装依赖的两个接口。`InMemoryLibrary` 从 JSON 描述文件载入书目，
//! 同时实现这两个接口，并提供一个按子串匹配的简单全文搜索，供可执行程序使用。

use crate::exception::Exception;
use log::{debug, info};
use regex::{Regex, RegexBuilder};
use serde_derive::{Deserialize, Serialize};
use std::{collections::BTreeMap, fs};

/// 摘要中匹配位置前后各保留的字节数
const SNIPPET_CONTEXT: usize = 80;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub path: String,
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub id: String,
    /// 人类可读的短名，出现在内容 URL 中
    pub name: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub languages: Vec<String>,
    /// 以 `;` 分隔的标签
    #[serde(default)]
    pub tags: String,
    /// 下载地址，为空表示不可下载
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub articles: Vec<Article>,
}

impl Book {
    pub fn comma_separated_languages(&self) -> String {
        self.languages.join(",")
    }
}

/// 书目过滤条件
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    /// 在标题与简介中做大小写不敏感的子串匹配
    pub query: Option<String>,
    pub lang: Option<String>,
}

impl Filter {
    pub fn query(&self) -> &str {
        self.query.as_deref().unwrap_or("")
    }

    fn accepts(&self, book: &Book) -> bool {
        if let Some(lang) = &self.lang {
            if !book.languages.iter().any(|l| l == lang) {
                return false;
            }
        }
        match &self.query {
            Some(q) if !q.is_empty() => {
                let q = q.to_lowercase();
                book.title.to_lowercase().contains(&q) || book.description.to_lowercase().contains(&q)
            }
            _ => true,
        }
    }
}

/// 搜索结果集中的一条
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResultEntry {
    pub zim_id: String,
    pub title: String,
    pub path: String,
    pub snippet: String,
    /// 负数表示未知
    pub word_count: i64,
}

/// 已按页截取的结果集，附带总数估计与起始偏移
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResults {
    pub entries: Vec<SearchResultEntry>,
    pub estimated_count: u32,
    pub start: u32,
}

#[cfg_attr(test, mockall::automock)]
pub trait Library {
    /// 满足条件的书 ID，按标题排序
    fn filter(&self, filter: &Filter) -> Vec<String>;
    fn get_book_by_id(&self, id: &str) -> Result<Book, Exception>;
}

#[cfg_attr(test, mockall::automock)]
pub trait NameMapper {
    fn get_name_for_id(&self, id: &str) -> Result<String, Exception>;
    fn get_id_for_name(&self, name: &str) -> Result<String, Exception>;
}

#[derive(Debug, Deserialize)]
struct LibraryFile {
    books: Vec<Book>,
}

/// 内存中的书库
#[derive(Debug, Clone, Default)]
pub struct InMemoryLibrary {
    books: BTreeMap<String, Book>,
}

impl InMemoryLibrary {
    pub fn from_books(books: Vec<Book>) -> Self {
        Self {
            books: books.into_iter().map(|b| (b.id.clone(), b)).collect(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, Exception> {
        let file: LibraryFile =
            serde_json::from_str(json).map_err(|e| Exception::LibraryLoadFailed(e.to_string()))?;
        Ok(Self::from_books(file.books))
    }

    pub fn from_json_file(filename: &str) -> Result<Self, Exception> {
        let json = fs::read_to_string(filename)
            .map_err(|e| Exception::LibraryLoadFailed(format!("{}: {}", filename, e)))?;
        let library = Self::from_json(&json)?;
        info!("书库{}已载入，共{}本书", filename, library.books.len());
        Ok(library)
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    /// 按书名和路径取文章
    pub fn get_article(&self, book_name: &str, path: &str) -> Result<&Article, Exception> {
        let id = self.get_id_for_name(book_name)?;
        let book = self
            .books
            .get(&id)
            .ok_or_else(|| Exception::BookNotFound(id.clone()))?;
        book.articles
            .iter()
            .find(|a| a.path == path)
            .ok_or_else(|| Exception::KeyError(path.to_string()))
    }

    /// 在给定的书（为空则全部）中搜索 `pattern`，返回 `[start, start + page_length)` 范围内的结果。
    pub fn search(
        &self,
        pattern: &str,
        book_names: &[String],
        start: u32,
        page_length: u32,
    ) -> SearchResults {
        let matcher = match RegexBuilder::new(&regex::escape(pattern))
            .case_insensitive(true)
            .build()
        {
            Ok(m) => m,
            Err(e) => {
                debug!("无法构建搜索表达式{}：{}", pattern, e);
                return SearchResults::default();
            }
        };

        let selected: Vec<&Book> = if book_names.is_empty() {
            self.books.values().collect()
        } else {
            book_names
                .iter()
                .filter_map(|name| self.get_id_for_name(name).ok())
                .filter_map(|id| self.books.get(&id))
                .collect()
        };

        let mut hits = vec![];
        for book in selected {
            for article in &book.articles {
                let in_title = matcher.is_match(&article.title);
                let snippet = make_snippet(&matcher, &article.content);
                if in_title || snippet.is_some() {
                    hits.push(SearchResultEntry {
                        zim_id: book.id.clone(),
                        title: article.title.clone(),
                        path: article.path.clone(),
                        snippet: snippet.unwrap_or_default(),
                        word_count: article.content.split_whitespace().count() as i64,
                    });
                }
            }
        }

        let estimated_count = hits.len() as u32;
        let entries = hits
            .into_iter()
            .skip(start as usize)
            .take(page_length as usize)
            .collect();
        SearchResults {
            entries,
            estimated_count,
            start,
        }
    }
}

/// 截取第一个匹配位置附近的文本，并用 `<b>` 标出匹配
fn make_snippet(matcher: &Regex, content: &str) -> Option<String> {
    let m = matcher.find(content)?;
    let mut begin = m.start().saturating_sub(SNIPPET_CONTEXT);
    while !content.is_char_boundary(begin) {
        begin -= 1;
    }
    let mut end = (m.end() + SNIPPET_CONTEXT).min(content.len());
    while !content.is_char_boundary(end) {
        end += 1;
    }
    Some(format!(
        "{}{}<b>{}</b>{}{}",
        if begin > 0 { "..." } else { "" },
        &content[begin..m.start()],
        m.as_str(),
        &content[m.end()..end],
        if end < content.len() { "..." } else { "" },
    ))
}

impl Library for InMemoryLibrary {
    fn filter(&self, filter: &Filter) -> Vec<String> {
        let mut books: Vec<&Book> = self.books.values().filter(|b| filter.accepts(b)).collect();
        books.sort_by(|a, b| a.title.cmp(&b.title));
        books.into_iter().map(|b| b.id.clone()).collect()
    }

    fn get_book_by_id(&self, id: &str) -> Result<Book, Exception> {
        self.books
            .get(id)
            .cloned()
            .ok_or_else(|| Exception::BookNotFound(id.to_string()))
    }
}

impl NameMapper for InMemoryLibrary {
    fn get_name_for_id(&self, id: &str) -> Result<String, Exception> {
        self.books
            .get(id)
            .map(|b| b.name.clone())
            .ok_or_else(|| Exception::BookNotFound(id.to_string()))
    }

    fn get_id_for_name(&self, name: &str) -> Result<String, Exception> {
        self.books
            .values()
            .find(|b| b.name == name)
            .map(|b| b.id.clone())
            .ok_or_else(|| Exception::KeyError(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIBRARY_JSON: &str = r#"{
        "books": [
            {
                "id": "b1", "name": "wiki_fr", "title": "Wikipédia",
                "description": "Encyclopédie libre", "languages": ["fra"],
                "tags": "wikipedia;_category:wikipedia", "url": "http://example.org/wiki_fr.zim",
                "articles": [
                    {"path": "A/Paris", "title": "Paris", "content": "Paris est la capitale de la France."},
                    {"path": "A/Lyon", "title": "Lyon", "content": "Lyon est une ville de France, proche de Paris par le TGV."}
                ]
            },
            {
                "id": "b2", "name": "gutenberg_en", "title": "Gutenberg",
                "languages": ["eng"],
                "articles": [
                    {"path": "A/Verne", "title": "Around the World", "content": "Phileas Fogg leaves Paris behind."}
                ]
            }
        ]
    }"#;

    fn library() -> InMemoryLibrary {
        InMemoryLibrary::from_json(LIBRARY_JSON).unwrap()
    }

    #[test]
    fn test_load_from_json() {
        let lib = library();
        assert_eq!(lib.len(), 2);
        assert_eq!(lib.get_book_by_id("b2").unwrap().description, "");
        assert!(matches!(
            InMemoryLibrary::from_json("{"),
            Err(Exception::LibraryLoadFailed(_))
        ));
    }

    #[test]
    fn test_load_from_json_file() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(LIBRARY_JSON.as_bytes()).unwrap();
        let lib = InMemoryLibrary::from_json_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(lib.get_id_for_name("wiki_fr").unwrap(), "b1");
        assert!(matches!(
            InMemoryLibrary::from_json_file("/definitely/not/here.json"),
            Err(Exception::LibraryLoadFailed(_))
        ));
    }

    #[test]
    fn test_filter_sorted_by_title() {
        let lib = library();
        assert_eq!(lib.filter(&Filter::default()), vec!["b2", "b1"]);
        let filter = Filter {
            query: Some("encyclo".to_string()),
            lang: None,
        };
        assert_eq!(lib.filter(&filter), vec!["b1"]);
        let filter = Filter {
            query: None,
            lang: Some("eng".to_string()),
        };
        assert_eq!(lib.filter(&filter), vec!["b2"]);
    }

    #[test]
    fn test_name_mapping() {
        let lib = library();
        assert_eq!(lib.get_name_for_id("b1").unwrap(), "wiki_fr");
        assert_eq!(lib.get_id_for_name("gutenberg_en").unwrap(), "b2");
        assert!(lib.get_name_for_id("nope").is_err());
    }

    #[test]
    fn test_search_all_books() {
        let results = library().search("paris", &[], 0, 10);
        assert_eq!(results.estimated_count, 3);
        assert_eq!(results.entries.len(), 3);
        assert!(results.entries[0].snippet.contains("<b>Paris</b>"));
        assert_eq!(results.entries[0].word_count, 7);
    }

    #[test]
    fn test_search_window_and_book_selection() {
        let results = library().search("paris", &["wiki_fr".to_string()], 1, 10);
        assert_eq!(results.estimated_count, 2);
        assert_eq!(results.start, 1);
        assert_eq!(results.entries.len(), 1);
        assert_eq!(results.entries[0].path, "A/Lyon");
    }

    #[test]
    fn test_get_article() {
        let lib = library();
        assert_eq!(lib.get_article("wiki_fr", "A/Lyon").unwrap().title, "Lyon");
        assert!(lib.get_article("wiki_fr", "A/Nice").is_err());
        assert!(lib.get_article("unknown", "A/Lyon").is_err());
    }

    #[test]
    fn test_snippet_marks_ellipsis() {
        let matcher = RegexBuilder::new("needle").case_insensitive(true).build().unwrap();
        let content = format!("{}needle{}", "a".repeat(200), "é".repeat(100));
        let snippet = make_snippet(&matcher, &content).unwrap();
        assert!(snippet.starts_with("..."));
        assert!(snippet.ends_with("..."));
        assert!(snippet.contains("<b>needle</b>"));
    }
}
