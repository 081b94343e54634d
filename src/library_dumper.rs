//! 无 JavaScript 的书库页面。

use crate::{
    exception::Exception,
    library::{Filter, Library, NameMapper},
    template::{TemplateRenderer, LIBRARY_PAGE_TEMPLATE},
    util::visible_tags,
};
use log::warn;
use serde_json::{json, Value};

pub struct LibraryDumper<'a> {
    library: &'a dyn Library,
    name_mapper: &'a dyn NameMapper,
    root_location: String,
}

impl<'a> LibraryDumper<'a> {
    pub fn new(library: &'a dyn Library, name_mapper: &'a dyn NameMapper, root_location: &str) -> Self {
        Self {
            library,
            name_mapper,
            root_location: root_location.trim_end_matches('/').to_string(),
        }
    }

    pub fn get_data(&self, filter: &Filter) -> Value {
        let mut books = vec![];
        for book_id in self.library.filter(filter) {
            let book = match self.library.get_book_by_id(&book_id) {
                Ok(book) => book,
                Err(e) => {
                    warn!("书库过滤结果中的书{}无法取得：{}", book_id, e);
                    continue;
                }
            };
            let content_id = self.name_mapper.get_name_for_id(&book_id).unwrap_or_else(|e| {
                warn!("无法解析书{}的名字：{}", book_id, e);
                String::new()
            });
            let icon_url = format!(
                "{}/catalog/v2/illustration/{}/?size=48",
                self.root_location, book_id
            );
            let tag_list: Vec<Value> = visible_tags(&book.tags)
                .into_iter()
                .map(|tag| json!({ "tag": tag }))
                .collect();
            books.push(json!({
                "id": content_id,
                "title": book.title,
                "description": book.description,
                "langCode": book.comma_separated_languages(),
                "faviconAttr": format!("style=background-image:url({})", icon_url),
                "tagList": tag_list,
                "downloadAvailable": !book.url.is_empty(),
            }));
        }

        json!({
            "root": self.root_location,
            "books": books,
            "searchQuery": filter.query(),
        })
    }

    pub fn dump_plain_html(
        &self,
        filter: &Filter,
        renderer: &dyn TemplateRenderer,
    ) -> Result<String, Exception> {
        renderer.render(LIBRARY_PAGE_TEMPLATE, &self.get_data(filter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::{Book, MockLibrary, MockNameMapper};
    use crate::template::MiniJinjaRenderer;

    fn book(id: &str, tags: &str, url: &str) -> Book {
        Book {
            id: id.to_string(),
            name: format!("{}_name", id),
            title: format!("Title {}", id),
            description: "desc".to_string(),
            languages: vec!["eng".to_string(), "fra".to_string()],
            tags: tags.to_string(),
            url: url.to_string(),
            articles: vec![],
        }
    }

    fn library() -> MockLibrary {
        let mut library = MockLibrary::new();
        library
            .expect_filter()
            .returning(|_| vec!["b1".to_string(), "b2".to_string()]);
        library
            .expect_get_book_by_id()
            .returning(|id| Ok(book(id, "wikipedia;_category:wikipedia;nopic", if id == "b1" { "http://x" } else { "" })));
        library
    }

    #[test]
    fn test_book_entries() {
        let library = library();
        let mut mapper = MockNameMapper::new();
        mapper
            .expect_get_name_for_id()
            .returning(|id| Ok(format!("{}_name", id)));
        let dumper = LibraryDumper::new(&library, &mapper, "/kiwix/");
        let filter = Filter {
            query: Some("wiki".to_string()),
            lang: None,
        };
        let data = dumper.get_data(&filter);

        assert_eq!(data["root"], "/kiwix");
        assert_eq!(data["searchQuery"], "wiki");
        let books = data["books"].as_array().unwrap();
        assert_eq!(books.len(), 2);
        assert_eq!(books[0]["id"], "b1_name");
        assert_eq!(books[0]["langCode"], "eng,fra");
        assert_eq!(
            books[0]["faviconAttr"],
            "style=background-image:url(/kiwix/catalog/v2/illustration/b1/?size=48)"
        );
        assert_eq!(books[0]["tagList"], json!([{"tag": "wikipedia"}, {"tag": "nopic"}]));
        assert_eq!(books[0]["downloadAvailable"], true);
        assert_eq!(books[1]["downloadAvailable"], false);
    }

    #[test]
    fn test_unmapped_book_keeps_empty_id() {
        let library = library();
        let mut mapper = MockNameMapper::new();
        mapper
            .expect_get_name_for_id()
            .returning(|id| Err(Exception::BookNotFound(id.to_string())));
        let dumper = LibraryDumper::new(&library, &mapper, "");
        let data = dumper.get_data(&Filter::default());
        assert_eq!(data["books"][0]["id"], "");
        assert_eq!(data["books"][0]["title"], "Title b1");
    }

    #[test]
    fn test_dump_plain_html() {
        let library = library();
        let mut mapper = MockNameMapper::new();
        mapper
            .expect_get_name_for_id()
            .returning(|id| Ok(format!("{}_name", id)));
        let dumper = LibraryDumper::new(&library, &mapper, "");
        let html = dumper
            .dump_plain_html(&Filter::default(), &MiniJinjaRenderer::with_bundled_templates().unwrap())
            .unwrap();
        assert!(html.contains("Title b1"));
        assert!(html.contains("Title b2"));
        assert!(html.contains("nopic"));
        assert!(!html.contains("_category"));
    }
}
