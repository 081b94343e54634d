//! 从原始报文到页面数据的完整流程测试。

use archive_server::{
    library::Article, Book, ByteRange, Filter, HttpExchange, InMemoryLibrary, LanguageSelector,
    LanguageSettings, LibraryDumper, MiniJinjaRenderer, RequestContext, ResolvedRange,
    Response, ResponseFormat, SearchRenderer, SearchRendererConfig,
};
use archive_server::param::USER_LANGUAGE_KEY;
use std::collections::BTreeSet;

fn article(path: &str, title: &str, content: &str) -> Article {
    Article {
        path: path.to_string(),
        title: title.to_string(),
        content: content.to_string(),
    }
}

fn library() -> InMemoryLibrary {
    let mut articles = vec![];
    for i in 0..30 {
        articles.push(article(
            &format!("A/Page_{}", i),
            &format!("Page {}", i),
            &format!("Entry number {} mentions the river Seine.", i),
        ));
    }
    InMemoryLibrary::from_books(vec![
        Book {
            id: "id-wiki".to_string(),
            name: "wiki_fr".to_string(),
            title: "Wikipédia".to_string(),
            description: "Encyclopédie".to_string(),
            languages: vec!["fra".to_string()],
            tags: "wikipedia;_category:wikipedia".to_string(),
            url: "http://example.org/wiki_fr.zim".to_string(),
            articles,
        },
        Book {
            id: "id-gut".to_string(),
            name: "gutenberg".to_string(),
            title: "Gutenberg".to_string(),
            description: "Books".to_string(),
            languages: vec!["eng".to_string()],
            tags: String::new(),
            url: String::new(),
            articles: vec![article("A/Moby", "Moby Dick", "Call me Ishmael.")],
        },
    ])
}

fn context(raw: &str, root: &str) -> RequestContext {
    let languages = LanguageSettings::new("en", &["en".to_string(), "fr".to_string()]);
    let exchange = HttpExchange::try_from(raw.as_bytes(), 1).unwrap();
    RequestContext::new(&exchange, root, &languages, 1)
}

#[test]
fn test_search_request_flow() {
    let ctx = context(
        "GET /kiwix/search?pattern=seine&content=wiki_fr&start=10&pageLength=5 HTTP/1.1\r\n\
         Host: localhost\r\n\
         Accept-Language: fr-CH, en;q=0.5\r\n\r\n",
        "/kiwix/",
    );
    assert!(ctx.is_valid_url());
    assert_eq!(ctx.get_url(), "/search");
    assert_eq!(ctx.get_user_language(), "fr");
    assert_eq!(ctx.user_language_selector(), LanguageSelector::AcceptLanguageHeader);

    let pattern: String = ctx.get_argument("pattern").unwrap();
    let books = ctx.get_arguments("content").unwrap().to_vec();
    let start: u32 = ctx.get_optional_param("start", 0);
    let page_length: u32 = ctx.get_optional_param("pageLength", 25);

    let library = library();
    let results = library.search(&pattern, &books, start, page_length);
    assert_eq!(results.estimated_count, 30);
    assert_eq!(results.entries.len(), 5);

    let mut config = SearchRendererConfig::new(&library);
    config.page_length = Some(page_length);
    config.library = Some(&library);
    let mut renderer = SearchRenderer::new(results, config);
    renderer.set_search_pattern(&pattern);
    renderer.set_search_book_names(books.into_iter().collect::<BTreeSet<String>>());

    let data = renderer.get_data();
    assert_eq!(data["results"]["count"], "30");
    assert_eq!(data["results"]["start"], "11");
    assert_eq!(data["results"]["end"], "15");
    assert_eq!(data["pagination"]["currentPage"], 2);
    assert_eq!(data["pagination"]["lastPage"]["label"], 6);
    assert_eq!(data["results"]["items"][0]["bookTitle"], "Wikipédia");
    assert_eq!(data["results"]["items"][0]["absolutePath"], "wiki_fr/A/Page_10");
    assert_eq!(data["query"]["path"], "?pattern=seine&content=wiki_fr");

    let html = renderer
        .get_html(&MiniJinjaRenderer::with_bundled_templates().unwrap())
        .unwrap();
    assert!(html.contains("Page 10"));
    assert!(html.contains("<b>Seine</b>"));
    assert!(html.contains("start=25"));
}

#[test]
fn test_library_page_flow() {
    let ctx = context("GET /catalog?lang=eng HTTP/1.1\r\nCookie: userlang=fr\r\n\r\n", "");
    assert_eq!(ctx.get_url_part(0).unwrap(), "catalog");
    assert!(ctx.user_language_comes_from_cookie());

    let filter = Filter {
        query: ctx.get_argument::<String>("q").ok(),
        lang: ctx.get_argument::<String>("lang").ok(),
    };
    let library = library();
    let dumper = LibraryDumper::new(&library, &library, ctx.get_root_path());
    let data = dumper.get_data(&filter);
    let books = data["books"].as_array().unwrap();
    assert_eq!(books.len(), 1);
    assert_eq!(books[0]["id"], "gutenberg");
    assert_eq!(books[0]["downloadAvailable"], false);

    let html = dumper
        .dump_plain_html(&Filter::default(), &MiniJinjaRenderer::with_bundled_templates().unwrap())
        .unwrap();
    assert!(html.contains("Gutenberg"));
    assert!(html.contains("Wikipédia"));
}

#[test]
fn test_raw_range_flow() {
    let ctx = context(
        "GET /raw/gutenberg/A/Moby HTTP/1.1\r\nRange: bytes=-8\r\nAccept: application/json\r\n\r\n",
        "",
    );
    assert_eq!(ctx.get_url_part(1).unwrap(), "gutenberg");
    assert_eq!(ctx.get_requested_format(), ResponseFormat::Json);
    assert_eq!(*ctx.get_range(), ByteRange::Suffix { length: 8 });

    let library = library();
    let article = library.get_article("gutenberg", "A/Moby").unwrap();
    let length = article.content.len() as u64;
    match ctx.get_range().resolve(length) {
        ResolvedRange::Partial { first, last } => {
            assert_eq!(&article.content[first as usize..=last as usize], "Ishmael.");
        }
        other => panic!("unexpected range {:?}", other),
    }
}

#[test]
fn test_request_outside_root() {
    let ctx = context("GET /other/search?pattern=x HTTP/1.1\r\n\r\n", "/kiwix");
    assert!(!ctx.is_valid_url());
    assert_eq!(ctx.get_full_url(), "/other/search");
}

#[test]
fn test_userlang_never_reaches_headers_raw() {
    let ctx = context("GET /?userlang=en%0D%0AX-Injected:%201 HTTP/1.1\r\n\r\n", "");
    assert_eq!(ctx.user_language_selector(), LanguageSelector::Default);
    assert_eq!(ctx.language_cookie(), None);

    let mut response = Response::from_status_code(404, None, 1);
    response.set_cookie(USER_LANGUAGE_KEY, "en\r\nX-Injected: 1");
    let text = String::from_utf8_lossy(&response.as_bytes()).to_string();
    assert!(!text.contains("\r\nX-Injected: 1"));
}
