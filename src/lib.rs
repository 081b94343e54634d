pub mod argument;
pub mod byte_range;
pub mod config;
pub mod exception;
pub mod exchange;
pub mod language;
pub mod library;
pub mod library_dumper;
pub mod pagination;
pub mod param;
pub mod request_context;
pub mod response;
pub mod search_renderer;
pub mod template;
pub mod util;

pub use argument::FromArgument;
pub use byte_range::{ByteRange, ResolvedRange};
pub use config::Config;
pub use exception::Exception;
pub use exchange::HttpExchange;
pub use language::{LanguageSelector, LanguageSettings, UserLanguage};
pub use library::{Book, Filter, InMemoryLibrary, Library, NameMapper, SearchResults};
pub use library_dumper::LibraryDumper;
pub use pagination::{build_pagination, PageEntry, PaginationWindow};
pub use param::{HttpEncoding, HttpRequestMethod};
pub use request_context::{RequestContext, ResponseFormat};
pub use response::Response;
pub use search_renderer::{SearchRenderer, SearchRendererConfig, SearchResultRow};
pub use template::{MiniJinjaRenderer, TemplateRenderer};
pub use util::HtmlBuilder;
