// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 离线书库服务器
//!
//! 基于 Tokio 运行时的多线程 HTTP 服务器，负责：
//! - 载入书库描述文件与打包的页面模板
//! - 把每个连接的报文解析为 `RequestContext`
//! - 分派到书库页、搜索结果页和条目原文三个入口

use archive_server::{
    library::InMemoryLibrary,
    param::{ALLOWED_METHODS, USER_LANGUAGE_KEY},
    response::get_mime,
    Config, Exception, Filter, HttpExchange, HttpRequestMethod, LanguageSettings, LibraryDumper,
    MiniJinjaRenderer, RequestContext, Response, ResponseFormat, SearchRenderer,
    SearchRendererConfig,
};

use bytes::Bytes;
use log::{debug, error, info, warn};
use tokio::{
    io::AsyncWriteExt,
    net::{TcpListener, TcpStream},
    runtime::Builder,
};

use std::{
    collections::BTreeSet,
    net::{Ipv4Addr, SocketAddrV4},
    sync::Arc,
    time::Instant,
};

const REQUEST_BUFFER_SIZE: usize = 8192;

/// 各连接共享的只读状态
struct Server {
    config: Config,
    languages: LanguageSettings,
    library: InMemoryLibrary,
    renderer: MiniJinjaRenderer,
}

fn main() {
    if let Err(e) = log4rs::init_file("config/log4rs.yaml", Default::default()) {
        eprintln!("无法初始化日志系统：{}", e);
    }

    let config = Config::from_toml("config/development.toml");
    info!("配置文件已载入");
    info!("挂载点：'{}'", config.root_location());

    let library = match InMemoryLibrary::from_json_file(config.library_file()) {
        Ok(library) => library,
        Err(e) => {
            error!("{}，以空书库启动", e);
            InMemoryLibrary::from_books(vec![])
        }
    };
    info!("书库中共有{}本书", library.len());

    let renderer = match MiniJinjaRenderer::with_bundled_templates() {
        Ok(renderer) => renderer,
        Err(e) => {
            error!("无法载入页面模板：{}", e);
            return;
        }
    };

    let runtime = match Builder::new_multi_thread()
        .worker_threads(config.worker_threads())
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("无法创建Tokio运行时：{}", e);
            return;
        }
    };

    let server = Arc::new(Server {
        languages: config.language_settings(),
        config,
        library,
        renderer,
    });
    runtime.block_on(serve(server));
}

async fn serve(server: Arc<Server>) {
    let port = server.config.port();
    let address = match server.config.local() {
        true => Ipv4Addr::new(127, 0, 0, 1),
        false => Ipv4Addr::new(0, 0, 0, 0),
    };
    info!("服务端将在{}:{}上监听Socket连接", address, port);

    let listener = match TcpListener::bind(SocketAddrV4::new(address, port)).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("无法绑定端口：{}，错误：{}", port, e);
            return;
        }
    };
    info!("端口{}绑定完成", port);

    let mut id: u128 = 0;
    loop {
        let (mut stream, addr) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!("接受连接失败：{}", e);
                continue;
            }
        };
        debug!("[ID{}]TCP连接已建立：{}", id, addr);

        let server = Arc::clone(&server);
        tokio::spawn(async move {
            handle_connection(&mut stream, id, &server).await;
        });
        id += 1;
    }
}

async fn handle_connection(stream: &mut TcpStream, id: u128, server: &Server) {
    let mut buffer = vec![0; REQUEST_BUFFER_SIZE];

    if let Err(e) = stream.readable().await {
        error!("[ID{}]等待TCPStream可读时遇到错误: {}", id, e);
        return;
    }
    let n = match stream.try_read(&mut buffer) {
        Ok(0) => return,
        Ok(n) => n,
        Err(e) => {
            error!("[ID{}]读取TCPStream时遇到错误: {}", id, e);
            return;
        }
    };
    buffer.truncate(n);
    debug!("[ID{}]HTTP请求接收完毕，{}字节", id, n);

    let start_time = Instant::now();

    let exchange = match HttpExchange::try_from(&buffer, id) {
        Ok(exchange) => exchange,
        Err(e) => {
            warn!("[ID{}]解析HTTP请求失败: {}", id, e);
            let response = Response::from_status_code(400, Some(&e.to_string()), id);
            send(stream, &response, id).await;
            return;
        }
    };

    let ctx = RequestContext::new(
        &exchange,
        server.config.root_location(),
        &server.languages,
        id,
    );
    ctx.print_debug_info();

    let mut response = route(&ctx, server);

    finish_response(&ctx, &mut response);

    debug!(
        "[ID{}]HTTP响应构建完成，服务端用时{}ms。",
        id,
        start_time.elapsed().as_millis()
    );
    info!(
        "[ID{}] {}, {}, {}, {}, {}, {}",
        id,
        ctx.get_version(),
        ctx.get_full_url(),
        ctx.get_method(),
        response.status_code(),
        response.information(),
        ctx.get_header("user-agent").unwrap_or("-"),
    );

    send(stream, &response, id).await;
}

/// 写回语言 Cookie；HEAD 请求去掉响应体
fn finish_response(ctx: &RequestContext, response: &mut Response) {
    if let Some(lang) = ctx.language_cookie() {
        response.set_cookie(USER_LANGUAGE_KEY, lang);
    }
    if ctx.get_method() == HttpRequestMethod::Head {
        response.strip_body();
    }
}

async fn send(stream: &mut TcpStream, response: &Response, id: u128) {
    let bytes = response.as_bytes();
    debug!("[ID{}]发送响应，长度: {}", id, bytes.len());
    if let Err(e) = stream.write_all(&bytes).await {
        error!("[ID{}]发送响应失败: {}", id, e);
        return;
    }
    let _ = stream.flush().await;
}

/// # 路由
///
/// - `/`、`/catalog` -> 书库页
/// - `/search` -> 搜索结果页
/// - `/raw/<书名>/<条目路径>` -> 条目原文，支持 Range
fn route(ctx: &RequestContext, server: &Server) -> Response {
    let id = ctx.request_id();
    if !ALLOWED_METHODS.contains(&ctx.get_method()) {
        warn!("[ID{}]不支持的请求方法{}，返回405", id, ctx.get_method());
        return Response::from_status_code(405, None, id);
    }

    let result = match ctx.get_url_part(0) {
        _ if !ctx.is_valid_url() => Err(Exception::InvalidUrl(ctx.get_full_url().to_string())),
        Ok("") | Ok("catalog") if ctx.get_url_part(1).is_err() => handle_catalog(ctx, server),
        Ok("search") => handle_search(ctx, server),
        Ok("raw") => handle_raw(ctx, server),
        _ => Err(Exception::KeyError(ctx.get_url().to_string())),
    };

    match result {
        Ok(response) => response,
        Err(Exception::InvalidUrl(url)) => {
            warn!("[ID{}]请求的路径{}不在挂载点下或无法解码，返回400", id, url);
            Response::from_status_code(400, None, id)
        }
        Err(Exception::KeyError(name)) => {
            warn!("[ID{}]找不到{}，返回404", id, name);
            Response::from_status_code(404, None, id)
        }
        Err(Exception::IndexError(_)) => {
            warn!("[ID{}]路径{}不完整，返回404", id, ctx.get_url());
            Response::from_status_code(404, None, id)
        }
        Err(Exception::BookNotFound(name)) => {
            warn!("[ID{}]找不到书{}，返回404", id, name);
            Response::from_status_code(404, Some(&format!("找不到书：{}", name)), id)
        }
        Err(e @ Exception::ConversionFailed { .. }) => {
            warn!("[ID{}]参数不合法：{}，返回400", id, e);
            Response::from_status_code(400, Some(&e.to_string()), id)
        }
        Err(e) => {
            error!("[ID{}]处理请求时发生异常: {}", id, e);
            Response::from_status_code(500, None, id)
        }
    }
}

fn html_response(ctx: &RequestContext, server: &Server, html: String) -> Response {
    Response::from_text(
        html,
        "text/html;charset=utf-8",
        ctx.can_compress(),
        server.config.compression_threshold(),
        ctx.request_id(),
    )
}

fn handle_catalog(ctx: &RequestContext, server: &Server) -> Result<Response, Exception> {
    let filter = Filter {
        query: ctx.get_argument::<String>("q").ok(),
        lang: ctx.get_argument::<String>("lang").ok(),
    };
    let dumper = LibraryDumper::new(&server.library, &server.library, ctx.get_root_path());
    let html = dumper.dump_plain_html(&filter, &server.renderer)?;
    Ok(html_response(ctx, server, html))
}

fn handle_search(ctx: &RequestContext, server: &Server) -> Result<Response, Exception> {
    let id = ctx.request_id();
    let pattern: String = match ctx.get_argument("pattern") {
        Ok(pattern) => pattern,
        Err(_) => {
            warn!("[ID{}]搜索请求缺少pattern参数，返回400", id);
            return Ok(Response::from_status_code(400, Some("缺少参数：pattern"), id));
        }
    };
    let book_names: Vec<String> = ctx
        .get_arguments("content")
        .map(|names| names.to_vec())
        .unwrap_or_default();
    let start: u32 = ctx.get_optional_param("start", 0);
    let page_length = server
        .config
        .clamp_page_length(ctx.get_optional_param("pageLength", 0));

    let results = server
        .library
        .search(&pattern, &book_names, start, page_length);
    debug!(
        "[ID{}]搜索'{}'共{}条结果",
        id, pattern, results.estimated_count
    );

    let root = ctx.get_root_path();
    let mut config = SearchRendererConfig::new(&server.library);
    config.library = Some(&server.library);
    config.protocol_prefix = Some(format!("{}/raw/", root));
    config.search_protocol_prefix = Some(format!("{}/search", root));
    config.page_length = Some(page_length);
    let mut renderer = SearchRenderer::new(results, config);
    renderer.set_search_pattern(&pattern);
    renderer.set_search_book_names(book_names.into_iter().collect::<BTreeSet<String>>());

    match ctx.get_requested_format() {
        ResponseFormat::Json => Ok(Response::from_text(
            renderer.get_data().to_string(),
            "application/json",
            ctx.can_compress(),
            server.config.compression_threshold(),
            id,
        )),
        ResponseFormat::Html => {
            let html = renderer.get_html(&server.renderer)?;
            Ok(html_response(ctx, server, html))
        }
        ResponseFormat::Xml => {
            warn!("[ID{}]搜索结果不提供XML格式，返回406", id);
            Ok(Response::from_status_code(406, None, id))
        }
    }
}

fn handle_raw(ctx: &RequestContext, server: &Server) -> Result<Response, Exception> {
    let book_name = ctx.get_url_part(1)?;
    let prefix = format!("/raw/{}/", book_name);
    let path = match ctx.get_url().strip_prefix(prefix.as_str()) {
        Some(path) if !path.is_empty() => path,
        _ => return Err(Exception::KeyError(ctx.get_url().to_string())),
    };
    let article = server.library.get_article(book_name, path)?;

    let data = Bytes::from(article.content.clone());
    let range = ctx.get_range().resolve(data.len() as u64);
    Ok(Response::from_range(data, get_mime(path), range, ctx.request_id()))
}
