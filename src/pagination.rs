//! 搜索结果分页。
//!
//! 无论总页数多大，只生成当前页前后各 4 页的连续窗口，外加始终存在的首页、末页锚点，
//! 因此渲染出的分页链接不超过 11 个。

use log::warn;
use serde_derive::Serialize;

/// 窗口中前后各生成的页数
const WINDOW_RADIUS: u32 = 4;

/// 一个分页链接
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageEntry {
    /// 从 1 开始的页码
    pub label: u32,
    /// 该页第一条结果的偏移量
    pub start: u32,
    pub current: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationWindow {
    /// 从 0 开始
    pub current_page: u32,
    pub last_page_index: u32,
    /// 连续窗口，升序，不含第 0 页与最后一页
    pub pages: Vec<PageEntry>,
    pub first_page: PageEntry,
    pub last_page: PageEntry,
    pub items_per_page: u32,
    pub has_pages: bool,
    #[serde(skip)]
    pub window_start: u32,
    #[serde(skip)]
    pub window_end: u32,
}

fn page_entry(index: u32, page_length: u32, current_page: u32) -> PageEntry {
    PageEntry {
        label: index + 1,
        start: index * page_length,
        current: index == current_page,
    }
}

/// 计算分页窗口。
///
/// # Panics
/// `page_length` 或 `results_count` 为 0 时直接 panic：分页只会在已知有结果时调用。
pub fn build_pagination(page_length: u32, results_count: u32, results_start: u32) -> PaginationWindow {
    assert!(page_length != 0, "page_length must be positive");
    assert!(results_count != 0, "results_count must be positive");

    let last_page = (results_count - 1) / page_length;
    let mut current_page = results_start / page_length;
    if current_page > last_page {
        warn!(
            "结果偏移{}超出最后一页（共{}条，每页{}条），改为显示最后一页",
            results_start, results_count, page_length
        );
        current_page = last_page;
    }
    let nb_pages = last_page + 1;

    let window_start = current_page.saturating_sub(WINDOW_RADIUS);
    let window_end = current_page.saturating_add(WINDOW_RADIUS).min(last_page);

    let mut first_page = None;
    let mut last_anchor = None;
    let mut pages = vec![];
    for i in window_start..=window_end {
        let page = page_entry(i, page_length, current_page);
        // 首页与末页走专门的锚点
        if i == 0 {
            first_page = Some(page);
        } else if i == last_page {
            last_anchor = Some(page);
        } else {
            pages.push(page);
        }
    }

    let first_page = first_page.unwrap_or(PageEntry {
        label: 1,
        start: 0,
        current: false,
    });
    // 只有一页时首页同时充当末页
    let last_page_entry = match last_anchor {
        Some(page) => page,
        None if last_page == 0 => first_page.clone(),
        None => PageEntry {
            label: nb_pages,
            start: last_page * page_length,
            current: false,
        },
    };

    PaginationWindow {
        current_page,
        last_page_index: last_page,
        pages,
        first_page,
        last_page: last_page_entry,
        items_per_page: page_length,
        has_pages: nb_pages != 1,
        window_start,
        window_end,
    }
}
