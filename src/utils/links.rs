// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use std::collections::HashSet;
use tracing::warn;

use crate::domain::models::crawl_url::CrawlUrl;

static BASE_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("base[href]").unwrap());
static ANCHOR_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());

/// 提取页面中的所有可跟随链接
///
/// 以最后一个 `<base href>`（如果有）为基准解析链接，跳过 `rel="nofollow"` 的链接和无效链接。
/// base 本身无效时整页不返回链接。
pub fn extract_links(page_url: &CrawlUrl, document: &Html) -> HashSet<CrawlUrl> {
    let base_href = document
        .select(&BASE_SELECTOR)
        .filter_map(|element| element.value().attr("href"))
        .last();

    let base = match base_href {
        Some(href) => match page_url.join(href) {
            Ok(base) => base,
            Err(e) => {
                warn!("Invalid base URL on {}: {}", page_url, e);
                return HashSet::new();
            }
        },
        None => page_url.clone(),
    };

    document
        .select(&ANCHOR_SELECTOR)
        .filter(|anchor| !is_nofollow(anchor.value().attr("rel")))
        .filter_map(|anchor| anchor.value().attr("href"))
        .filter_map(|href| base.join(href).ok())
        .collect()
}

fn is_nofollow(rel: Option<&str>) -> bool {
    rel.is_some_and(|rel| {
        rel.split_ascii_whitespace()
            .any(|token| token.eq_ignore_ascii_case("nofollow"))
    })
}
