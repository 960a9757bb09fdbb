// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chardetng::EncodingDetector;
use encoding_rs::Encoding;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// HTTP Content-Type头编码
static CONTENT_TYPE_CHARSET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)charset\s*=\s*["']?([^"';\s]+)"#).unwrap());

/// HTML meta标签编码声明
static META_CHARSET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)<meta[^>]*charset\s*=\s*["']?([^"'>\s/;]+)"#).unwrap());

/// 只在文档开头查找 meta 声明
const META_SNIFF_LIMIT: usize = 1024;

/// 从 Content-Type 中提取编码
pub fn charset_from_content_type(content_type: &str) -> Option<&'static Encoding> {
    CONTENT_TYPE_CHARSET
        .captures(content_type)
        .and_then(|caps| Encoding::for_label(caps[1].trim().as_bytes()))
}

fn charset_from_meta(bytes: &[u8]) -> Option<&'static Encoding> {
    let head = String::from_utf8_lossy(&bytes[..bytes.len().min(META_SNIFF_LIMIT)]);
    META_CHARSET
        .captures(&head)
        .and_then(|caps| Encoding::for_label(caps[1].as_bytes()))
}

fn detect_charset(bytes: &[u8]) -> &'static Encoding {
    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    detector.guess(None, true)
}

/// 将响应体解码为 UTF-8 字符串
///
/// 优先使用 Content-Type 声明的编码，其次是 HTML meta 声明，最后用 chardetng 检测。
/// BOM 始终优先于以上三者。
pub fn decode_body(bytes: &[u8], content_type: &str) -> String {
    let encoding = charset_from_content_type(content_type)
        .or_else(|| charset_from_meta(bytes))
        .unwrap_or_else(|| detect_charset(bytes));

    let (text, used, had_errors) = encoding.decode(bytes);
    if had_errors {
        debug!("Body decoded with replacement characters ({})", used.name());
    }
    text.into_owned()
}
