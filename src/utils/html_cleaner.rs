// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use html_escape::{encode_double_quoted_attribute, encode_text};
use scraper::node::Node;
use scraper::{ElementRef, Html};

/// 连同内容一起删除的标签
const KILL_TAGS: &[&str] = &[
    "script", "style", "noscript", "iframe", "frame", "frameset", "object", "embed", "applet",
    "param", "button", "input", "select", "textarea",
];

/// 只删除标签本身、保留内容的标签
const REMOVE_TAGS: &[&str] = &["div", "span", "form", "blink", "marquee"];

/// 允许保留的属性
const SAFE_ATTRS: &[&str] = &[
    "alt", "charset", "content", "href", "id", "lang", "media", "name", "property", "rel", "src",
    "target", "title", "type",
];

/// 已知的HTML标签，其他标签只保留内容
const KNOWN_TAGS: &[&str] = &[
    "a", "abbr", "acronym", "address", "applet", "area", "article", "aside", "audio", "b",
    "base", "basefont", "bdo", "big", "blink", "blockquote", "body", "br", "button", "canvas",
    "caption", "center", "cite", "code", "col", "colgroup", "command", "datalist", "dd", "del",
    "details", "dfn", "dir", "div", "dl", "dt", "em", "embed", "fieldset", "figcaption",
    "figure", "font", "footer", "form", "frame", "frameset", "h1", "h2", "h3", "h4", "h5", "h6",
    "head", "header", "hgroup", "hr", "html", "i", "iframe", "img", "input", "ins", "isindex",
    "kbd", "keygen", "label", "legend", "li", "link", "map", "mark", "marquee", "math", "menu",
    "meta", "meter", "nav", "noframes", "noscript", "object", "ol", "optgroup", "option",
    "output", "p", "param", "pre", "progress", "q", "rp", "rt", "ruby", "s", "samp", "script",
    "section", "select", "small", "source", "span", "strike", "strong", "style", "sub",
    "summary", "sup", "svg", "table", "tbody", "td", "textarea", "tfoot", "th", "thead", "time",
    "title", "tr", "track", "tt", "u", "ul", "var", "video", "wbr",
];

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// 清理HTML文档并序列化
///
/// 删除脚本、样式、表单控件、内嵌对象和注释，展开 `div`/`span` 等布局标签和未知标签，
/// 只保留白名单中的属性。`html`、`head`、`body` 由解析器保证存在。
pub fn clean_document(document: &Html) -> String {
    let mut out = String::new();
    write_element(document.root_element(), &mut out);
    out
}

/// 解析并清理HTML
pub fn clean_html(html: &str) -> String {
    clean_document(&Html::parse_document(html))
}

fn write_children(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(&encode_text(&**text)),
            Node::Element(_) => {
                if let Some(child_element) = ElementRef::wrap(child) {
                    write_element(child_element, out);
                }
            }
            // comments, doctypes and processing instructions are dropped
            _ => {}
        }
    }
}

fn write_element(element: ElementRef<'_>, out: &mut String) {
    let value = element.value();
    let name = value.name();

    if KILL_TAGS.contains(&name) || is_stylesheet_link(element) {
        return;
    }

    if REMOVE_TAGS.contains(&name) || !KNOWN_TAGS.contains(&name) {
        write_children(element, out);
        return;
    }

    out.push('<');
    out.push_str(name);
    for (attr, attr_value) in value.attrs() {
        if !SAFE_ATTRS.contains(&attr) {
            continue;
        }
        if matches!(attr, "href" | "src") && is_javascript_url(attr_value) {
            continue;
        }
        out.push(' ');
        out.push_str(attr);
        out.push_str("=\"");
        out.push_str(&encode_double_quoted_attribute(attr_value));
        out.push('"');
    }
    out.push('>');

    if VOID_ELEMENTS.contains(&name) {
        return;
    }

    write_children(element, out);
    out.push_str("</");
    out.push_str(name);
    out.push('>');
}

fn is_stylesheet_link(element: ElementRef<'_>) -> bool {
    element.value().name() == "link"
        && element.value().attr("rel").is_some_and(|rel| {
            rel.split_ascii_whitespace()
                .any(|token| token.eq_ignore_ascii_case("stylesheet"))
        })
}

fn is_javascript_url(value: &str) -> bool {
    let compact: String = value
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .take(11)
        .collect();
    compact.to_ascii_lowercase().starts_with("javascript:")
}
