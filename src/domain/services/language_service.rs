// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use once_cell::sync::Lazy;
use scraper::{Html, Selector};

static LANG_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("[lang]").unwrap());
static BODY_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("body").unwrap());

/// 统计检测时使用的文本窗口长度（字符）
const SAMPLE_LEN: usize = 1023;

/// 语言检测器接口
pub trait LanguageDetector: Send + Sync {
    /// 检测文本语言，返回 ISO 639-1 代码
    fn detect(&self, text: &str) -> Option<String>;

    /// 检测器名称
    fn name(&self) -> &'static str;
}

/// 基于 whatlang 的语言检测器
///
/// 模型内嵌在库中，不需要额外下载模型文件
#[derive(Debug, Default, Clone, Copy)]
pub struct WhatlangDetector;

impl LanguageDetector for WhatlangDetector {
    fn detect(&self, text: &str) -> Option<String> {
        whatlang::detect(text).map(|info| to_iso639_1(info.lang().code()).to_string())
    }

    fn name(&self) -> &'static str {
        "whatlang"
    }
}

/// 检测HTML文档的语言
///
/// 优先使用文档中第一个 `lang` 属性的主标签；没有时取正文中间偏前的一段文本做统计检测
///
/// # 参数
///
/// * `document` - 已清理的HTML文档
/// * `detector` - 统计检测器
///
/// # 返回值
///
/// 小写的 ISO 639-1 语言代码，无法判断时返回 `None`
pub fn detect_language(document: &Html, detector: &dyn LanguageDetector) -> Option<String> {
    let declared = document
        .select(&LANG_SELECTOR)
        .filter_map(|element| element.value().attr("lang"))
        .map(primary_subtag)
        .find(|lang| !lang.is_empty());

    if declared.is_some() {
        return declared;
    }

    let body = document.select(&BODY_SELECTOR).next()?;
    let text = body
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ");

    let sample = sample_text(&text);
    if sample.is_empty() {
        return None;
    }

    detector.detect(&sample)
}

fn primary_subtag(lang: &str) -> String {
    lang.trim()
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase()
}

/// 从文本三分之一处往前 512 个字符开始截取样本
fn sample_text(text: &str) -> String {
    let len = text.chars().count();
    let start = (len / 3).saturating_sub(512);
    text.chars().skip(start).take(SAMPLE_LEN).collect()
}

/// ISO 639-3 转 ISO 639-1，没有两字母代码的语言保留原代码
fn to_iso639_1(code: &str) -> &str {
    match code {
        "afr" => "af",
        "aka" => "ak",
        "amh" => "am",
        "ara" => "ar",
        "aze" => "az",
        "bel" => "be",
        "ben" => "bn",
        "bul" => "bg",
        "cat" => "ca",
        "ces" => "cs",
        "cmn" => "zh",
        "dan" => "da",
        "deu" => "de",
        "ell" => "el",
        "eng" => "en",
        "epo" => "eo",
        "est" => "et",
        "fin" => "fi",
        "fra" => "fr",
        "guj" => "gu",
        "heb" => "he",
        "hin" => "hi",
        "hrv" => "hr",
        "hun" => "hu",
        "hye" => "hy",
        "ind" => "id",
        "ita" => "it",
        "jav" => "jv",
        "jpn" => "ja",
        "kan" => "kn",
        "kat" => "ka",
        "khm" => "km",
        "kor" => "ko",
        "lat" => "la",
        "lav" => "lv",
        "lit" => "lt",
        "mal" => "ml",
        "mar" => "mr",
        "mkd" => "mk",
        "mya" => "my",
        "nep" => "ne",
        "nld" => "nl",
        "nob" => "nb",
        "ori" => "or",
        "pan" => "pa",
        "pes" => "fa",
        "pol" => "pl",
        "por" => "pt",
        "ron" => "ro",
        "rus" => "ru",
        "sin" => "si",
        "slk" => "sk",
        "slv" => "sl",
        "sna" => "sn",
        "spa" => "es",
        "srp" => "sr",
        "swe" => "sv",
        "tam" => "ta",
        "tel" => "te",
        "tgl" => "tl",
        "tha" => "th",
        "tuk" => "tk",
        "tur" => "tr",
        "ukr" => "uk",
        "urd" => "ur",
        "uzb" => "uz",
        "vie" => "vi",
        "yid" => "yi",
        "zul" => "zu",
        other => other,
    }
}
