// src/ingest/mod.rs
pub mod providers;
pub mod scheduler;
pub mod types;

use once_cell::sync::OnceCell;
use regex::Regex;

const MAX_CONTENT_CHARS: usize = 4000;

/// Normalize post text: decode entities, strip tags, ASCII quotes, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags (Nitter wraps links and line breaks in markup)
    static RE_BR: OnceCell<Regex> = OnceCell::new();
    let re_br = RE_BR.get_or_init(|| Regex::new(r"(?i)<br\s*/?>").expect("valid regex"));
    out = re_br.replace_all(&out, " ").to_string();
    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").expect("valid regex"));
    out = re_tags.replace_all(&out, "").to_string();

    // 3) Normalize “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").expect("valid regex"));
    out = re_ws.replace_all(&out, " ").trim().to_string();

    // 5) Length cap
    if out.chars().count() > MAX_CONTENT_CHARS {
        out = out.chars().take(MAX_CONTENT_CHARS).collect();
    }

    out
}

/// Rewrites Nitter mirror links to the canonical host.
#[derive(Debug, Clone)]
pub struct PermalinkRewriter {
    host: String,
}

impl Default for PermalinkRewriter {
    fn default() -> Self {
        Self::new("twitter.com")
    }
}

impl PermalinkRewriter {
    pub fn new(host: impl Into<String>) -> Self {
        Self { host: host.into() }
    }

    /// `https://nitter.net/user/status/1#m` -> `https://twitter.com/user/status/1#m`.
    /// Non-Nitter links are returned unchanged.
    pub fn rewrite(&self, url: &str) -> String {
        static RE_HOST: OnceCell<Regex> = OnceCell::new();
        let re = RE_HOST.get_or_init(|| {
            Regex::new(r"^(?i)(https?://)(?:www\.)?(nitter\.[a-z0-9.-]+)(/|$|\?|#)")
                .expect("valid regex")
        });
        match re.captures(url) {
            Some(c) => {
                let whole = c.get(0).map_or(0, |m| m.end());
                let sep = c.get(3).map_or("", |m| m.as_str());
                format!("{}{}{}{}", &c[1], self.host, sep, &url[whole..])
            }
            None => url.to_string(),
        }
    }
}
