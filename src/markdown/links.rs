//! Link sanitising and bare-URL autolinking.

use std::sync::OnceLock;

use regex::Regex;

use super::Inline;

const ALLOWED_SCHEMES: &[&str] = &["http", "https", "mailto"];

fn scheme_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^([A-Za-z][A-Za-z0-9+.\-]*):").expect("scheme regex must compile")
    })
}

fn bare_url_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"https?://[^\s<>]+").expect("bare URL regex must compile"))
}

/// Return the destination if it is safe to emit as a link target.
///
/// Relative references and `http`, `https` and `mailto` URLs pass; any other
/// scheme (`javascript:`, `data:`, `vbscript:`, ...) is refused. Control
/// characters and whitespace are removed before the scheme is inspected, as
/// browsers ignore them there.
pub fn safe_href(dest: &str) -> Option<String> {
    let cleaned: String = dest
        .chars()
        .filter(|c| !c.is_control() && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    match scheme_re().captures(&cleaned) {
        Some(caps) => {
            let scheme = caps[1].to_ascii_lowercase();
            ALLOWED_SCHEMES
                .contains(&scheme.as_str())
                .then_some(cleaned)
        }
        None => Some(cleaned),
    }
}

/// Split `Text` inlines around bare `http(s)://` URLs, turning each URL into
/// a link. Adjacent text nodes are merged first; other inlines pass through.
pub fn linkify(inlines: Vec<Inline>) -> Vec<Inline> {
    let mut merged: Vec<Inline> = Vec::with_capacity(inlines.len());
    for inline in inlines {
        if let Inline::Text { text } = &inline {
            if let Some(Inline::Text { text: last }) = merged.last_mut() {
                last.push_str(text);
                continue;
            }
        }
        merged.push(inline);
    }

    let mut out = Vec::with_capacity(merged.len());
    for inline in merged {
        match inline {
            Inline::Text { text } => split_urls(&text, &mut out),
            other => out.push(other),
        }
    }
    out
}

fn split_urls(text: &str, out: &mut Vec<Inline>) {
    let mut cursor = 0;
    for found in bare_url_re().find_iter(text) {
        let url = trim_url(found.as_str());
        let host_start = url.find("://").map_or(url.len(), |i| i + 3);
        if host_start >= url.len() {
            continue;
        }
        if found.start() > cursor {
            out.push(Inline::text(&text[cursor..found.start()]));
        }
        out.push(Inline::Link {
            href: url.to_string(),
            children: vec![Inline::text(url)],
        });
        cursor = found.start() + url.len();
    }
    if cursor < text.len() {
        out.push(Inline::text(&text[cursor..]));
    }
}

/// Drop trailing punctuation and unbalanced closing parentheses.
fn trim_url(mut url: &str) -> &str {
    loop {
        let Some(last) = url.chars().last() else {
            return url;
        };
        let trim = match last {
            '.' | ',' | ';' | ':' | '!' | '?' | '\'' | '"' | '*' | '_' | '~' => true,
            ')' => url.matches(')').count() > url.matches('(').count(),
            _ => false,
        };
        if !trim {
            return url;
        }
        url = &url[..url.len() - last.len_utf8()];
    }
}
