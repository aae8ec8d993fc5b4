//! HTML serialisation of a [`Document`].

use std::fmt::Write;

use super::{Block, Document, Inline};

/// Escape text for use in HTML content and double-quoted attributes.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub(super) fn render(doc: &Document) -> String {
    let mut out = String::new();
    for block in &doc.blocks {
        block_html(block, &mut out);
    }
    out
}

fn block_html(block: &Block, out: &mut String) {
    match block {
        Block::Paragraph { inlines } => {
            out.push_str("<p>");
            inlines_html(inlines, out);
            out.push_str("</p>\n");
        }
        Block::Plain { inlines } => inlines_html(inlines, out),
        Block::Heading { level, inlines } => {
            let _ = write!(out, "<h{level}>");
            inlines_html(inlines, out);
            let _ = writeln!(out, "</h{level}>");
        }
        Block::List { start, items } => {
            let tag = match start {
                Some(1) => {
                    out.push_str("<ol>\n");
                    "ol"
                }
                Some(n) => {
                    let _ = writeln!(out, "<ol start=\"{n}\">");
                    "ol"
                }
                None => {
                    out.push_str("<ul>\n");
                    "ul"
                }
            };
            for item in items {
                out.push_str("<li>");
                for block in item {
                    block_html(block, out);
                }
                out.push_str("</li>\n");
            }
            let _ = writeln!(out, "</{tag}>");
        }
        Block::CodeBlock { language, code } => {
            match language {
                Some(lang) => {
                    let _ = write!(out, "<pre><code class=\"language-{}\">", escape_html(lang));
                }
                None => out.push_str("<pre><code>"),
            }
            out.push_str(&escape_html(code));
            out.push_str("</code></pre>\n");
        }
        Block::Rule => out.push_str("<hr />\n"),
    }
}

fn inlines_html(inlines: &[Inline], out: &mut String) {
    for inline in inlines {
        inline_html(inline, out);
    }
}

fn inline_html(inline: &Inline, out: &mut String) {
    match inline {
        Inline::Text { text } => out.push_str(&escape_html(text)),
        Inline::Code { code } => {
            out.push_str("<code>");
            out.push_str(&escape_html(code));
            out.push_str("</code>");
        }
        Inline::Emphasis { children } => wrap("em", children, out),
        Inline::Strong { children } => wrap("strong", children, out),
        Inline::Strikethrough { children } => wrap("del", children, out),
        Inline::Link { href, children } => {
            let _ = write!(
                out,
                "<a href=\"{}\" target=\"_blank\" rel=\"noopener noreferrer\">",
                escape_html(href)
            );
            inlines_html(children, out);
            out.push_str("</a>");
        }
        Inline::SoftBreak => out.push('\n'),
        Inline::HardBreak => out.push_str("<br />\n"),
    }
}

fn wrap(tag: &str, children: &[Inline], out: &mut String) {
    let _ = write!(out, "<{tag}>");
    inlines_html(children, out);
    let _ = write!(out, "</{tag}>");
}
