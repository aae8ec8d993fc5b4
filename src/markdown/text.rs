//! Plain-text rendering for terminals.

use super::{Block, Document, Inline};

pub(super) fn render(doc: &Document) -> String {
    let mut out = String::new();
    blocks_text(&doc.blocks, "", &mut out);
    // Control characters would reach the terminal as escape sequences.
    out.trim_end()
        .chars()
        .filter(|c| !c.is_control() || matches!(c, '\n' | '\t'))
        .collect()
}

fn blocks_text(blocks: &[Block], indent: &str, out: &mut String) {
    for block in blocks {
        match block {
            Block::Paragraph { inlines } | Block::Heading { inlines, .. } => {
                push_lines(&inline_text(inlines), indent, out);
                out.push('\n');
            }
            Block::Plain { inlines } => push_lines(&inline_text(inlines), indent, out),
            Block::List { start, items } => {
                for (i, item) in items.iter().enumerate() {
                    let marker = match start {
                        Some(n) => format!("{}. ", n + i as u64),
                        None => "• ".to_string(),
                    };
                    let mut body = String::new();
                    let nested = " ".repeat(marker.chars().count());
                    blocks_text(item, &nested, &mut body);
                    let body = body.trim_start();
                    out.push_str(indent);
                    out.push_str(&marker);
                    // Continuation lines already carry the nested indent.
                    for (n, line) in body.lines().enumerate() {
                        if n > 0 {
                            out.push_str(indent);
                        }
                        out.push_str(line);
                        out.push('\n');
                    }
                    if body.is_empty() {
                        out.push('\n');
                    }
                }
                out.push('\n');
            }
            Block::CodeBlock { code, .. } => {
                for line in code.trim_end_matches('\n').lines() {
                    out.push_str(indent);
                    out.push_str("    ");
                    out.push_str(line);
                    out.push('\n');
                }
                out.push('\n');
            }
            Block::Rule => {
                out.push_str(indent);
                out.push_str("────────\n\n");
            }
        }
    }
}

fn push_lines(text: &str, indent: &str, out: &mut String) {
    for line in text.lines() {
        out.push_str(indent);
        out.push_str(line);
        out.push('\n');
    }
}

fn inline_text(inlines: &[Inline]) -> String {
    let mut out = String::new();
    for inline in inlines {
        match inline {
            Inline::Text { text } => out.push_str(text),
            Inline::Code { code } => {
                out.push('`');
                out.push_str(code);
                out.push('`');
            }
            Inline::Emphasis { children }
            | Inline::Strong { children }
            | Inline::Strikethrough { children } => out.push_str(&inline_text(children)),
            Inline::Link { href, children } => {
                let label = inline_text(children);
                if label == *href || label.is_empty() {
                    out.push_str(href);
                } else {
                    out.push_str(&label);
                    out.push_str(" (");
                    out.push_str(href);
                    out.push(')');
                }
            }
            Inline::SoftBreak => out.push(' '),
            Inline::HardBreak => out.push('\n'),
        }
    }
    out
}
