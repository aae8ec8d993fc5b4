//! Markdown renderer for assistant replies.
//!
//! Model output is untrusted. [`parse`] turns it into a small document tree
//! where raw HTML is kept as literal text and link targets are sanitised;
//! [`Document::to_html`] then escapes every text node on the way out.

mod html;
mod links;
mod text;

pub use html::escape_html;
pub use links::{linkify, safe_href};

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag};
use serde::Serialize;

/// Block-level element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Paragraph { inlines: Vec<Inline> },
    /// Inline content not wrapped in a paragraph (tight list items).
    Plain { inlines: Vec<Inline> },
    Heading { level: u8, inlines: Vec<Inline> },
    List { start: Option<u64>, items: Vec<Vec<Block>> },
    CodeBlock { language: Option<String>, code: String },
    Rule,
}

/// Inline element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Inline {
    Text { text: String },
    Code { code: String },
    Emphasis { children: Vec<Inline> },
    Strong { children: Vec<Inline> },
    Strikethrough { children: Vec<Inline> },
    /// `href` is already sanitised; opens in a new browsing context.
    Link { href: String, children: Vec<Inline> },
    SoftBreak,
    HardBreak,
}

impl Inline {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }
}

/// Rendered form of one message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Document {
    pub blocks: Vec<Block>,
}

impl Document {
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Safe HTML for the transcript panel.
    pub fn to_html(&self) -> String {
        html::render(self)
    }

    /// Readable text for terminals.
    pub fn to_plain_text(&self) -> String {
        text::render(self)
    }
}

/// Parse model output into a [`Document`].
pub fn parse(source: &str) -> Document {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let mut builder = TreeBuilder::default();
    for event in Parser::new_ext(source, options) {
        builder.event(event);
    }
    builder.finish()
}

/// Convenience: parse and render to HTML.
pub fn render_html(source: &str) -> String {
    parse(source).to_html()
}

#[derive(Debug)]
enum FrameKind {
    Root,
    Item,
    List { start: Option<u64> },
    Paragraph,
    Heading { level: u8 },
    CodeBlock { language: Option<String> },
    Emphasis,
    Strong,
    Strikethrough,
    Link { href: Option<String> },
    /// Containers we do not model (block quotes, images, tables, html
    /// blocks); their content flows into the enclosing frame.
    Transparent,
}

#[derive(Debug)]
struct Frame {
    kind: FrameKind,
    blocks: Vec<Block>,
    inlines: Vec<Inline>,
    items: Vec<Vec<Block>>,
    code: String,
}

impl Frame {
    fn new(kind: FrameKind) -> Self {
        Self {
            kind,
            blocks: Vec::new(),
            inlines: Vec::new(),
            items: Vec::new(),
            code: String::new(),
        }
    }

    fn is_transparent(&self) -> bool {
        matches!(self.kind, FrameKind::Transparent)
    }

    fn holds_blocks(&self) -> bool {
        matches!(self.kind, FrameKind::Root | FrameKind::Item)
    }

    /// Turn loose inline content of a block container into a `Plain` block.
    fn flush_inlines(&mut self) {
        if self.holds_blocks() && !self.inlines.is_empty() {
            let inlines = linkify(std::mem::take(&mut self.inlines));
            self.blocks.push(Block::Plain { inlines });
        }
    }
}

struct TreeBuilder {
    root: Frame,
    stack: Vec<Frame>,
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self {
            root: Frame::new(FrameKind::Root),
            stack: Vec::new(),
        }
    }
}

impl TreeBuilder {
    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(_) => self.end(),
            Event::Text(text) => self.text(&text),
            Event::Code(code) => self.push_inline(Inline::Code {
                code: code.into_string(),
            }),
            Event::Html(raw) | Event::InlineHtml(raw) => self.text(&raw),
            Event::SoftBreak => self.push_inline(Inline::SoftBreak),
            Event::HardBreak => self.push_inline(Inline::HardBreak),
            Event::Rule => self.push_block(Block::Rule),
            Event::TaskListMarker(checked) => {
                self.push_inline(Inline::text(if checked { "[x] " } else { "[ ] " }))
            }
            Event::FootnoteReference(label) => self.push_inline(Inline::text(format!("[{label}]"))),
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        let kind = match tag {
            Tag::Paragraph => FrameKind::Paragraph,
            Tag::Heading { level, .. } => FrameKind::Heading { level: level as u8 },
            Tag::CodeBlock(kind) => FrameKind::CodeBlock {
                language: match kind {
                    CodeBlockKind::Fenced(info) => info
                        .split_whitespace()
                        .next()
                        .map(str::to_string),
                    CodeBlockKind::Indented => None,
                },
            },
            Tag::List(start) => FrameKind::List { start },
            Tag::Item => FrameKind::Item,
            Tag::Emphasis => FrameKind::Emphasis,
            Tag::Strong => FrameKind::Strong,
            Tag::Strikethrough => FrameKind::Strikethrough,
            Tag::Link { dest_url, .. } => FrameKind::Link {
                href: safe_href(&dest_url),
            },
            _ => FrameKind::Transparent,
        };
        if matches!(kind, FrameKind::Paragraph | FrameKind::Heading { .. } | FrameKind::CodeBlock { .. } | FrameKind::List { .. })
        {
            self.target().flush_inlines();
        }
        self.stack.push(Frame::new(kind));
    }

    fn end(&mut self) {
        let Some(mut frame) = self.stack.pop() else {
            return;
        };
        match frame.kind {
            FrameKind::Root | FrameKind::Transparent => {}
            FrameKind::Paragraph => self.push_block(Block::Paragraph {
                inlines: linkify(frame.inlines),
            }),
            FrameKind::Heading { level } => self.push_block(Block::Heading {
                level,
                inlines: linkify(frame.inlines),
            }),
            FrameKind::CodeBlock { language } => self.push_block(Block::CodeBlock {
                language,
                code: frame.code,
            }),
            FrameKind::List { start } => self.push_block(Block::List {
                start,
                items: frame.items,
            }),
            FrameKind::Item => {
                frame.flush_inlines();
                self.target().items.push(frame.blocks);
            }
            FrameKind::Emphasis => self.push_inline(Inline::Emphasis {
                children: linkify(frame.inlines),
            }),
            FrameKind::Strong => self.push_inline(Inline::Strong {
                children: linkify(frame.inlines),
            }),
            FrameKind::Strikethrough => self.push_inline(Inline::Strikethrough {
                children: linkify(frame.inlines),
            }),
            FrameKind::Link { href: Some(href) } => self.push_inline(Inline::Link {
                href,
                children: frame.inlines,
            }),
            // Unsafe destination: keep the label, drop the link.
            FrameKind::Link { href: None } => {
                for inline in frame.inlines {
                    self.push_inline(inline);
                }
            }
        }
    }

    fn text(&mut self, text: &str) {
        let target = self.target();
        if let FrameKind::CodeBlock { .. } = target.kind {
            target.code.push_str(text);
        } else {
            self.push_inline(Inline::text(text));
        }
    }

    fn push_inline(&mut self, inline: Inline) {
        let target = self.target();
        if let (Inline::Text { text }, Some(Inline::Text { text: last })) =
            (&inline, target.inlines.last_mut())
        {
            last.push_str(text);
            return;
        }
        target.inlines.push(inline);
    }

    fn push_block(&mut self, block: Block) {
        let target = self.target();
        target.flush_inlines();
        target.blocks.push(block);
    }

    /// Innermost frame that is not transparent.
    fn target(&mut self) -> &mut Frame {
        let Self { root, stack } = self;
        stack
            .iter_mut()
            .rev()
            .find(|frame| !frame.is_transparent())
            .unwrap_or(root)
    }

    fn finish(mut self) -> Document {
        // Unbalanced input cannot come out of pulldown-cmark, but close
        // anything left open so no content is lost.
        while !self.stack.is_empty() {
            self.end();
        }
        self.root.flush_inlines();
        Document {
            blocks: self.root.blocks,
        }
    }
}
