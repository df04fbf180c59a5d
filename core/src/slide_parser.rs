//! Incremental reconstruction of a slide deck from streamed markup.
//!
//! The generator sends the whole deck as one growing document. Every call to
//! [`SlideParser::parse_chunk`] receives the cumulative text; slides whose
//! closing marker has been seen are committed once and never rebuilt, while
//! the open tail slide is rebuilt from its opening tag on every call.

use deck_common::{BulletItem, ContentBlock, Layout, Slide};

use crate::markup::{decode_entities, Lexer, Token};

#[derive(Debug, Default)]
pub struct SlideParser {
    /// Text of the committed slides, `cursor` bytes long.
    prefix: String,
    /// Slides whose closing marker has been seen.
    committed: Vec<Slide>,
    /// Open tail slide, rebuilt on every call.
    pending: Option<Slide>,
    /// Byte offset just past the last committed slide.
    cursor: usize,
    finalized: bool,
}

impl SlideParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.prefix.clear();
        self.committed.clear();
        self.pending = None;
        self.cursor = 0;
        self.finalized = false;
    }

    /// Update the deck from the full text received so far.
    pub fn parse_chunk(&mut self, full_text: &str) {
        if full_text.trim().is_empty() {
            return;
        }

        if !full_text.starts_with(self.prefix.as_str()) {
            tracing::debug!(
                cursor = self.cursor,
                committed = self.committed.len(),
                "buffer does not extend the previous one, rebuilding"
            );
            self.committed.clear();
            self.prefix.clear();
            self.cursor = 0;
        }

        let mut lexer = Lexer::new(full_text, self.cursor);
        let mut current: Option<SlideBuilder> = None;

        while let Some((start, token)) = lexer.next_token() {
            match token {
                Token::Open {
                    name,
                    attrs,
                    self_closing,
                } if is_slide_tag(&name) => {
                    if let Some(open) = current.take() {
                        // new slide before the previous one was closed
                        self.committed.push(open.finish(false));
                        self.cursor = start;
                    }
                    let builder = SlideBuilder::new(self.committed.len(), &attrs);
                    if self_closing {
                        self.committed.push(builder.finish(false));
                        self.cursor = lexer.position();
                    } else {
                        current = Some(builder);
                    }
                }
                Token::Close { name } if is_slide_tag(&name) => {
                    if let Some(open) = current.take() {
                        self.committed.push(open.finish(false));
                    }
                    self.cursor = lexer.position();
                }
                token => {
                    if let Some(open) = current.as_mut() {
                        open.feed(token);
                    }
                }
            }
        }

        if let Some(grown) = full_text.get(self.prefix.len()..self.cursor) {
            self.prefix.push_str(grown);
        }

        let generating = !self.finalized;
        self.pending = current.map(|open| open.finish(generating));
        tracing::trace!(
            committed = self.committed.len(),
            pending = self.pending.is_some(),
            cursor = self.cursor,
            "parsed chunk"
        );
    }

    /// End of stream: nothing is generating anymore, including slides parsed later.
    pub fn finalize(&mut self) {
        self.finalized = true;
        self.clear_all_generating_marks();
    }

    /// Strip the generating flag from every slide without touching content.
    pub fn clear_all_generating_marks(&mut self) {
        for slide in self.committed.iter_mut().chain(self.pending.iter_mut()) {
            slide.generating = false;
        }
    }

    pub fn get_all_slides(&self) -> Vec<Slide> {
        self.committed
            .iter()
            .chain(self.pending.iter())
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.committed.len() + usize::from(self.pending.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes of the buffer that will not be scanned again.
    pub fn consumed(&self) -> usize {
        self.cursor
    }
}

fn is_slide_tag(name: &str) -> bool {
    matches!(name, "section" | "slide")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Heading(u8),
    Paragraph,
    List,
    Item,
    Image,
    Notes,
    Unknown,
}

impl Kind {
    fn classify(name: &str) -> Kind {
        match name {
            "heading" | "title" => Kind::Heading(1),
            "p" | "paragraph" | "text" => Kind::Paragraph,
            "bullets" | "ul" | "ol" => Kind::List,
            "div" | "li" | "item" => Kind::Item,
            "img" | "image" => Kind::Image,
            "note" | "notes" => Kind::Notes,
            _ => match name.strip_prefix('h').and_then(|n| n.parse::<u8>().ok()) {
                Some(level @ 1..=6) => Kind::Heading(level),
                _ => Kind::Unknown,
            },
        }
    }

    /// Children of these kinds start on a new line when merged into text.
    fn is_block(self) -> bool {
        matches!(
            self,
            Kind::Heading(_) | Kind::Paragraph | Kind::Notes | Kind::List | Kind::Item
        )
    }
}

#[derive(Debug)]
struct Element {
    kind: Kind,
    tag: String,
    text: String,
    query: Option<String>,
    title: Option<String>,
    items: Vec<BulletItem>,
}

impl Element {
    fn new(kind: Kind, tag: &str, attrs: &[(String, String)]) -> Self {
        let query = match kind {
            Kind::Image => ["query", "src", "alt"].iter().find_map(|key| {
                attrs
                    .iter()
                    .find(|(name, value)| name == key && !value.trim().is_empty())
                    .map(|(_, value)| value.trim().to_string())
            }),
            _ => None,
        };
        Self {
            kind,
            tag: tag.to_string(),
            text: String::new(),
            query,
            title: None,
            items: Vec::new(),
        }
    }

    /// Empty element of the same kind, continuing after a split.
    fn reopen(&self) -> Self {
        Self {
            kind: self.kind,
            tag: self.tag.clone(),
            text: String::new(),
            query: None,
            title: None,
            items: Vec::new(),
        }
    }

    fn append_text(&mut self, text: &str, separate: bool) {
        if separate && !self.text.is_empty() && !self.text.ends_with(char::is_whitespace) {
            self.text.push(' ');
        }
        self.text.push_str(text);
    }

    /// Turn stray text directly inside a list into an item of its own.
    fn flush_list_text(&mut self) {
        let text = collapse(&self.text);
        self.text.clear();
        if !text.is_empty() {
            self.items.push(BulletItem { title: None, text });
        }
    }

    fn into_item(self) -> Option<BulletItem> {
        let text = collapse(&self.text);
        let title = self.title.map(|t| collapse(&t)).filter(|t| !t.is_empty());
        if text.is_empty() && title.is_none() {
            return None;
        }
        Some(BulletItem { title, text })
    }
}

/// Fold a completed child into its parent. Returns the child when it has to
/// become a block of the slide itself.
fn absorb(parent: &mut Element, child: Element) -> Option<Element> {
    if child.kind == Kind::Image {
        return Some(child);
    }
    match parent.kind {
        Kind::List => {
            parent.flush_list_text();
            let item = match child.kind {
                Kind::Item => child.into_item(),
                Kind::Heading(_) => {
                    let title = collapse(&child.text);
                    (!title.is_empty()).then(|| BulletItem {
                        title: Some(title),
                        text: String::new(),
                    })
                }
                Kind::List => {
                    // nested list, flatten into the parent
                    parent.items.extend(child.items);
                    None
                }
                _ => child.into_item(),
            };
            parent.items.extend(item);
            None
        }
        Kind::Item => {
            match child.kind {
                Kind::Heading(_) if parent.title.is_none() => parent.title = Some(child.text),
                Kind::List => {
                    for item in child.items {
                        let line = match item.title {
                            Some(title) if item.text.is_empty() => title,
                            Some(title) => format!("{title}: {}", item.text),
                            None => item.text,
                        };
                        parent.append_text(&line, true);
                    }
                }
                kind => parent.append_text(&child.text, kind.is_block()),
            }
            None
        }
        _ => {
            if child.kind == Kind::List {
                return Some(child);
            }
            parent.append_text(&child.text, child.kind.is_block());
            None
        }
    }
}

/// Collects the blocks of one slide.
#[derive(Debug)]
struct SlideBuilder {
    slide: Slide,
    stack: Vec<Element>,
    loose: String,
}

impl SlideBuilder {
    fn new(index: usize, attrs: &[(String, String)]) -> Self {
        let layout = attrs
            .iter()
            .find(|(name, _)| name == "layout")
            .map(|(_, value)| Layout::from_attr(value))
            .unwrap_or_default();
        Self {
            slide: Slide::new(index, layout),
            stack: Vec::new(),
            loose: String::new(),
        }
    }

    fn feed(&mut self, token: Token<'_>) {
        match token {
            Token::Open {
                name,
                attrs,
                self_closing,
            } => self.open(&name, &attrs, self_closing),
            Token::Close { name } => self.close(&name),
            Token::Text(raw) => self.text(raw),
        }
    }

    fn open(&mut self, name: &str, attrs: &[(String, String)], self_closing: bool) {
        self.flush_loose();
        if let Some(top) = self.stack.last_mut() {
            if top.kind == Kind::List {
                top.flush_list_text();
            }
        }

        let element = Element::new(Kind::classify(name), name, attrs);
        if self_closing {
            self.complete(element);
        } else {
            self.stack.push(element);
        }
    }

    fn close(&mut self, name: &str) {
        let Some(at) = self.stack.iter().rposition(|el| el.tag == name) else {
            tracing::trace!(tag = name, "closing tag without matching open tag");
            return;
        };
        while self.stack.len() > at {
            if let Some(element) = self.stack.pop() {
                self.complete(element);
            }
        }
    }

    fn text(&mut self, raw: &str) {
        let text = decode_entities(raw);
        match self.stack.last_mut() {
            Some(top) => top.text.push_str(&text),
            None => self.loose.push_str(&text),
        }
    }

    fn complete(&mut self, element: Element) {
        let Some(parent) = self.stack.last_mut() else {
            self.push_block(element);
            return;
        };
        let Some(escaped) = absorb(parent, element) else {
            return;
        };
        // Open ancestors emit what they hold so far, so the escaped block keeps
        // its place in the stream. They carry on as fresh blocks after it.
        let reopened: Vec<Element> = self.stack.iter().map(Element::reopen).collect();
        self.close_all();
        self.push_block(escaped);
        self.stack = reopened;
    }

    fn close_all(&mut self) {
        while let Some(element) = self.stack.pop() {
            self.complete(element);
        }
    }

    fn push_block(&mut self, mut element: Element) {
        let text = collapse(&element.text);
        let block = match element.kind {
            Kind::Heading(level) => ContentBlock::Heading { level, text },
            Kind::Paragraph => ContentBlock::Paragraph { text },
            Kind::Notes => ContentBlock::Notes { text },
            Kind::Unknown => ContentBlock::Raw {
                tag: element.tag,
                text,
            },
            Kind::Image => ContentBlock::Image {
                query: element.query.unwrap_or(text),
            },
            Kind::List => {
                element.flush_list_text();
                if element.items.is_empty() {
                    return;
                }
                ContentBlock::Bullets {
                    items: element.items,
                }
            }
            Kind::Item => {
                let Some(item) = element.into_item() else {
                    return;
                };
                // items outside a list join the list right before them
                if let Some(ContentBlock::Bullets { items }) = self.slide.blocks.last_mut() {
                    items.push(item);
                    return;
                }
                ContentBlock::Bullets { items: vec![item] }
            }
        };

        let empty = match &block {
            ContentBlock::Heading { text, .. }
            | ContentBlock::Paragraph { text }
            | ContentBlock::Notes { text }
            | ContentBlock::Raw { text, .. } => text.is_empty(),
            ContentBlock::Image { query } => query.is_empty(),
            ContentBlock::Bullets { .. } => false,
        };
        if !empty {
            self.slide.blocks.push(block);
        }
    }

    fn flush_loose(&mut self) {
        let text = collapse(&self.loose);
        self.loose.clear();
        if !text.is_empty() {
            self.slide.blocks.push(ContentBlock::Paragraph { text });
        }
    }

    /// Close whatever is still open and hand out the slide.
    fn finish(mut self, generating: bool) -> Slide {
        self.flush_loose();
        self.close_all();
        self.slide.generating = generating;
        self.slide
    }
}

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
