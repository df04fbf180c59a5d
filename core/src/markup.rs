//! Lexer for the tag-based slide markup.
//!
//! The lexer works on a borrowed buffer that may end anywhere, including in
//! the middle of a tag. A tag whose closing `>` has not arrived yet ends the
//! token stream; the caller simply tries again once more text is available.

use std::borrow::Cow;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
    /// Opening (or self-closing) tag. Names are lowercased.
    Open {
        name: String,
        attrs: Vec<(String, String)>,
        self_closing: bool,
    },
    Close {
        name: String,
    },
    /// Raw text between tags, entities not yet decoded.
    Text(&'a str),
}

pub struct Lexer<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    /// Start lexing `src` at byte offset `pos` (must be a char boundary).
    pub fn new(src: &'a str, pos: usize) -> Self {
        Self { src, pos: pos.min(src.len()) }
    }

    /// Offset just past the last token returned.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Next token with its starting offset, or `None` at end of input or at
    /// an incomplete tag.
    pub fn next_token(&mut self) -> Option<(usize, Token<'a>)> {
        loop {
            let start = self.pos;
            let rest = self.src.get(start..)?;
            if rest.is_empty() {
                return None;
            }

            if rest.starts_with('<') {
                match tag_like(rest) {
                    TagStart::Incomplete => return None,
                    TagStart::Literal => {}
                    TagStart::Markup => {
                        match self.lex_markup(start) {
                            Markup::Incomplete => return None,
                            Markup::Skipped => continue,
                            Markup::Token(token) => return Some((start, token)),
                        }
                    }
                }
            }

            let end = self.text_end(start);
            self.pos = end;
            return Some((start, Token::Text(&self.src[start..end])));
        }
    }

    /// End of the text run beginning at `start`: the next tag-like `<` or end of input.
    fn text_end(&self, start: usize) -> usize {
        let bytes = self.src.as_bytes();
        // the first byte may be a literal '<'
        let mut from = start + 1;
        while from < bytes.len() {
            match memchr::memchr(b'<', &bytes[from..]) {
                Some(offset) => {
                    let at = from + offset;
                    if !matches!(tag_like(&self.src[at..]), TagStart::Literal) {
                        return at;
                    }
                    from = at + 1;
                }
                None => break,
            }
        }
        bytes.len()
    }

    fn lex_markup(&mut self, start: usize) -> Markup<'a> {
        let rest = &self.src[start..];

        if rest.starts_with("<!--") {
            return match rest[4..].find("-->") {
                Some(end) => {
                    self.pos = start + 4 + end + 3;
                    Markup::Skipped
                }
                None => Markup::Incomplete,
            };
        }
        if rest.starts_with("<!") || rest.starts_with("<?") {
            return match rest.find('>') {
                Some(end) => {
                    self.pos = start + end + 1;
                    Markup::Skipped
                }
                None => Markup::Incomplete,
            };
        }

        let Some(end) = find_tag_end(rest) else {
            return Markup::Incomplete;
        };
        self.pos = start + end + 1;
        let inner = &rest[1..end];

        if let Some(name) = inner.strip_prefix('/') {
            let name = name.trim().to_ascii_lowercase();
            if name.is_empty() {
                return Markup::Skipped;
            }
            return Markup::Token(Token::Close { name });
        }

        let (body, self_closing) = match inner.trim_end().strip_suffix('/') {
            Some(body) => (body, true),
            None => (inner, false),
        };
        let name_len = body
            .find(|c: char| c.is_whitespace() || c == '/')
            .unwrap_or(body.len());
        let name = body[..name_len].to_ascii_lowercase();
        let attrs = parse_attrs(&body[name_len..]);

        Markup::Token(Token::Open {
            name,
            attrs,
            self_closing,
        })
    }
}

enum TagStart {
    Markup,
    Literal,
    Incomplete,
}

enum Markup<'a> {
    Token(Token<'a>),
    Skipped,
    Incomplete,
}

/// Classify a `<` at the start of `rest`.
fn tag_like(rest: &str) -> TagStart {
    match rest[1..].chars().next() {
        None => TagStart::Incomplete,
        Some(c) if c.is_ascii_alphabetic() || matches!(c, '/' | '!' | '?') => TagStart::Markup,
        Some(_) => TagStart::Literal,
    }
}

/// Index of the `>` closing the tag at the start of `rest`, ignoring `>` in quoted values.
fn find_tag_end(rest: &str) -> Option<usize> {
    let mut quote: Option<u8> = None;
    for (i, b) in rest.bytes().enumerate().skip(1) {
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None => match b {
                b'"' | b'\'' => quote = Some(b),
                b'>' => return Some(i),
                _ => {}
            },
        }
    }
    None
}

fn parse_attrs(src: &str) -> Vec<(String, String)> {
    let mut attrs = Vec::new();
    let mut rest = src.trim_start();

    while !rest.is_empty() {
        let name_len = rest
            .find(|c: char| c.is_whitespace() || c == '=' || c == '/')
            .unwrap_or(rest.len());
        if name_len == 0 {
            // stray '/' or '='
            rest = rest[1..].trim_start();
            continue;
        }
        let name = rest[..name_len].to_ascii_lowercase();
        rest = rest[name_len..].trim_start();

        let mut value = String::new();
        if let Some(after_eq) = rest.strip_prefix('=') {
            let after_eq = after_eq.trim_start();
            match after_eq.chars().next() {
                Some(q @ ('"' | '\'')) => {
                    let body = &after_eq[1..];
                    let end = body.find(q).unwrap_or(body.len());
                    value = decode_entities(&body[..end]).into_owned();
                    rest = body.get(end + 1..).unwrap_or("");
                }
                _ => {
                    let end = after_eq
                        .find(char::is_whitespace)
                        .unwrap_or(after_eq.len());
                    value = decode_entities(&after_eq[..end]).into_owned();
                    rest = &after_eq[end..];
                }
            }
        }
        attrs.push((name, value));
        rest = rest.trim_start();
    }
    attrs
}

/// Decode the XML entities the generator is known to emit. Unknown or
/// unterminated entities are left as written.
pub fn decode_entities(text: &str) -> Cow<'_, str> {
    if !text.contains('&') {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let decoded = tail
            .find(';')
            .filter(|&semi| semi <= 10)
            .and_then(|semi| entity(&tail[1..semi]).map(|c| (c, semi)));
        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &tail[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

fn entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let num = name.strip_prefix('#')?;
            let code = match num.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => num.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}

/// Escape text so it can be embedded in markup.
pub fn escape_markup(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(src: &str) -> Vec<Token<'_>> {
        let mut lexer = Lexer::new(src, 0);
        std::iter::from_fn(|| lexer.next_token().map(|(_, t)| t)).collect()
    }

    fn open(name: &str) -> Token<'static> {
        Token::Open {
            name: name.to_string(),
            attrs: vec![],
            self_closing: false,
        }
    }

    #[test]
    fn test_basic_tags_and_text() {
        assert_eq!(
            tokens("<SECTION><H1>Hi</H1></SECTION>"),
            vec![
                open("section"),
                open("h1"),
                Token::Text("Hi"),
                Token::Close { name: "h1".into() },
                Token::Close { name: "section".into() },
            ]
        );
    }

    #[test]
    fn test_attributes() {
        let toks = tokens(r#"<SECTION layout="left" data-x='a>b' bare=1 flag>"#);
        assert_eq!(
            toks,
            vec![Token::Open {
                name: "section".into(),
                attrs: vec![
                    ("layout".into(), "left".into()),
                    ("data-x".into(), "a>b".into()),
                    ("bare".into(), "1".into()),
                    ("flag".into(), String::new()),
                ],
                self_closing: false,
            }]
        );
    }

    #[test]
    fn test_self_closing() {
        let toks = tokens(r#"<IMG query="a &amp; b" />"#);
        assert_eq!(
            toks,
            vec![Token::Open {
                name: "img".into(),
                attrs: vec![("query".into(), "a & b".into())],
                self_closing: true,
            }]
        );
    }

    #[test]
    fn test_incomplete_tag_stops_lexing() {
        let mut lexer = Lexer::new("<H1>Intro</H1><SEC", 0);
        let mut count = 0;
        while lexer.next_token().is_some() {
            count += 1;
        }
        assert_eq!(count, 3);
        assert_eq!(lexer.position(), "<H1>Intro</H1>".len());

        assert_eq!(tokens(r#"<IMG query="x > "#), vec![]);
        assert_eq!(tokens("text<"), vec![Token::Text("text")]);
    }

    #[test]
    fn test_literal_angle_brackets() {
        assert_eq!(tokens("a < b and 1<2"), vec![Token::Text("a < b and 1<2")]);
    }

    #[test]
    fn test_comments_and_declarations_skipped() {
        assert_eq!(
            tokens("<?xml version=\"1.0\"?><!-- note --><P>x</P>"),
            vec![open("p"), Token::Text("x"), Token::Close { name: "p".into() }]
        );
        assert_eq!(tokens("<!-- unterminated"), vec![]);
    }

    #[test]
    fn test_resume_from_offset() {
        let src = "<P>a</P><P>b</P>";
        let mut lexer = Lexer::new(src, 8);
        assert_eq!(lexer.next_token(), Some((8, open("p"))));
    }

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_entities("plain"), "plain");
        assert_eq!(decode_entities("a &lt;b&gt; &amp; &#65;&#x42;"), "a <b> & AB");
        assert_eq!(decode_entities("fish & chips"), "fish & chips");
        assert_eq!(decode_entities("&bogus; &am"), "&bogus; &am");
    }

    #[test]
    fn test_escape_markup_is_decodable() {
        let text = r#"Q&A <live> "now""#;
        assert_eq!(decode_entities(&escape_markup(text)), text);
    }
}
