//! Sentence and token segmentation of normalized text.
//!
//! A [`Document`] is an ordered list of [`Segment`]s (sentences), each owning the
//! [`Token`]s it is made of. Tokens are lossless: joining a segment's token texts
//! gives back the segment text byte for byte.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::text_normalizer::normalize;

// The prolonged sound marks and 々 are script Common but belong inside kana and
// ideograph runs (コーヒー, 時々).
const CJK_BLOCK: &str = r"[\p{Han}\p{Hiragana}\p{Katakana}ー々ｰ]+";
const ALNUM_RUN: &str = r"[[\p{L}\p{N}\p{M}]--[\p{Han}\p{Hiragana}\p{Katakana}ー々ｰ]]+";

static WORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"{CJK_BLOCK}|{ALNUM_RUN}(?:['’\-]{ALNUM_RUN})*")).unwrap()
});
static WORD_START: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\A[\p{L}\p{N}\p{M}\p{Han}\p{Hiragana}\p{Katakana}ー々ｰ]").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Word,
    Other,
}

impl TokenKind {
    fn of_leading(text: &str) -> Self {
        if WORD_START.is_match(text) {
            TokenKind::Word
        } else {
            TokenKind::Other
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    text: String,
    kind: TokenKind,
}

impl Token {
    fn new(text: &str) -> Self {
        Self {
            kind: TokenKind::of_leading(text),
            text: text.to_string(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    pub fn is_word(&self) -> bool {
        self.kind == TokenKind::Word
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Segment {
    index: usize,
    text: String,
    tokens: Vec<Token>,
}

impl Segment {
    pub fn index(&self) -> usize {
        self.index
    }

    /// The trimmed sentence; also its identity for speech and highlighting.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn token(&self, index: usize) -> Option<&Token> {
        self.tokens.get(index)
    }

    pub fn words(&self) -> impl Iterator<Item = &Token> {
        self.tokens.iter().filter(|token| token.is_word())
    }
}

/// The one live unit of content. Built in one go and never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Document {
    source: String,
    normalized: String,
    segments: Vec<Segment>,
}

impl Document {
    pub fn from_source(source: impl Into<String>) -> Self {
        let source = source.into();
        let normalized = normalize(&source);
        let segments = segment(&normalized);
        Self {
            source,
            normalized,
            segments,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn segment(&self, index: usize) -> Option<&Segment> {
        self.segments.get(index)
    }

    /// Empty documents render as "no content", not as an error.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn token(&self, segment: usize, token: usize) -> Option<&Token> {
        self.segment(segment).and_then(|s| s.token(token))
    }
}

pub fn segment(normalized: &str) -> Vec<Segment> {
    split_sentences(normalized)
        .into_iter()
        .enumerate()
        .map(|(index, text)| Segment {
            index,
            tokens: tokenize(&text),
            text,
        })
        .collect()
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Pending {
    None,
    Latin,
    FullWidth,
}

fn is_latin_terminator(ch: char) -> bool {
    matches!(ch, '.' | '!' | '?')
}

fn is_fullwidth_terminator(ch: char) -> bool {
    matches!(ch, '。' | '！' | '？')
}

fn is_closer(ch: char) -> bool {
    matches!(
        ch,
        '"' | '\'' | ')' | ']' | '}' | '”' | '’' | '」' | '』' | '）' | '】' | '》' | '〉'
    )
}

/// Single forward pass. A Latin terminator closes the sentence at the next
/// whitespace; a full-width terminator closes it at the next character that is
/// not itself a terminator or closing quote. Line breaks always close.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut pending = Pending::None;

    for ch in text.chars() {
        if ch == '\n' {
            flush_piece(&mut pieces, &mut current);
            pending = Pending::None;
            continue;
        }

        match pending {
            Pending::None => {}
            _ if is_latin_terminator(ch) || is_fullwidth_terminator(ch) || is_closer(ch) => {
                current.push(ch);
                continue;
            }
            Pending::Latin if ch.is_whitespace() => {
                flush_piece(&mut pieces, &mut current);
                pending = Pending::None;
                continue;
            }
            Pending::Latin => pending = Pending::None,
            Pending::FullWidth => {
                flush_piece(&mut pieces, &mut current);
                pending = Pending::None;
            }
        }

        current.push(ch);
        if is_fullwidth_terminator(ch) {
            pending = Pending::FullWidth;
        } else if is_latin_terminator(ch) {
            pending = Pending::Latin;
        }
    }

    flush_piece(&mut pieces, &mut current);
    pieces
}

fn flush_piece(pieces: &mut Vec<String>, current: &mut String) {
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        pieces.push(trimmed.to_string());
    }
    current.clear();
}

/// Lossless split of one sentence into word tokens and the runs between them.
pub fn tokenize(sentence: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut last = 0;
    for found in WORD.find_iter(sentence) {
        if found.start() > last {
            tokens.push(Token::new(&sentence[last..found.start()]));
        }
        tokens.push(Token::new(found.as_str()));
        last = found.end();
    }
    if last < sentence.len() {
        tokens.push(Token::new(&sentence[last..]));
    }
    tokens
}
