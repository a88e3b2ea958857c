//! FITS header cards: parsing, formatting and typed lookups.
//!
//! A header is an ordered list of 80-character cards. Value cards have the
//! form `KEYWORD = value / comment`; commentary cards (`COMMENT`, `HISTORY`,
//! blank keyword) carry free text only.

use crate::consts::FITS_CARD_SIZE;

/// Well-known keywords read by the calibration pipeline.
pub mod keywords {
    pub const SIMPLE: &str = "SIMPLE";
    pub const BITPIX: &str = "BITPIX";
    pub const NAXIS: &str = "NAXIS";
    pub const EXTEND: &str = "EXTEND";
    pub const BSCALE: &str = "BSCALE";
    pub const BZERO: &str = "BZERO";
    pub const BLANK: &str = "BLANK";
    pub const END: &str = "END";
    pub const EXPTIME: &str = "EXPTIME";
    pub const EXPOSURE: &str = "EXPOSURE";
    pub const CCD_TEMP: &str = "CCD-TEMP";
    pub const IMAGETYP: &str = "IMAGETYP";
    pub const DATE_OBS: &str = "DATE-OBS";
    pub const INSTRUME: &str = "INSTRUME";
    pub const TELESCOP: &str = "TELESCOP";
    pub const FILTER: &str = "FILTER";
    pub const COMMENT: &str = "COMMENT";
    pub const HISTORY: &str = "HISTORY";

    /// Keywords the writer generates itself and never copies from a header.
    pub const STRUCTURAL: [&str; 8] = [SIMPLE, BITPIX, NAXIS, EXTEND, BSCALE, BZERO, BLANK, END];

    /// `NAXISn` keyword name.
    pub fn naxis(n: usize) -> String {
        format!("{NAXIS}{n}")
    }

    /// True for `NAXIS`, `NAXIS1`, `NAXIS2`, ...
    pub fn is_axis(keyword: &str) -> bool {
        keyword
            .strip_prefix(NAXIS)
            .is_some_and(|rest| rest.chars().all(|c| c.is_ascii_digit()))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum HeaderValue {
    Logical(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl HeaderValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(v) => Some(*v),
            Self::Float(v) if v.fract() == 0.0 => Some(*v as i64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Logical(b) => Some(*b),
            _ => None,
        }
    }
}

impl std::fmt::Display for HeaderValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Logical(b) => write!(f, "{}", if *b { "T" } else { "F" }),
            Self::Integer(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(s) => write!(f, "'{s}'"),
        }
    }
}

impl From<bool> for HeaderValue {
    fn from(v: bool) -> Self {
        Self::Logical(v)
    }
}

impl From<i64> for HeaderValue {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<i32> for HeaderValue {
    fn from(v: i32) -> Self {
        Self::Integer(v as i64)
    }
}

impl From<f64> for HeaderValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for HeaderValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for HeaderValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

/// A single header card.
#[derive(Clone, Debug, PartialEq)]
pub struct Card {
    pub keyword: String,
    /// `None` for commentary cards.
    pub value: Option<HeaderValue>,
    pub comment: Option<String>,
}

/// Ordered FITS header.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FitsHeader {
    cards: Vec<Card>,
}

impl FitsHeader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_cards(cards: Vec<Card>) -> Self {
        Self { cards }
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Value of the first card with this keyword (case-insensitive).
    pub fn get(&self, keyword: &str) -> Option<&HeaderValue> {
        let keyword = keyword.to_ascii_uppercase();
        self.cards
            .iter()
            .find(|card| card.keyword == keyword)
            .and_then(|card| card.value.as_ref())
    }

    pub fn get_int(&self, keyword: &str) -> Option<i64> {
        self.get(keyword).and_then(HeaderValue::as_i64)
    }

    pub fn get_float(&self, keyword: &str) -> Option<f64> {
        self.get(keyword).and_then(HeaderValue::as_f64)
    }

    pub fn get_text(&self, keyword: &str) -> Option<&str> {
        self.get(keyword).and_then(HeaderValue::as_str)
    }

    pub fn get_bool(&self, keyword: &str) -> Option<bool> {
        self.get(keyword).and_then(HeaderValue::as_bool)
    }

    /// Set a value card, replacing the first existing card with the same keyword.
    pub fn set(&mut self, keyword: &str, value: impl Into<HeaderValue>) {
        let keyword = keyword.to_ascii_uppercase();
        let value = Some(value.into());
        match self.cards.iter_mut().find(|card| card.keyword == keyword) {
            Some(card) => card.value = value,
            None => self.cards.push(Card {
                keyword,
                value,
                comment: None,
            }),
        }
    }

    /// Append a commentary card such as `HISTORY` or `COMMENT`.
    pub fn push_commentary(&mut self, keyword: &str, text: &str) {
        self.cards.push(Card {
            keyword: keyword.to_ascii_uppercase(),
            value: None,
            comment: Some(text.to_string()),
        });
    }

    pub fn exposure_time(&self) -> Option<f64> {
        self.get_float(keywords::EXPTIME)
            .or_else(|| self.get_float(keywords::EXPOSURE))
    }

    pub fn sensor_temperature(&self) -> Option<f64> {
        self.get_float(keywords::CCD_TEMP)
    }

    pub fn image_type(&self) -> Option<&str> {
        self.get_text(keywords::IMAGETYP)
    }

    pub fn date_obs(&self) -> Option<&str> {
        self.get_text(keywords::DATE_OBS)
    }
}

/// Parse one 80-byte card. Returns `None` for an entirely blank card.
pub(crate) fn parse_card(record: &[u8]) -> Option<Card> {
    // Non-ASCII bytes are invalid in FITS headers; replace them so that byte
    // offsets stay aligned with character offsets.
    let text: String = record
        .iter()
        .map(|&b| if b.is_ascii() { b as char } else { '?' })
        .collect();

    if text.trim().is_empty() {
        return None;
    }

    let keyword = text[..text.len().min(8)].trim_end().to_string();

    if text.len() >= 10 && &text[8..10] == "= " {
        let (value, comment) = parse_value(&text[10..]);
        Some(Card {
            keyword,
            value,
            comment,
        })
    } else {
        let rest = text.get(8..).unwrap_or("").trim();
        Some(Card {
            keyword,
            value: None,
            comment: (!rest.is_empty()).then(|| rest.to_string()),
        })
    }
}

fn parse_value(field: &str) -> (Option<HeaderValue>, Option<String>) {
    let trimmed = field.trim_start();

    if let Some(rest) = trimmed.strip_prefix('\'') {
        // Quoted string; a doubled quote is a literal quote.
        let mut text = String::new();
        let mut end = rest.len();
        let mut chars = rest.char_indices().peekable();
        while let Some((i, c)) = chars.next() {
            if c != '\'' {
                text.push(c);
            } else if matches!(chars.peek(), Some((_, '\''))) {
                text.push('\'');
                chars.next();
            } else {
                end = i + 1;
                break;
            }
        }
        let comment = rest[end..].split_once('/').and_then(|(_, c)| non_empty(c));
        return (Some(HeaderValue::Text(text.trim_end().to_string())), comment);
    }

    let (value_part, comment) = match trimmed.split_once('/') {
        Some((value, comment)) => (value.trim(), non_empty(comment)),
        None => (trimmed.trim(), None),
    };

    let value = if value_part.is_empty() {
        None
    } else if value_part == "T" {
        Some(HeaderValue::Logical(true))
    } else if value_part == "F" {
        Some(HeaderValue::Logical(false))
    } else if let Ok(v) = value_part.parse::<i64>() {
        Some(HeaderValue::Integer(v))
    } else if let Ok(v) = value_part.replace(['D', 'd'], "E").parse::<f64>() {
        Some(HeaderValue::Float(v))
    } else {
        Some(HeaderValue::Text(value_part.to_string()))
    };

    (value, comment)
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    if s.is_empty() { None } else { Some(s.to_string()) }
}

/// Format a card as a space-padded 80-byte record.
pub(crate) fn format_card(card: &Card) -> [u8; FITS_CARD_SIZE] {
    let mut line = format!("{:<8.8}", card.keyword);
    match &card.value {
        Some(value) => {
            line.push_str("= ");
            line.push_str(&format_value(value));
            if let Some(ref comment) = card.comment {
                line.push_str(" / ");
                line.push_str(comment);
            }
        }
        None => {
            if let Some(ref comment) = card.comment {
                line.push_str(comment);
            }
        }
    }

    let mut record = [b' '; FITS_CARD_SIZE];
    for (dst, byte) in record
        .iter_mut()
        .zip(line.bytes().map(|b| if b.is_ascii() { b } else { b'?' }))
    {
        *dst = byte;
    }
    record
}

/// Fixed-format value: numbers and logicals right-justified to column 30,
/// strings quoted starting at column 11.
fn format_value(value: &HeaderValue) -> String {
    match value {
        HeaderValue::Logical(b) => format!("{:>20}", if *b { "T" } else { "F" }),
        HeaderValue::Integer(v) => format!("{v:>20}"),
        HeaderValue::Float(v) => format!("{:>20}", format!("{v:E}")),
        HeaderValue::Text(s) => format!("'{:<8}'", s.replace('\'', "''")),
    }
}
