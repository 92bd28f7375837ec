// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! An in-memory FITS header, and functions to massage headers into (and back
//! out of) forms that SWarp is happy with.
//!
//! A [`FitsHeader`] is an ordered list of [`Card`]s. Apart from commentary
//! cards (`COMMENT`, `HISTORY` and blank keywords), keywords are unique;
//! setting a keyword that already exists replaces its value in place, so the
//! order of cards read from a file is preserved when it is written back out.

mod error;
pub mod translate;

pub use error::HeaderError;
pub use translate::{
    add_spectral_axis_keys, cd_to_cdelt, change_header, crota_to_pc, remove_additional_axes,
    restore_header_keys, update_header, HeaderFormat, SpatialAxis,
};

use std::fmt::Display;

/// The value of a FITS header card.
#[derive(Debug, Clone, PartialEq)]
pub enum HeaderValue {
    Logical(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl HeaderValue {
    /// Parse the value part of a header card, as reported by cfitsio. String
    /// values are still enclosed in single quotes. An empty value (e.g. for
    /// commentary cards) yields `None`.
    pub(crate) fn parse_fits(raw: &str) -> Option<HeaderValue> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }

        if let Some(quoted) = raw.strip_prefix('\'') {
            let inner = quoted.strip_suffix('\'').unwrap_or(quoted);
            // FITS strings escape single quotes by doubling them, and trailing
            // spaces are not significant.
            return Some(HeaderValue::String(
                inner.replace("''", "'").trim_end().to_string(),
            ));
        }

        match raw {
            "T" => return Some(HeaderValue::Logical(true)),
            "F" => return Some(HeaderValue::Logical(false)),
            _ => (),
        }

        if let Ok(i) = raw.parse::<i64>() {
            return Some(HeaderValue::Integer(i));
        }

        // Fortran-style exponents are allowed in FITS.
        if let Ok(f) = raw.replace(['D', 'd'], "E").parse::<f64>() {
            return Some(HeaderValue::Float(f));
        }

        // Complex values and other oddities are kept verbatim.
        Some(HeaderValue::String(raw.to_string()))
    }

    /// A short name for the type of this value, for error messages.
    pub(crate) fn type_name(&self) -> &'static str {
        match self {
            HeaderValue::Logical(_) => "logical",
            HeaderValue::Integer(_) => "integer",
            HeaderValue::Float(_) => "float",
            HeaderValue::String(_) => "string",
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            HeaderValue::Integer(i) => Some(*i as f64),
            HeaderValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            HeaderValue::Integer(i) => Some(*i),
            HeaderValue::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            HeaderValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl Display for HeaderValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HeaderValue::Logical(true) => write!(f, "T"),
            HeaderValue::Logical(false) => write!(f, "F"),
            HeaderValue::Integer(i) => write!(f, "{i}"),
            HeaderValue::Float(v) => write!(f, "{v:E}"),
            HeaderValue::String(s) => write!(f, "'{s}'"),
        }
    }
}

impl From<bool> for HeaderValue {
    fn from(v: bool) -> Self {
        HeaderValue::Logical(v)
    }
}

impl From<i64> for HeaderValue {
    fn from(v: i64) -> Self {
        HeaderValue::Integer(v)
    }
}

impl From<i32> for HeaderValue {
    fn from(v: i32) -> Self {
        HeaderValue::Integer(v.into())
    }
}

impl From<usize> for HeaderValue {
    fn from(v: usize) -> Self {
        HeaderValue::Integer(v as i64)
    }
}

impl From<f64> for HeaderValue {
    fn from(v: f64) -> Self {
        HeaderValue::Float(v)
    }
}

impl From<&str> for HeaderValue {
    fn from(v: &str) -> Self {
        HeaderValue::String(v.to_string())
    }
}

impl From<String> for HeaderValue {
    fn from(v: String) -> Self {
        HeaderValue::String(v)
    }
}

/// A single header card.
#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    pub keyword: String,
    pub value: Option<HeaderValue>,
    pub comment: Option<String>,
}

impl Card {
    pub fn new<K: AsRef<str>>(keyword: K, value: Option<HeaderValue>, comment: Option<String>) -> Card {
        Card {
            keyword: normalise_keyword(keyword.as_ref()),
            value,
            comment,
        }
    }

    pub fn is_commentary(&self) -> bool {
        is_commentary_keyword(&self.keyword)
    }
}

/// Commentary keywords may appear many times in a header and never carry a
/// value.
pub(crate) fn is_commentary_keyword(keyword: &str) -> bool {
    matches!(keyword, "COMMENT" | "HISTORY" | "")
}

fn normalise_keyword(keyword: &str) -> String {
    keyword.trim().to_ascii_uppercase()
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FitsHeader {
    cards: Vec<Card>,
}

impl FitsHeader {
    pub fn new() -> FitsHeader {
        FitsHeader::default()
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

    /// The keywords of all non-commentary cards, in order.
    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        self.cards
            .iter()
            .filter(|c| !c.is_commentary())
            .map(|c| c.keyword.as_str())
    }

    pub fn contains(&self, keyword: &str) -> bool {
        self.card(keyword).is_some()
    }

    pub fn card(&self, keyword: &str) -> Option<&Card> {
        let keyword = normalise_keyword(keyword);
        self.cards.iter().find(|c| c.keyword == keyword)
    }

    pub fn get(&self, keyword: &str) -> Option<&HeaderValue> {
        self.card(keyword).and_then(|c| c.value.as_ref())
    }

    /// Get a numeric value. Integers are happily converted to floats.
    pub fn get_f64(&self, keyword: &str) -> Result<Option<f64>, HeaderError> {
        match self.get(keyword) {
            None => Ok(None),
            Some(v) => v.as_f64().map(Some).ok_or_else(|| HeaderError::WrongType {
                key: normalise_keyword(keyword),
                found: v.type_name(),
                expected: "number",
            }),
        }
    }

    pub fn get_i64(&self, keyword: &str) -> Result<Option<i64>, HeaderError> {
        match self.get(keyword) {
            None => Ok(None),
            Some(v) => v.as_i64().map(Some).ok_or_else(|| HeaderError::WrongType {
                key: normalise_keyword(keyword),
                found: v.type_name(),
                expected: "integer",
            }),
        }
    }

    pub fn required_f64(&self, keyword: &str) -> Result<f64, HeaderError> {
        self.get_f64(keyword)?
            .ok_or_else(|| HeaderError::MissingKey {
                key: normalise_keyword(keyword),
            })
    }

    pub fn required_i64(&self, keyword: &str) -> Result<i64, HeaderError> {
        self.get_i64(keyword)?
            .ok_or_else(|| HeaderError::MissingKey {
                key: normalise_keyword(keyword),
            })
    }

    /// Get the card for a keyword, or complain that it's missing.
    pub fn required_card(&self, keyword: &str) -> Result<&Card, HeaderError> {
        self.card(keyword).ok_or_else(|| HeaderError::MissingKey {
            key: normalise_keyword(keyword),
        })
    }

    /// Set a keyword's value. If the keyword already exists, its position and
    /// comment are kept.
    pub fn set<V: Into<HeaderValue>>(&mut self, keyword: &str, value: V) {
        let keyword = normalise_keyword(keyword);
        match self.cards.iter_mut().find(|c| c.keyword == keyword) {
            Some(card) => card.value = Some(value.into()),
            None => self.cards.push(Card {
                keyword,
                value: Some(value.into()),
                comment: None,
            }),
        }
    }

    pub fn set_with_comment<V: Into<HeaderValue>>(&mut self, keyword: &str, value: V, comment: &str) {
        self.set_card(Card::new(
            keyword,
            Some(value.into()),
            Some(comment.to_string()),
        ));
    }

    /// Insert a whole card. Commentary cards are always appended; other cards
    /// replace an existing card with the same keyword.
    pub fn set_card(&mut self, card: Card) {
        if card.is_commentary() {
            self.cards.push(card);
            return;
        }
        match self.cards.iter_mut().find(|c| c.keyword == card.keyword) {
            Some(existing) => *existing = card,
            None => self.cards.push(card),
        }
    }

    /// Remove every card with this keyword. Returns the first removed card.
    pub fn remove(&mut self, keyword: &str) -> Option<Card> {
        let keyword = normalise_keyword(keyword);
        let mut removed = None;
        let mut kept = Vec::with_capacity(self.cards.len());
        for card in self.cards.drain(..) {
            if card.keyword == keyword {
                if removed.is_none() {
                    removed = Some(card);
                }
            } else {
                kept.push(card);
            }
        }
        self.cards = kept;
        removed
    }

    /// Keep only the cards for which the predicate is true.
    pub fn retain<F: FnMut(&Card) -> bool>(&mut self, f: F) {
        self.cards.retain(f);
    }

    pub fn add_comment(&mut self, text: &str) {
        self.cards.push(Card {
            keyword: "COMMENT".to_string(),
            value: None,
            comment: Some(text.to_string()),
        });
    }

    pub fn add_history(&mut self, text: &str) {
        self.cards.push(Card {
            keyword: "HISTORY".to_string(),
            value: None,
            comment: Some(text.to_string()),
        });
    }

    /// The text of all `COMMENT` cards.
    pub fn comments(&self) -> impl Iterator<Item = &str> {
        self.cards
            .iter()
            .filter(|c| c.keyword == "COMMENT")
            .filter_map(|c| c.comment.as_deref())
    }

    /// The number of axes.
    pub fn naxis(&self) -> Result<usize, HeaderError> {
        let naxis = self.required_i64("NAXIS")?;
        usize::try_from(naxis).map_err(|_| HeaderError::BadAxisLength {
            key: "NAXIS".to_string(),
            value: naxis,
        })
    }

    /// The length of FITS axis `axis` (1-indexed).
    pub fn axis_len(&self, axis: usize) -> Result<usize, HeaderError> {
        let key = format!("NAXIS{axis}");
        let len = self.required_i64(&key)?;
        usize::try_from(len).map_err(|_| HeaderError::BadAxisLength { key, value: len })
    }

    /// The array shape described by this header, in row-major order (i.e.
    /// `[NAXISn, ..., NAXIS2, NAXIS1]`), which is how `ndarray` and `fitsio`
    /// lay out the data.
    pub fn shape(&self) -> Result<Vec<usize>, HeaderError> {
        let naxis = self.naxis()?;
        (1..=naxis).rev().map(|axis| self.axis_len(axis)).collect()
    }
}

impl<'a> IntoIterator for &'a FitsHeader {
    type Item = &'a Card;
    type IntoIter = std::slice::Iter<'a, Card>;

    fn into_iter(self) -> Self::IntoIter {
        self.cards.iter()
    }
}

impl FromIterator<Card> for FitsHeader {
    fn from_iter<I: IntoIterator<Item = Card>>(iter: I) -> Self {
        let mut header = FitsHeader::new();
        for card in iter {
            header.set_card(card);
        }
        header
    }
}
