//! Price extraction from product pages.
//!
//! A page is matched against an ordered list of CSS selectors; the first one
//! yielding non-empty text is read as `<symbol?><digits with separators>`.

use std::str::FromStr;

use regex::Regex;
use rust_decimal::Decimal;
use scraper::{Html, Selector};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("no price found on page")]
    NoPriceFound,
    #[error("no numeric price in {text:?}")]
    NoNumber { text: String },
    #[error("unparseable price literal {literal:?}")]
    InvalidNumber { literal: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedPrice {
    pub amount: Decimal,
    /// First character that is not a digit, separator or whitespace.
    pub symbol: Option<char>,
}

impl ParsedPrice {
    /// ISO code for the symbol, if it is one we recognize.
    pub fn currency(&self) -> Option<&'static str> {
        self.symbol.and_then(currency_for_symbol)
    }
}

/// Result of running the price selectors over a page.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceMatch {
    pub selector: String,
    pub text: String,
    pub price: ParsedPrice,
}

pub fn currency_for_symbol(symbol: char) -> Option<&'static str> {
    match symbol {
        '$' => Some("USD"),
        '£' => Some("GBP"),
        '€' => Some("EUR"),
        '¥' => Some("JPY"),
        _ => None,
    }
}

/// Reads `<symbol?><digits with separators>` out of a price node's text.
#[derive(Debug, Clone)]
pub struct PriceParser {
    symbol: Regex,
    number: Regex,
}

impl PriceParser {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            symbol: Regex::new(r"[^0-9.,\s]")?,
            number: Regex::new(r"[0-9][0-9,.]*[0-9]")?,
        })
    }

    /// Reads `"$1,234.56 list price"` as `1234.56` with symbol `$`.
    ///
    /// Grouping commas are dropped before the decimal parse.
    pub fn parse(&self, text: &str) -> Result<ParsedPrice, ParseError> {
        let symbol = self
            .symbol
            .find(text)
            .and_then(|m| m.as_str().chars().next());

        let literal = self
            .number
            .find(text)
            .ok_or_else(|| ParseError::NoNumber { text: text.to_string() })?
            .as_str();

        let normalized = literal.replace(',', "");
        let amount = Decimal::from_str(&normalized).map_err(|_| ParseError::InvalidNumber {
            literal: literal.to_string(),
        })?;

        Ok(ParsedPrice { amount, symbol })
    }

    /// Runs `selectors` in order; the first with non-empty text decides the price.
    /// A later selector is never consulted once an earlier one has matched, even
    /// if the matched text turns out not to be a number.
    pub fn extract(
        &self,
        document: &Html,
        selectors: &[(String, Selector)],
    ) -> Result<PriceMatch, ParseError> {
        for (raw, selector) in selectors {
            if let Some(text) = select_text(document, selector) {
                let price = self.parse(&text)?;
                return Ok(PriceMatch {
                    selector: raw.clone(),
                    text,
                    price,
                });
            }
        }
        Err(ParseError::NoPriceFound)
    }
}

/// Text of the first element matching `selector`, trimmed; `None` when absent or blank.
pub fn select_text(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|text| !text.is_empty())
}

/// Attribute of the first element matching `selector`; `None` when absent or blank.
pub fn select_attr(document: &Html, selector: &Selector, attr: &str) -> Option<String> {
    document
        .select(selector)
        .next()
        .and_then(|el| el.value().attr(attr))
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
