//! Tokenising and field parsing for the line-oriented configuration grammar

use std::collections::HashMap;
use std::str::FromStr;

use crate::errors::{ConfigError, ConfigResult};

/// Split a line into whitespace-separated tokens, dropping `#` comments
pub fn tokenize(line: &str) -> Vec<&str> {
    let content = match line.find('#') {
        Some(at) => &line[..at],
        None => line,
    };
    content.split_whitespace().collect()
}

/// Parse a numeric field
pub fn number<T: FromStr>(field: &'static str, token: &str) -> ConfigResult<T> {
    token.parse().map_err(|_| ConfigError::InvalidNumber {
        line: 0,
        field,
        value: token.to_string(),
    })
}

/// Parse a finite floating point field
pub fn finite(field: &'static str, token: &str) -> ConfigResult<f64> {
    let value: f64 = number(field, token)?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ConfigError::InvalidNumber {
            line: 0,
            field,
            value: token.to_string(),
        })
    }
}

/// Symbolic discrete values declared with `DEFINE`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Symbols {
    values: HashMap<String, i32>,
}

impl Symbols {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare `symbol`; redefinition is an error
    pub fn define(&mut self, symbol: &str, value: i32) -> ConfigResult<()> {
        if self.values.contains_key(symbol) {
            return Err(ConfigError::Duplicate {
                line: 0,
                kind: "symbol",
                name: symbol.to_string(),
            });
        }
        if symbol.parse::<i32>().is_ok() {
            return Err(ConfigError::invalid(
                "DEFINE",
                format!("'{}' is a number, not a symbol", symbol),
            ));
        }
        self.values.insert(symbol.to_string(), value);
        Ok(())
    }

    pub fn get(&self, symbol: &str) -> Option<i32> {
        self.values.get(symbol).copied()
    }

    /// Resolve a discrete value written as an integer or a defined symbol
    pub fn resolve(&self, token: &str) -> ConfigResult<i32> {
        if let Ok(value) = token.parse::<i32>() {
            return Ok(value);
        }
        self.get(token).ok_or_else(|| ConfigError::UnknownTestValue {
            line: 0,
            value: token.to_string(),
        })
    }

    /// Resolve every token
    pub fn resolve_all<'a, I>(&self, tokens: I) -> ConfigResult<Vec<i32>>
    where
        I: IntoIterator<Item = &'a str>,
    {
        tokens.into_iter().map(|t| self.resolve(t)).collect()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Sequential reader over one directive's tokens
pub struct Cursor<'a> {
    construct: &'static str,
    tokens: &'a [&'a str],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(construct: &'static str, tokens: &'a [&'a str]) -> Self {
        Self {
            construct,
            tokens,
            pos: 0,
        }
    }

    fn syntax(&self, message: String) -> ConfigError {
        ConfigError::Syntax {
            line: 0,
            construct: self.construct,
            message,
        }
    }

    /// Next token, or a syntax error naming what was expected
    pub fn next(&mut self, what: &str) -> ConfigResult<&'a str> {
        let token = self
            .tokens
            .get(self.pos)
            .copied()
            .ok_or_else(|| self.syntax(format!("missing {}", what)))?;
        self.pos += 1;
        Ok(token)
    }

    /// Next token, without consuming it
    pub fn peek(&self) -> Option<&'a str> {
        self.tokens.get(self.pos).copied()
    }

    /// Consume `keyword` (case-insensitive) or fail
    pub fn expect(&mut self, keyword: &str) -> ConfigResult<()> {
        let token = self.next(keyword)?;
        if token.eq_ignore_ascii_case(keyword) {
            Ok(())
        } else {
            Err(self.syntax(format!("expected {}, found '{}'", keyword, token)))
        }
    }

    /// Consume one of `keywords`, returning the upper-cased match
    pub fn expect_one_of(&mut self, keywords: &[&str]) -> ConfigResult<String> {
        let token = self.next(&keywords.join("|"))?;
        let upper = token.to_ascii_uppercase();
        if keywords.contains(&upper.as_str()) {
            Ok(upper)
        } else {
            Err(self.syntax(format!(
                "expected {}, found '{}'",
                keywords.join("|"),
                token
            )))
        }
    }

    /// Consume `keyword` if it is next
    pub fn accept(&mut self, keyword: &str) -> bool {
        match self.peek() {
            Some(token) if token.eq_ignore_ascii_case(keyword) => {
                self.pos += 1;
                true
            }
            _ => false,
        }
    }

    /// Next token parsed as a number
    pub fn number<T: FromStr>(&mut self, field: &'static str) -> ConfigResult<T> {
        let token = self.next(field)?;
        number(field, token)
    }

    /// Next token parsed as a finite float
    pub fn finite(&mut self, field: &'static str) -> ConfigResult<f64> {
        let token = self.next(field)?;
        finite(field, token)
    }

    /// All remaining tokens
    pub fn rest(&mut self) -> &'a [&'a str] {
        let rest = &self.tokens[self.pos.min(self.tokens.len())..];
        self.pos = self.tokens.len();
        rest
    }

    /// Fail if tokens remain
    pub fn finish(&self) -> ConfigResult<()> {
        match self.peek() {
            None => Ok(()),
            Some(extra) => Err(self.syntax(format!("unexpected '{}'", extra))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comments_and_blank_lines() {
        assert!(tokenize("   ").is_empty());
        assert!(tokenize("# whole line").is_empty());
        assert_eq!(
            tokenize("MONITOR weather 10000  # ten seconds"),
            vec!["MONITOR", "weather", "10000"]
        );
    }

    #[test]
    fn symbols_resolve_numbers_and_definitions() {
        let mut symbols = Symbols::new();
        symbols.define("CLEAR", 2).unwrap();
        assert_eq!(symbols.resolve("CLEAR").unwrap(), 2);
        assert_eq!(symbols.resolve("-3").unwrap(), -3);
        assert!(matches!(
            symbols.resolve("CLOUDY"),
            Err(ConfigError::UnknownTestValue { .. })
        ));
        assert!(symbols.define("CLEAR", 3).is_err());
        assert!(symbols.define("7", 3).is_err());
    }

    #[test]
    fn cursor_reports_missing_and_unexpected_tokens() {
        let tokens = ["wind", "READS"];
        let mut cursor = Cursor::new("FILTER", &tokens);
        assert_eq!(cursor.next("name").unwrap(), "wind");
        cursor.expect("reads").unwrap();
        let err = cursor.next("sensor").unwrap_err();
        assert_eq!(err.to_string(), "line 0: malformed FILTER: missing sensor");

        let tokens = ["a", "b"];
        let mut cursor = Cursor::new("MONITOR", &tokens);
        cursor.next("name").unwrap();
        assert!(cursor.finish().is_err());
    }

    #[test]
    fn non_finite_rejected() {
        assert!(finite("threshold", "NaN").is_err());
        assert!(finite("threshold", "inf").is_err());
        assert_eq!(finite("threshold", "2.5").unwrap(), 2.5);
    }
}
