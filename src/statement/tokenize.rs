//! Splits extracted statement text into logical lines.

/// Which characters end a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Separators {
    /// `\n`, `\r` and `\t`. Used for current-account statements where columns are tab separated.
    LinesAndTabs,
    /// `\n` and `\r` only. Used for credit card invoices.
    LinesOnly,
}

impl Separators {
    fn is_separator(self, c: char) -> bool {
        match self {
            Separators::LinesAndTabs => matches!(c, '\n' | '\r' | '\t'),
            Separators::LinesOnly => matches!(c, '\n' | '\r'),
        }
    }
}

/// Split `text` into trimmed, non-empty tokens, preserving order and inner whitespace.
pub fn tokenize(text: &str, separators: Separators) -> Vec<&str> {
    text.split(|c| separators.is_separator(c))
        .map(str::trim_ascii)
        .filter(|token| !token.is_empty())
        .collect()
}
