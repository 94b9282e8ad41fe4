use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::ValidationError;

const MAX_SYMBOL_LEN: usize = 10;

/// Normalized equity ticker as it appears in the short-volume file.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol(String);

impl Symbol {
    /// Trims and uppercases `input`, then checks it against the character set
    /// used by the short-volume file. Class shares appear both as BRK.B and
    /// BRK-B depending on the venue, so both separators are accepted.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let ticker = input.trim().to_ascii_uppercase();
        let len = ticker.chars().count();
        match len {
            0 => return Err(ValidationError::EmptySymbol),
            n if n > MAX_SYMBOL_LEN => {
                return Err(ValidationError::SymbolTooLong {
                    len,
                    max: MAX_SYMBOL_LEN,
                })
            }
            _ => {}
        }

        for (index, ch) in ticker.chars().enumerate() {
            if index == 0 && !ch.is_ascii_alphabetic() {
                return Err(ValidationError::SymbolInvalidStart { ch });
            }
            if !(ch.is_ascii_alphanumeric() || matches!(ch, '.' | '-')) {
                return Err(ValidationError::SymbolInvalidChar { ch, index });
            }
        }

        Ok(Self(ticker))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Symbol {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for Symbol {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl TryFrom<&str> for Symbol {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Symbol> for String {
    fn from(value: Symbol) -> Self {
        value.0
    }
}
