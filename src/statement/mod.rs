//! Turns bank statement PDFs into transactions.
//!
//! Each supported statement layout has its own [Extractor]. Extraction is split in two steps:
//! [Extractor::extract_text] pulls the plain text out of a PDF and
//! [Extractor::extract_transactions] parses that text. Parsing is a pure function of the text and
//! the target account, rows that cannot be decoded are skipped.

mod caixa_cc_fatura;
mod caixa_extrato;
mod nubank_cc_fatura;
mod nubank_extrato;
mod parse;
mod pdf;
mod tokenize;

use std::{fmt::Display, path::Path, str::FromStr};

use serde::Serialize;

use crate::{Error, account::AccountId, transaction::NewTransaction};

/// The errors that stop a statement from being extracted.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ExtractError {
    /// A section marker that every statement of this layout has was not found.
    #[error("could not find the required marker \"{0}\"")]
    MissingMarker(String),

    /// The invoice header with the statement year was not found.
    #[error("could not find the invoice year")]
    MissingYear,

    /// The PDF could not be decoded.
    #[error("could not extract text from the PDF: {0}")]
    Pdf(String),

    /// The PDF could not be read.
    #[error("{0}")]
    Io(String),
}

impl From<ExtractError> for Error {
    fn from(error: ExtractError) -> Self {
        match error {
            ExtractError::MissingMarker(marker) => Error::MissingMarker(marker),
            ExtractError::MissingYear => Error::MissingYear,
            ExtractError::Pdf(message) | ExtractError::Io(message) => Error::Io(message),
        }
    }
}

/// A statement layout that transactions can be extracted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Extractor {
    /// Caixa current-account statement.
    CaixaExtrato,
    /// Caixa credit card invoice.
    CaixaCcFatura,
    /// Nubank current-account statement.
    NubankExtrato,
    /// Nubank credit card invoice.
    NubankCcFatura,
}

/// The key and label of an extractor, for populating a picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractorListing {
    /// The key accepted by [Extractor::get].
    pub key: &'static str,
    /// A human readable label.
    pub name: &'static str,
}

impl Extractor {
    /// Every supported layout.
    pub const ALL: [Extractor; 4] = [
        Extractor::CaixaExtrato,
        Extractor::CaixaCcFatura,
        Extractor::NubankExtrato,
        Extractor::NubankCcFatura,
    ];

    /// The symbolic name used to select this extractor.
    pub fn key(self) -> &'static str {
        match self {
            Extractor::CaixaExtrato => "caixa_extrato",
            Extractor::CaixaCcFatura => "caixa_cc_fatura",
            Extractor::NubankExtrato => "nubank_extrato",
            Extractor::NubankCcFatura => "nubank_cc_fatura",
        }
    }

    /// A human readable label.
    pub fn name(self) -> &'static str {
        match self {
            Extractor::CaixaExtrato => "Caixa - Extrato",
            Extractor::CaixaCcFatura => "Caixa - Fatura do Cartão de Crédito",
            Extractor::NubankExtrato => "Nubank - Extrato",
            Extractor::NubankCcFatura => "Nubank - Fatura do Cartão de Crédito",
        }
    }

    /// Look up an extractor by its key.
    pub fn get(key: &str) -> Option<Extractor> {
        Self::ALL.into_iter().find(|extractor| extractor.key() == key)
    }

    /// The extractors offered to users.
    pub fn list() -> Vec<ExtractorListing> {
        Self::ALL
            .into_iter()
            .map(|extractor| ExtractorListing {
                key: extractor.key(),
                name: extractor.name(),
            })
            .collect()
    }

    /// Extract the plain text of the PDF at `path`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or any page fails to extract.
    pub fn extract_text(self, path: &Path) -> Result<String, ExtractError> {
        pdf::extract_text(path)
    }

    /// Extract the plain text of a PDF held in memory, e.g. an upload.
    ///
    /// # Errors
    /// Returns an error if any page fails to extract.
    pub fn extract_text_from_bytes(self, bytes: &[u8]) -> Result<String, ExtractError> {
        pdf::extract_text_from_bytes(bytes)
    }

    /// Parse the transactions in `text`, assigning them to `account_id`.
    ///
    /// # Errors
    /// Returns an error if the text lacks a marker this layout requires. Rows that cannot be
    /// parsed are skipped instead.
    pub fn extract_transactions(
        self,
        text: &str,
        account_id: AccountId,
    ) -> Result<Vec<NewTransaction>, ExtractError> {
        let transactions = match self {
            Extractor::CaixaExtrato => caixa_extrato::extract_transactions(text, account_id),
            Extractor::CaixaCcFatura => caixa_cc_fatura::extract_transactions(text, account_id)?,
            Extractor::NubankExtrato => nubank_extrato::extract_transactions(text, account_id),
            Extractor::NubankCcFatura => nubank_cc_fatura::extract_transactions(text, account_id)?,
        };

        tracing::debug!(
            "{} extracted {} transactions",
            self.key(),
            transactions.len()
        );

        Ok(transactions)
    }
}

impl Display for Extractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Extractor {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Extractor::get(s).ok_or_else(|| Error::UnknownExtractor(s.to_owned()))
    }
}
