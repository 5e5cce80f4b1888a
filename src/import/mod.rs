//! Importing bank statements into an account.

mod core;
mod endpoints;

pub use core::{
    StatementUpload, extract_upload, import_transactions, prepare_import, read_upload,
};
pub use endpoints::{import_endpoint, list_extractors_endpoint, preview_import_endpoint};
