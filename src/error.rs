use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML error: {0}")]
    Xml(#[from] roxmltree::Error),

    /// The upload is not a usable DOCX package.
    #[error("invalid DOCX: {0}")]
    InvalidDocx(String),

    /// A part the page initializer depends on could not be obtained.
    #[error("cannot prepare document: {0}")]
    Precondition(String),

    /// Input refused before any formatting ran.
    #[error("{0}")]
    Rejected(String),
}
