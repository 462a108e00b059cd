mod docx;
mod error;
mod fonts;
mod layout;
mod model;
mod pipeline;
#[cfg(feature = "server")]
pub mod server;

pub use error::Error;
pub use pipeline::{FormatReport, HeadingLevel, HeadingScheme, Role};

use std::path::Path;
use std::time::Instant;

use docx::Package;

/// Header title used when the caller supplies none.
pub const DEFAULT_TITLE: &str = "小論文";

/// Prefix added to the file name of a formatted manuscript.
pub const OUTPUT_PREFIX: &str = "已排版_";

/// Per-document settings.
#[derive(Clone, Debug)]
pub struct FormatOptions {
    /// Text placed in the page header.
    pub title: String,
    pub scheme: HeadingScheme,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            scheme: HeadingScheme::default(),
        }
    }
}

/// A formatted manuscript ready to be written out.
#[derive(Debug)]
pub struct Formatted {
    pub bytes: Vec<u8>,
    pub report: FormatReport,
}

/// `已排版_<name>` for an uploaded or input file name.
pub fn processed_file_name(original: &str) -> String {
    format!("{OUTPUT_PREFIX}{original}")
}

pub fn format_docx(input: &Path, output: &Path, options: &FormatOptions) -> Result<FormatReport, Error> {
    let t0 = Instant::now();

    let mut pkg = Package::open(input)?;
    let t_load = t0.elapsed();

    let report = format_package(&mut pkg, options)?;
    let t_format = t0.elapsed();

    let bytes = pkg.to_bytes()?;
    std::fs::write(output, &bytes).map_err(Error::Io)?;
    let t_total = t0.elapsed();

    log::info!(
        "Timing: load={:.1}ms, format={:.1}ms, write={:.1}ms, total={:.1}ms (output {} bytes)",
        t_load.as_secs_f64() * 1000.0,
        (t_format - t_load).as_secs_f64() * 1000.0,
        (t_total - t_format).as_secs_f64() * 1000.0,
        t_total.as_secs_f64() * 1000.0,
        bytes.len(),
    );

    Ok(report)
}

pub fn format_docx_bytes(input: &[u8], options: &FormatOptions) -> Result<Formatted, Error> {
    let t0 = Instant::now();

    let mut pkg = Package::from_bytes(input)?;
    let t_load = t0.elapsed();

    let report = format_package(&mut pkg, options)?;
    let t_format = t0.elapsed();

    let bytes = pkg.to_bytes()?;
    let t_total = t0.elapsed();

    log::info!(
        "Timing: load={:.1}ms, format={:.1}ms, save={:.1}ms, total={:.1}ms (output {} bytes)",
        t_load.as_secs_f64() * 1000.0,
        (t_format - t_load).as_secs_f64() * 1000.0,
        (t_total - t_format).as_secs_f64() * 1000.0,
        t_total.as_secs_f64() * 1000.0,
        bytes.len(),
    );

    Ok(Formatted { bytes, report })
}

fn format_package(pkg: &mut Package, options: &FormatOptions) -> Result<FormatReport, Error> {
    layout::prepare_page(pkg, &options.title)?;

    let body = pkg
        .body_mut()
        .ok_or_else(|| Error::InvalidDocx("missing w:body".into()))?;
    let report = pipeline::format_body(body, options.scheme);

    log::info!(
        "Formatted {} paragraphs: {} canonical headings, {} rewritten, {} figures, {} tables, {} bibliography entries{}",
        report.paragraphs,
        report.canonical_headings,
        report.rewritten,
        report.figures,
        report.tables,
        report.bibliography_entries,
        if report.bibliography_found { "" } else { " (no bibliography heading)" },
    );
    Ok(report)
}
