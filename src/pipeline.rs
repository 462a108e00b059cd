//! Paragraph classification and rewrite pass.
//!
//! Walks the body paragraphs once, in document order, carrying a small
//! [`PassState`]. Each non-blank paragraph goes through an ordered chain of
//! rules; a rule either consumes the paragraph (and formats it) or lets the
//! next rule look at it. The final rule always consumes.

mod rules;

pub use rules::{HeadingLevel, HeadingScheme};

use crate::docx::Element;
use crate::fonts::{self, BODY_SIZE};
use crate::model::{Alignment, Paragraph, Run};
use rules::{CaptionKind, Rules};

/// Width of two 12 pt characters: body first-line indent and bibliography hang.
pub(crate) const INDENT_PT: f32 = 24.0;

/// What a paragraph was formatted as.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    FigureCaption(u32),
    TableCaption(u32),
    BibliographyHeading,
    BibliographyEntry,
    /// Body text, possibly a numbered heading.
    Body(Option<HeadingLevel>),
}

/// Summary of one pass over a manuscript.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FormatReport {
    pub paragraphs: usize,
    pub blank: usize,
    /// Paragraphs recognized as one of the canonical section headings.
    pub canonical_headings: usize,
    /// Paragraphs whose text was replaced (heading or caption rewrite).
    pub rewritten: usize,
    pub figures: u32,
    pub tables: u32,
    pub bibliography_found: bool,
    pub bibliography_entries: usize,
    pub body: usize,
}

impl FormatReport {
    fn record(&mut self, role: Role) {
        match role {
            Role::FigureCaption(n) => self.figures = n,
            Role::TableCaption(n) => self.tables = n,
            Role::BibliographyHeading => self.bibliography_found = true,
            Role::BibliographyEntry => self.bibliography_entries += 1,
            Role::Body(_) => self.body += 1,
        }
    }
}

/// State carried from one paragraph to the next within a single pass.
#[derive(Debug, Default)]
struct PassState {
    /// Latched by the bibliography heading; never cleared.
    in_bibliography: bool,
    figures: u32,
    tables: u32,
}

enum Outcome {
    Consumed(Role),
    Fallthrough,
}

struct Ctx<'a> {
    para: Paragraph<'a>,
    /// Trimmed text; replaced when a heading is rewritten.
    text: String,
    state: &'a mut PassState,
    rules: &'a Rules,
    canonical: bool,
    rewritten: bool,
}

type Rule = fn(&mut Ctx<'_>) -> Outcome;

/// Evaluated top to bottom for every non-blank paragraph.
const CHAIN: &[Rule] = &[
    canonical_heading,
    figure_caption,
    table_caption,
    bibliography_heading,
    bibliography_entry,
    body_text,
];

/// Formats every top-level paragraph of `body` in place.
pub(crate) fn format_body(body: &mut Element, scheme: HeadingScheme) -> FormatReport {
    let rules = Rules::new(scheme);
    let mut state = PassState::default();
    let mut report = FormatReport::default();

    for el in body.elements_mut().filter(|e| e.is_wml("p")) {
        report.paragraphs += 1;
        let para = Paragraph::new(el);
        let text = para.text().trim().to_string();
        if text.is_empty() {
            report.blank += 1;
            continue;
        }

        let mut ctx = Ctx {
            para,
            text,
            state: &mut state,
            rules: &rules,
            canonical: false,
            rewritten: false,
        };
        let role = classify(&mut ctx);
        log::debug!("paragraph {}: {:?} {:?}", report.paragraphs, role, ctx.text);

        report.canonical_headings += usize::from(ctx.canonical);
        report.rewritten += usize::from(ctx.rewritten);
        report.record(role);
    }

    report
}

fn classify(ctx: &mut Ctx<'_>) -> Role {
    for rule in CHAIN {
        if let Outcome::Consumed(role) = rule(ctx) {
            return role;
        }
    }
    unreachable!("body_text consumes every paragraph")
}

/// Replaces the paragraph content with a single plain 12 pt run.
fn rewrite(ctx: &mut Ctx<'_>, text: String) {
    ctx.para.clear();
    let mut run = ctx.para.add_run(&text);
    let mut props = run.properties();
    fonts::apply_font_pair(&mut props, BODY_SIZE);
    props.set_bold(Some(false));
    ctx.text = text;
    ctx.rewritten = true;
}

fn normalize_runs(runs: Vec<Run<'_>>, keep_italic: bool) {
    for mut run in runs {
        let italic = run.italic();
        let mut props = run.properties();
        fonts::apply_font_pair(&mut props, BODY_SIZE);
        props.set_bold(Some(false));
        if keep_italic {
            props.set_italic(italic);
        } else {
            props.set_italic(Some(false));
            props.set_underline(Some(false));
        }
    }
}

/// Step 1: canonical section titles. Never consumes, so it also runs under
/// the bibliography latch.
fn canonical_heading(ctx: &mut Ctx<'_>) -> Outcome {
    let Some(heading) = ctx.rules.canonical_heading(&ctx.text) else {
        return Outcome::Fallthrough;
    };
    ctx.canonical = true;
    if rules::normalize(&ctx.text) != rules::normalize(heading.title) {
        rewrite(ctx, heading.title.to_string());
    }
    let mut props = ctx.para.properties();
    props.set_first_line_indent(0.0);
    if heading.introduction {
        props.set_page_break_before(false);
    }
    Outcome::Fallthrough
}

/// Steps 2 and 3: renumber with the pass's own counter, whatever the author wrote.
fn caption(ctx: &mut Ctx<'_>, kind: CaptionKind) -> Outcome {
    if ctx.state.in_bibliography {
        return Outcome::Fallthrough;
    }
    let Some(caption) = ctx.rules.caption(kind, &ctx.text) else {
        return Outcome::Fallthrough;
    };
    let counter = match kind {
        CaptionKind::Figure => &mut ctx.state.figures,
        CaptionKind::Table => &mut ctx.state.tables,
    };
    *counter += 1;
    let number = *counter;

    let rebuilt = caption.rebuild(number);
    if rebuilt != ctx.text {
        rewrite(ctx, rebuilt);
    }
    let mut props = ctx.para.properties();
    props.set_alignment(Alignment::Left);
    props.set_first_line_indent(0.0);

    Outcome::Consumed(match kind {
        CaptionKind::Figure => Role::FigureCaption(number),
        CaptionKind::Table => Role::TableCaption(number),
    })
}

fn figure_caption(ctx: &mut Ctx<'_>) -> Outcome {
    caption(ctx, CaptionKind::Figure)
}

fn table_caption(ctx: &mut Ctx<'_>) -> Outcome {
    caption(ctx, CaptionKind::Table)
}

/// Step 4: the bibliography heading sets the latch.
fn bibliography_heading(ctx: &mut Ctx<'_>) -> Outcome {
    if ctx.state.in_bibliography || !ctx.rules.is_bibliography_heading(&ctx.text) {
        return Outcome::Fallthrough;
    }
    ctx.state.in_bibliography = true;

    let mut props = ctx.para.properties();
    props.set_first_line_indent(0.0);
    props.set_left_indent(0.0);
    props.set_alignment(Alignment::Left);
    for mut run in ctx.para.runs() {
        let mut props = run.properties();
        fonts::apply_font_pair(&mut props, BODY_SIZE);
        props.set_bold(Some(false));
    }
    Outcome::Consumed(Role::BibliographyHeading)
}

/// Step 5: hanging indent; italics (titles of works) survive.
fn bibliography_entry(ctx: &mut Ctx<'_>) -> Outcome {
    if !ctx.state.in_bibliography {
        return Outcome::Fallthrough;
    }
    let mut props = ctx.para.properties();
    props.set_left_indent(INDENT_PT);
    props.set_first_line_indent(-INDENT_PT);
    props.set_single_spacing();
    normalize_runs(ctx.para.runs(), true);
    Outcome::Consumed(Role::BibliographyEntry)
}

/// Step 6: body text and numbered headings.
fn body_text(ctx: &mut Ctx<'_>) -> Outcome {
    let level = ctx.rules.heading_level(&ctx.text);
    let indent = match level {
        Some(l) if l.is_flush() => 0.0,
        _ => INDENT_PT,
    };
    let mut props = ctx.para.properties();
    props.set_first_line_indent(indent);
    props.set_left_indent(0.0);
    normalize_runs(ctx.para.runs(), false);
    Outcome::Consumed(Role::Body(level))
}
