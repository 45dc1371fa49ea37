//! Writes parsed blocks as a `.docx` commercial proposal.

use std::fs::File;
use std::path::Path;

use docx_rs::{
    AlignmentType, BreakType, Docx, Header, Paragraph, Run, RunFonts, Table, TableCell, TableRow,
};
use tracing::debug;

use super::RenderError;
use super::markdown::{Block, ListItem, Span};

const BODY_FONT: &str = "Times New Roman";
const CODE_FONT: &str = "Courier New";

/// Sizes are in half-points.
const BODY_SIZE: usize = 24;
const CODE_SIZE: usize = 20;
const TITLE_SIZE: usize = 28;

const HEADER_TEXT: &str = "КОММЕРЧЕСКОЕ ПРЕДЛОЖЕНИЕ";
const SEPARATOR: &str = "____________________________________________________________";
const FOOTER_NOTE: &str =
    "Данное коммерческое предложение подготовлено автоматически на основе требований заказчика.";

fn fonts(name: &str) -> RunFonts {
    RunFonts::new().ascii(name).hi_ansi(name).cs(name).east_asia(name)
}

const fn heading_size(level: u8) -> usize {
    match level {
        1 => 32,
        2 => 28,
        3 => 26,
        _ => BODY_SIZE,
    }
}

fn run(span: &Span, size: usize, force_bold: bool) -> Run {
    let (font, size) = if span.code {
        (CODE_FONT, CODE_SIZE)
    } else {
        (BODY_FONT, size)
    };
    let mut run = Run::new().add_text(&span.text).fonts(fonts(font)).size(size);
    if span.bold || force_bold {
        run = run.bold();
    }
    if span.italic {
        run = run.italic();
    }
    run
}

fn paragraph(spans: &[Span], size: usize, bold: bool) -> Paragraph {
    spans
        .iter()
        .fold(Paragraph::new(), |p, span| p.add_run(run(span, size, bold)))
}

fn list_item(item: &ListItem) -> Paragraph {
    let marker = item
        .number
        .map_or_else(|| "• ".to_owned(), |n| format!("{n}. "));
    let p = Paragraph::new().add_run(Run::new().add_text(&marker).fonts(fonts(BODY_FONT)).size(BODY_SIZE));
    item.spans
        .iter()
        .fold(p, |p, span| p.add_run(run(span, BODY_SIZE, false)))
}

fn table(rows: &[Vec<Vec<Span>>]) -> Table {
    let rows = rows
        .iter()
        .enumerate()
        .map(|(i, cells)| {
            let header = i == 0;
            TableRow::new(
                cells
                    .iter()
                    .map(|spans| TableCell::new().add_paragraph(paragraph(spans, BODY_SIZE, header)))
                    .collect(),
            )
        })
        .collect();
    Table::new(rows)
}

fn code(text: &str) -> Paragraph {
    let mut run = Run::new().fonts(fonts(CODE_FONT)).size(CODE_SIZE);
    for (i, line) in text.lines().enumerate() {
        if i > 0 {
            run = run.add_break(BreakType::TextWrapping);
        }
        run = run.add_text(line);
    }
    Paragraph::new().add_run(run)
}

/// Builds the document in memory.
#[must_use]
pub fn build_document(blocks: &[Block], project_name: &str) -> Docx {
    let header = Header::new().add_paragraph(
        Paragraph::new().align(AlignmentType::Right).add_run(
            Run::new()
                .add_text(HEADER_TEXT)
                .fonts(fonts(BODY_FONT))
                .size(CODE_SIZE)
                .bold(),
        ),
    );

    let mut doc = Docx::new()
        .header(header)
        .default_fonts(fonts(BODY_FONT))
        .default_size(BODY_SIZE)
        .add_paragraph(
            Paragraph::new().align(AlignmentType::Center).add_run(
                Run::new()
                    .add_text(project_name)
                    .fonts(fonts(BODY_FONT))
                    .size(TITLE_SIZE)
                    .bold(),
            ),
        )
        .add_paragraph(Paragraph::new().add_run(Run::new().add_text(SEPARATOR)));

    for block in blocks {
        doc = match block {
            Block::Heading { level, spans } => {
                doc.add_paragraph(paragraph(spans, heading_size(*level), true))
            }
            Block::Paragraph(spans) => doc.add_paragraph(paragraph(spans, BODY_SIZE, false)),
            Block::Table { rows } => doc.add_table(table(rows)),
            Block::List { items } => items.iter().fold(doc, |d, item| d.add_paragraph(list_item(item))),
            Block::Code(text) => doc.add_paragraph(code(text)),
            Block::Rule => doc.add_paragraph(Paragraph::new().add_run(Run::new().add_text(SEPARATOR))),
        };
    }

    doc.add_paragraph(Paragraph::new().add_run(Run::new().add_break(BreakType::Page)))
        .add_paragraph(
            Paragraph::new().add_run(
                Run::new()
                    .add_text(FOOTER_NOTE)
                    .fonts(fonts(BODY_FONT))
                    .size(BODY_SIZE)
                    .italic(),
            ),
        )
}

/// Renders blocks into a `.docx` file at `path`.
pub fn write_docx(blocks: &[Block], project_name: &str, path: &Path) -> Result<(), RenderError> {
    let file = File::create(path)?;
    build_document(blocks, project_name)
        .build()
        .pack(file)
        .map_err(|e| RenderError::Pack(e.to_string()))?;
    debug!("Wrote {} blocks to {}", blocks.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use super::*;
    use crate::document::markdown::parse;

    #[test]
    fn test_write_docx_produces_zip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kp.docx");
        let blocks = parse(
            "# КП\n\nТекст с **жирным**\n\n| Этап | Срок |\n|---|---|\n| MVP | 2 нед |\n\n- пункт\n1. шаг\n\n```\ncode\n```\n---",
        );

        write_docx(&blocks, "Бот для ресторана", &path).unwrap();

        let mut magic = [0u8; 2];
        File::open(&path).unwrap().read_exact(&mut magic).unwrap();
        assert_eq!(&magic, b"PK");
    }

    #[test]
    fn test_missing_directory_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent").join("kp.docx");
        assert!(matches!(
            write_docx(&[], "x", &path),
            Err(RenderError::Io(_))
        ));
    }

    #[test]
    fn test_heading_sizes_shrink() {
        assert!(heading_size(1) > heading_size(2));
        assert!(heading_size(2) > heading_size(3));
        assert_eq!(heading_size(5), BODY_SIZE);
    }
}
