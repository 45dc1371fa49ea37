//! Line-oriented markdown parser.
//!
//! Produces a flat sequence of [`Block`]s with inline [`Span`]s and knows
//! nothing about the output format. Recognized, in this order per line:
//! blank lines (skipped), `#` headings, horizontal rules, fenced code,
//! pipe tables, bullet/numbered lists and plain paragraphs.

use std::sync::LazyLock;

use regex::Regex;

/// A run of text with uniform inline formatting.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Span {
    pub text: String,
    pub bold: bool,
    pub italic: bool,
    pub code: bool,
}

impl Span {
    #[must_use]
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }
}

/// One list entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListItem {
    /// `Some(n)` for numbered items, `None` for bullets.
    pub number: Option<u32>,
    pub spans: Vec<Span>,
}

/// Structural node of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading { level: u8, spans: Vec<Span> },
    /// Header row first; divider rows are already dropped.
    Table { rows: Vec<Vec<Vec<Span>>> },
    List { items: Vec<ListItem> },
    Code(String),
    Rule,
    Paragraph(Vec<Span>),
}

static INLINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\*\*\*.+?\*\*\*|\*\*.+?\*\*|\*.+?\*|`.+?`|___.+?___|__.+?__|_.+?_)")
        .expect("inline pattern")
});

static DIVIDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\|?[\s\-:|]+\|?$").expect("divider pattern")
});

static BULLET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-*+]\s+(.*)$").expect("bullet pattern"));

static NUMBERED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)[.)]\s+(.*)$").expect("numbered pattern")
});

/// Parses a markdown document into blocks.
#[must_use]
pub fn parse(text: &str) -> Vec<Block> {
    let lines: Vec<&str> = text.lines().collect();
    let mut blocks = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i].trim();

        if line.is_empty() {
            i += 1;
        } else if let Some(heading) = parse_heading(line) {
            blocks.push(heading);
            i += 1;
        } else if is_rule(line) {
            blocks.push(Block::Rule);
            i += 1;
        } else if line.starts_with("```") {
            let (code, next) = take_code(&lines, i + 1);
            blocks.push(Block::Code(code));
            i = next;
        } else if line.contains('|') {
            let (block, next) = take_table(&lines, i);
            blocks.push(block);
            i = next;
        } else if list_item(line).is_some() {
            let (block, next) = take_list(&lines, i);
            blocks.push(block);
            i = next;
        } else {
            blocks.push(Block::Paragraph(parse_inline(line)));
            i += 1;
        }
    }

    blocks
}

fn parse_heading(line: &str) -> Option<Block> {
    let hashes = line.chars().take_while(|c| *c == '#').count();
    if hashes == 0 || hashes > 6 {
        return None;
    }
    let rest = &line[hashes..];
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return None;
    }
    Some(Block::Heading {
        level: u8::try_from(hashes).unwrap_or(6),
        spans: parse_inline(rest.trim()),
    })
}

fn is_rule(line: &str) -> bool {
    let compact: String = line.chars().filter(|c| !c.is_whitespace()).collect();
    compact.len() >= 3
        && ['-', '*', '_']
            .iter()
            .any(|marker| compact.chars().all(|c| c == *marker))
}

/// Collects lines up to the closing fence. An unclosed fence runs to the end.
fn take_code(lines: &[&str], start: usize) -> (String, usize) {
    let mut end = start;
    while end < lines.len() && !lines[end].trim().starts_with("```") {
        end += 1;
    }
    let code = lines[start..end].join("\n");
    (code, (end + 1).min(lines.len()))
}

fn take_table(lines: &[&str], start: usize) -> (Block, usize) {
    let mut end = start;
    while end < lines.len() && lines[end].contains('|') && !lines[end].trim().is_empty() {
        end += 1;
    }
    if end - start < 2 {
        // A single pipe line is prose, not a table.
        return (Block::Paragraph(parse_inline(lines[start].trim())), end);
    }

    let rows: Vec<Vec<Vec<Span>>> = lines[start..end]
        .iter()
        .map(|l| l.trim())
        .filter(|l| !DIVIDER.is_match(l))
        .map(split_row)
        .filter(|cells| !cells.is_empty())
        .map(|cells| cells.iter().map(|c| parse_inline(c)).collect())
        .collect();

    if rows.is_empty() {
        // Nothing but pipes and dashes: keep the text as it was written.
        let text = lines[start..end].iter().map(|l| l.trim()).collect::<Vec<_>>().join(" ");
        return (Block::Paragraph(vec![Span::plain(text)]), end);
    }
    (Block::Table { rows }, end)
}

/// Splits a table row into trimmed cells, dropping the empty edge cells
/// produced by leading and trailing pipes.
fn split_row(line: &str) -> Vec<&str> {
    let mut cells: Vec<&str> = line.split('|').map(str::trim).collect();
    if cells.first().is_some_and(|c| c.is_empty()) {
        cells.remove(0);
    }
    if cells.last().is_some_and(|c| c.is_empty()) {
        cells.pop();
    }
    cells
}

fn list_item(line: &str) -> Option<ListItem> {
    if let Some(caps) = NUMBERED.captures(line) {
        return Some(ListItem {
            number: caps[1].parse().ok(),
            spans: parse_inline(caps[2].trim()),
        });
    }
    BULLET.captures(line).map(|caps| ListItem {
        number: None,
        spans: parse_inline(caps[1].trim()),
    })
}

fn take_list(lines: &[&str], start: usize) -> (Block, usize) {
    let mut items = Vec::new();
    let mut end = start;
    while end < lines.len() {
        let Some(item) = list_item(lines[end].trim()) else {
            break;
        };
        items.push(item);
        end += 1;
    }
    (Block::List { items }, end)
}

/// Splits a line into formatted spans.
///
/// Markers are matched leftmost first, longest marker first at a given
/// position, and never overlap.
#[must_use]
pub fn parse_inline(text: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut last = 0;

    for m in INLINE.find_iter(text) {
        if m.start() > last {
            spans.push(Span::plain(&text[last..m.start()]));
        }
        spans.push(styled(m.as_str()));
        last = m.end();
    }
    if last < text.len() {
        spans.push(Span::plain(&text[last..]));
    }
    spans
}

fn styled(token: &str) -> Span {
    for (marker, bold, italic) in [
        ("***", true, true),
        ("___", true, true),
        ("**", true, false),
        ("__", true, false),
        ("*", false, true),
        ("_", false, true),
    ] {
        if let Some(inner) = token.strip_prefix(marker).and_then(|t| t.strip_suffix(marker)) {
            return Span {
                text: inner.to_owned(),
                bold,
                italic,
                code: false,
            };
        }
    }
    match token.strip_prefix('`').and_then(|t| t.strip_suffix('`')) {
        Some(inner) => Span {
            text: inner.to_owned(),
            code: true,
            ..Span::default()
        },
        None => Span::plain(token),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(spans: &[Span]) -> Vec<&str> {
        spans.iter().map(|s| s.text.as_str()).collect()
    }

    #[test]
    fn test_table_drops_divider() {
        let md = "| Этап | Стоимость | Срок |\n|---|:---:|---|\n| Дизайн | 30 000 | 1 нед |\n| Разработка | 120 000 | 4 нед |";
        let blocks = parse(md);
        assert_eq!(blocks.len(), 1);

        let Block::Table { rows } = &blocks[0] else {
            panic!("expected table, got {blocks:?}");
        };
        assert_eq!(rows.len(), 3);
        assert_eq!(texts(&rows[0][1]), ["Стоимость"]);
        assert_eq!(texts(&rows[2][0]), ["Разработка"]);
        assert!(rows.iter().all(|r| r.len() == 3));
    }

    #[test]
    fn test_table_ends_at_blank_line() {
        let blocks = parse("| a | b |\n| 1 | 2 |\n\nТекст");
        assert!(matches!(&blocks[0], Block::Table { rows } if rows.len() == 2));
        assert_eq!(blocks[1], Block::Paragraph(vec![Span::plain("Текст")]));
    }

    #[test]
    fn test_headings_and_rules() {
        let blocks = parse("# КП\n## Этапы\n---\n***\n#хештег");
        assert_eq!(
            blocks,
            vec![
                Block::Heading {
                    level: 1,
                    spans: vec![Span::plain("КП")]
                },
                Block::Heading {
                    level: 2,
                    spans: vec![Span::plain("Этапы")]
                },
                Block::Rule,
                Block::Rule,
                Block::Paragraph(vec![Span::plain("#хештег")]),
            ]
        );
    }

    #[test]
    fn test_lists_are_contiguous() {
        let blocks = parse("- один\n* два\n\n1. первый\n2. второй\nпосле");
        assert_eq!(blocks.len(), 3);

        let Block::List { items } = &blocks[0] else {
            panic!("expected list");
        };
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|i| i.number.is_none()));

        let Block::List { items } = &blocks[1] else {
            panic!("expected list");
        };
        assert_eq!(items.iter().map(|i| i.number).collect::<Vec<_>>(), [Some(1), Some(2)]);
        assert_eq!(blocks[2], Block::Paragraph(vec![Span::plain("после")]));
    }

    #[test]
    fn test_code_fence_is_verbatim() {
        let blocks = parse("```rust\nlet a = **b** | c;\n  indented\n```\nдальше");
        assert_eq!(
            blocks,
            vec![
                Block::Code("let a = **b** | c;\n  indented".to_owned()),
                Block::Paragraph(vec![Span::plain("дальше")]),
            ]
        );
    }

    #[test]
    fn test_unclosed_fence_runs_to_end() {
        assert_eq!(parse("```\nx\ny"), vec![Block::Code("x\ny".to_owned())]);
    }

    #[test]
    fn test_inline_spans() {
        let spans = parse_inline("Итого: **150 000** за *4* недели, `api` и ***важно***");
        assert_eq!(
            texts(&spans),
            ["Итого: ", "150 000", " за ", "4", " недели, ", "api", " и ", "важно"]
        );
        assert!(spans[1].bold && !spans[1].italic);
        assert!(spans[3].italic && !spans[3].bold);
        assert!(spans[5].code);
        assert!(spans[7].bold && spans[7].italic);
    }

    #[test]
    fn test_inline_leftmost_wins() {
        let spans = parse_inline("_a *b_ c*");
        assert_eq!(texts(&spans), ["a *b", " c*"]);
        assert!(spans[0].italic);
        assert!(!spans[1].italic);
    }

    #[test]
    fn test_single_pipe_line_is_prose() {
        let blocks = parse("Цена: 100 000 ₽ | срок 2 недели\n\nДалее текст");
        assert_eq!(
            blocks,
            vec![
                Block::Paragraph(vec![Span::plain("Цена: 100 000 ₽ | срок 2 недели")]),
                Block::Paragraph(vec![Span::plain("Далее текст")]),
            ]
        );
    }

    #[test]
    fn test_lone_pipe_is_paragraph() {
        assert_eq!(parse("|"), vec![Block::Paragraph(vec![Span::plain("|")])]);
    }
}
