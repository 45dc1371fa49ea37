//! Standalone renderer for commercial-proposal documents.
//!
//! Turns a markdown file into the same `.docx` layout the bot sends, so the
//! document styling can be checked without a running bot.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;

use brief_bot::document::docx::write_docx;
use brief_bot::document::{Block, parse};

/// Commercial-proposal renderer.
#[derive(Parser, Debug)]
#[command(name = "render_proposal")]
#[command(about = "Renders a markdown proposal into a .docx document")]
#[command(version)]
struct Args {
    /// Markdown file to render.
    input: PathBuf,

    /// Output path (defaults to the input with a .docx extension).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Project name printed on the title line.
    #[arg(short, long, default_value = "Проект")]
    name: String,

    /// Print the parsed block structure before writing.
    #[arg(long)]
    print_blocks: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let text = match std::fs::read_to_string(&args.input) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("✗ Failed to read {}: {e}", args.input.display());
            return ExitCode::FAILURE;
        }
    };

    let blocks = parse(&text);
    if blocks.is_empty() {
        eprintln!("✗ Nothing to render in {}", args.input.display());
        return ExitCode::FAILURE;
    }

    if args.print_blocks {
        print_blocks(&blocks);
    }

    let output = args
        .output
        .unwrap_or_else(|| default_output(&args.input));

    match write_docx(&blocks, &args.name, &output) {
        Ok(()) => {
            println!("✓ {} blocks written to: {}", blocks.len(), output.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ Failed to write document: {e}");
            ExitCode::FAILURE
        }
    }
}

fn default_output(input: &Path) -> PathBuf {
    input.with_extension("docx")
}

fn print_blocks(blocks: &[Block]) {
    println!("Parsed blocks:");
    for (i, block) in blocks.iter().enumerate() {
        let summary = match block {
            Block::Heading { level, spans } => format!("heading h{level} ({} spans)", spans.len()),
            Block::Table { rows } => format!(
                "table {}x{}",
                rows.len(),
                rows.first().map_or(0, Vec::len)
            ),
            Block::List { items } => {
                let kind = if items.first().is_some_and(|item| item.number.is_some()) {
                    "numbered"
                } else {
                    "bulleted"
                };
                format!("{kind} list ({} items)", items.len())
            }
            Block::Code(text) => format!("code ({} lines)", text.lines().count()),
            Block::Rule => "rule".to_owned(),
            Block::Paragraph(spans) => format!("paragraph ({} spans)", spans.len()),
        };
        println!("  {:>3}. {summary}", i + 1);
    }
    println!();
}
