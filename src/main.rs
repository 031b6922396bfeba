use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use pagesetter_pdf::{Composition, DrawOp, RecordingCanvas};

/// Lay out a JSON composition onto PDF pages
#[derive(Parser, Debug)]
#[command(name = "pagesetter")]
#[command(version, about, long_about = None)]
struct Args {
    /// Composition file (JSON)
    input: PathBuf,

    /// Output PDF; defaults to the input path with a .pdf extension
    output: Option<PathBuf>,

    /// Run the layout without writing a PDF and print a page summary
    #[arg(long)]
    dry_run: bool,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    if args.dry_run {
        return match dry_run(&args) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("Error: {e}");
                ExitCode::FAILURE
            }
        };
    }

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| args.input.with_extension("pdf"));
    match pagesetter_pdf::compose_json_to_pdf(&args.input, &output) {
        Ok(()) => {
            println!("Wrote {}", output.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn dry_run(args: &Args) -> pagesetter_pdf::Result<()> {
    let composition = Composition::from_path(&args.input)?;
    let recording = composition.render(RecordingCanvas::new())?;
    for (i, page) in recording.pages.iter().enumerate() {
        let ops = page.painted_ops();
        let texts = ops
            .iter()
            .filter(|op| matches!(op, DrawOp::Text { .. }))
            .count();
        let images = ops
            .iter()
            .filter(|op| matches!(op, DrawOp::Image { .. }))
            .count();
        println!(
            "page {:>3}: {:.0}x{:.0}pt, {} streams, {} ops, {} text runs, {} images",
            i + 1,
            page.size.width,
            page.size.height,
            page.streams.len(),
            ops.len(),
            texts,
            images,
        );
    }
    println!(
        "{} pages, {} streams",
        recording.page_count(),
        recording.stream_count()
    );
    Ok(())
}
