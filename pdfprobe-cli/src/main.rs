use anyhow::{Context, Result};
use clap::Parser;
use pdfprobe::filters::{stream_filters, Filter};
use pdfprobe::PdfDocument;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "pdfprobe",
    about = "Inspect the structure of a PDF file",
    version
)]
struct Cli {
    /// PDF file to inspect
    input: PathBuf,

    /// Skip dumping the resolved body of every in-use object
    #[arg(short, long)]
    summary_only: bool,
}

fn main() -> Result<()> {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(log::LevelFilter::Warn);
    }

    let cli = Cli::parse();

    let mut doc = PdfDocument::open(&cli.input)
        .with_context(|| format!("failed to read {}", cli.input.display()))?;

    println!("File:    {}", cli.input.display());
    println!("Version: {}", doc.header().version);

    let summary = doc.summary();
    println!(
        "Pages:   {} ({} x {})",
        summary.page_count, summary.width, summary.height
    );
    println!("Info:    {}", doc.info());
    println!("Tree:    {}", doc.pages());

    if cli.summary_only {
        return Ok(());
    }

    println!();
    for (number, generation) in doc.references() {
        let object = doc
            .resolve(number, generation)
            .with_context(|| format!("failed to resolve {number} {generation} R"))?;
        println!("{number} {generation} obj: {object}");

        if let Some(stream) = object.as_stream() {
            let body = doc
                .stream_data(stream)
                .with_context(|| format!("failed to read stream body of {number} {generation} R"))?;
            let filters = stream_filters(&stream.dict)
                .with_context(|| format!("bad Filter entry on {number} {generation} R"))?;
            let encoding = if filters.is_empty() {
                "plain".to_string()
            } else {
                filters
                    .iter()
                    .map(|f| match f {
                        Filter::FlateDecode => "FlateDecode".to_string(),
                        Filter::Unsupported(name) => {
                            format!("{} (unsupported)", String::from_utf8_lossy(name))
                        }
                    })
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            println!("        body: {} bytes, {encoding}", body.len());
        }
    }

    Ok(())
}

/// A simple stderr logger.
static LOGGER: SimpleLogger = SimpleLogger;
struct SimpleLogger;
impl log::Log for SimpleLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::LevelFilter::Warn
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            eprintln!("{}: {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}
