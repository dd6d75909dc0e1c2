//! CLI binary for pdf2docx.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ConversionConfig` / `ServerConfig`, then either serves HTTP or runs a
//! single conversion.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use pdf2docx::pipeline::docx::read_docx_text;
use pdf2docx::pipeline::input::default_output_path;
use pdf2docx::{
    convert::write_docx, server, ConversionConfig, Converter, ExtractionEngine, PageSelection,
    PageSeparator, ParagraphMode, ServerConfig,
};
use std::io::{self, Write};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn paint(sgr: &str, s: &str) -> String {
    format!("\x1b[{sgr}m{s}\x1b[0m")
}

const GREEN: &str = "32";
const RED: &str = "31";
const BOLD: &str = "1";

const AFTER_HELP: &str = r#"EXAMPLES:
  Serve the upload form API on port 8080:
    pdf2docx serve --bind 0.0.0.0:8080

  Upload from the shell:
    curl -F file=@report.pdf -OJ http://127.0.0.1:5001/convert

  Convert locally (writes report.docx next to the input):
    pdf2docx convert report.pdf

  Convert pages 2-5 of a remote PDF, one paragraph per text block:
    pdf2docx convert https://example.com/paper.pdf --pages 2-5 --paragraphs blocks

  Show document metadata:
    pdf2docx inspect report.pdf --json
"#;

/// Convert PDF documents to Word (.docx).
#[derive(Parser, Debug)]
#[command(
    name = "pdf2docx",
    version,
    about = "Convert PDF documents to Word (.docx): HTTP service and CLI",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true, env = "PDF2DOCX_VERBOSE")]
    verbose: bool,

    /// Only log errors and skip the summary line.
    #[arg(short, long, global = true, env = "PDF2DOCX_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP service (POST /convert, GET /health).
    Serve {
        /// Listen address.
        #[arg(long, env = "PDF2DOCX_BIND", default_value = "127.0.0.1:5001")]
        bind: SocketAddr,

        /// Accept uploads whatever their filename extension.
        #[arg(long, env = "PDF2DOCX_ALLOW_ANY_EXTENSION")]
        allow_any_extension: bool,

        #[command(flatten)]
        opts: ConvertOpts,
    },

    /// Convert one local PDF or URL to DOCX.
    Convert {
        /// Local PDF file path or HTTP/HTTPS URL.
        input: String,

        /// Output path. Default: input name with a .docx extension.
        #[arg(short, long, env = "PDF2DOCX_OUTPUT")]
        output: Option<PathBuf>,

        /// Print conversion metadata and stats as JSON on stdout.
        #[arg(long)]
        json: bool,

        /// Print the document body text on stdout, read back from the DOCX.
        #[arg(long, conflicts_with = "json")]
        text: bool,

        #[command(flatten)]
        opts: ConvertOpts,
    },

    /// Print PDF metadata without converting.
    Inspect {
        /// Local PDF file path or HTTP/HTTPS URL.
        input: String,

        /// Print as JSON.
        #[arg(long)]
        json: bool,

        /// User password for encrypted PDFs.
        #[arg(long, env = "PDF2DOCX_PASSWORD")]
        password: Option<String>,
    },
}

/// Conversion settings shared by `serve` and `convert`.
#[derive(Args, Debug)]
struct ConvertOpts {
    /// Directory for temporary files. Default: the OS temp directory.
    #[arg(long, env = "PDF2DOCX_TEMP_DIR")]
    temp_dir: Option<PathBuf>,

    /// Largest accepted input in MiB.
    #[arg(long, env = "PDF2DOCX_MAX_SIZE_MB", default_value_t = 50)]
    max_size_mb: usize,

    /// Pages to convert: all, 5, 3-15, 1,3,5.
    #[arg(long, env = "PDF2DOCX_PAGES", default_value = "all")]
    pages: String,

    /// Between pages: page-break, none, or any custom text.
    #[arg(long, env = "PDF2DOCX_SEPARATOR", default_value = "page-break")]
    separator: String,

    /// Paragraph splitting.
    #[arg(long, env = "PDF2DOCX_PARAGRAPHS", value_enum, default_value = "lines")]
    paragraphs: ParagraphArg,

    /// Font of the Normal style.
    #[arg(long, env = "PDF2DOCX_FONT", default_value = "Calibri")]
    font: String,

    /// Font size in points (6–72).
    #[arg(long, env = "PDF2DOCX_FONT_SIZE", default_value_t = 11,
          value_parser = clap::value_parser!(u32).range(6..=72))]
    font_size: u32,

    /// Do not write title/author into the document properties.
    #[arg(long, env = "PDF2DOCX_NO_METADATA")]
    no_metadata: bool,

    /// Fail on PDFs without extractable text instead of writing a placeholder.
    #[arg(long, env = "PDF2DOCX_FAIL_ON_EMPTY")]
    fail_on_empty: bool,

    /// User password for encrypted PDFs.
    #[arg(long, env = "PDF2DOCX_PASSWORD")]
    password: Option<String>,

    /// Extraction engine.
    #[arg(long, env = "PDF2DOCX_ENGINE", value_enum, default_value = "lopdf")]
    engine: EngineArg,

    /// Directory holding libpdfium (pdfium engine only).
    #[arg(long, env = "PDF2DOCX_PDFIUM_LIB")]
    pdfium_lib: Option<PathBuf>,

    /// Re-read nearly empty documents with Tesseract OCR (needs the `ocr` build).
    #[arg(long, env = "PDF2DOCX_OCR")]
    ocr: bool,

    /// Tesseract language(s) for --ocr, e.g. `eng+deu`.
    #[arg(long, env = "PDF2DOCX_OCR_LANG", default_value = "eng")]
    ocr_lang: String,

    /// URL download timeout in seconds.
    #[arg(long, env = "PDF2DOCX_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,
}

#[derive(ValueEnum, Clone, Debug)]
enum ParagraphArg {
    /// One paragraph per text line.
    Lines,
    /// One paragraph per blank-line separated block.
    Blocks,
}

impl From<ParagraphArg> for ParagraphMode {
    fn from(v: ParagraphArg) -> Self {
        match v {
            ParagraphArg::Lines => ParagraphMode::Lines,
            ParagraphArg::Blocks => ParagraphMode::Blocks,
        }
    }
}

#[derive(ValueEnum, Clone, Debug)]
enum EngineArg {
    Lopdf,
    Pdfium,
}

impl From<EngineArg> for ExtractionEngine {
    fn from(v: EngineArg) -> Self {
        match v {
            EngineArg::Lopdf => ExtractionEngine::Lopdf,
            EngineArg::Pdfium => ExtractionEngine::Pdfium,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("{} {:#}", paint(RED, "✘"), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Serve {
            bind,
            allow_any_extension,
            opts,
        } => {
            let config = build_config(&opts)?;
            let server_config = ServerConfig {
                bind,
                max_upload_bytes: config.max_input_bytes,
                require_pdf_extension: !allow_any_extension,
            };
            let converter = Converter::new(config).context("Invalid configuration")?;
            if !cli.quiet {
                eprintln!(
                    "{}  POST http://{bind}/convert  (Ctrl-C to stop)",
                    paint(BOLD, "pdf2docx")
                );
            }
            server::serve(server_config, converter)
                .await
                .context("Server error")?;
        }

        Command::Convert {
            input,
            output,
            json,
            text,
            opts,
        } => {
            let converter = Converter::new(build_config(&opts)?).context("Invalid configuration")?;
            let result = converter
                .convert_file(&input)
                .await
                .context("Conversion failed")?;

            let out_path = output.unwrap_or_else(|| default_output_path(&input));
            write_docx(&result.docx, &out_path)
                .await
                .context("Failed to write output")?;

            if json {
                let json =
                    serde_json::to_string_pretty(&result).context("Failed to serialise output")?;
                println!("{json}");
            } else if text {
                let body = read_docx_text(&result.docx).context("Failed to read back DOCX")?;
                let stdout = io::stdout();
                let mut handle = stdout.lock();
                handle
                    .write_all(body.as_bytes())
                    .and_then(|_| handle.write_all(b"\n"))
                    .context("Failed to write to stdout")?;
            }

            if !cli.quiet {
                let stats = &result.stats;
                eprintln!(
                    "{}  {}/{} pages  {} paragraphs  {}ms  →  {}",
                    paint(GREEN, "✔"),
                    stats.converted_pages,
                    stats.total_pages,
                    stats.paragraphs,
                    stats.total_duration_ms,
                    paint(BOLD, &out_path.display().to_string()),
                );
            }
        }

        Command::Inspect {
            input,
            json,
            password,
        } => {
            let mut builder = ConversionConfig::builder();
            if let Some(pwd) = password {
                builder = builder.password(pwd);
            }
            let converter = Converter::new(builder.build().context("Invalid configuration")?)
                .context("Invalid configuration")?;
            let meta = converter
                .inspect_file(&input)
                .await
                .context("Failed to inspect PDF")?;

            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&meta).context("Failed to serialise metadata")?
                );
            } else {
                let or_dash = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());
                println!("{}     {}", paint(BOLD, "Title:"), or_dash(&meta.title));
                println!("{}    {}", paint(BOLD, "Author:"), or_dash(&meta.author));
                println!("{}   {}", paint(BOLD, "Subject:"), or_dash(&meta.subject));
                println!("{}   {}", paint(BOLD, "Creator:"), or_dash(&meta.creator));
                println!("{}  {}", paint(BOLD, "Producer:"), or_dash(&meta.producer));
                println!("{}     {}", paint(BOLD, "Pages:"), meta.page_count);
                println!("{}   {}", paint(BOLD, "Version:"), meta.pdf_version);
                println!("{} {}", paint(BOLD, "Encrypted:"), meta.is_encrypted);
            }
        }
    }

    Ok(())
}

/// Map CLI args to `ConversionConfig`.
fn build_config(opts: &ConvertOpts) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder()
        .max_input_bytes(opts.max_size_mb.saturating_mul(1024 * 1024))
        .pages(parse_pages(&opts.pages)?)
        .page_separator(parse_separator(&opts.separator))
        .paragraph_mode(opts.paragraphs.clone().into())
        .font_name(opts.font.clone())
        .font_size_pt(opts.font_size)
        .include_metadata(!opts.no_metadata)
        .engine(opts.engine.clone().into())
        .ocr_fallback(opts.ocr)
        .ocr_language(opts.ocr_lang.clone())
        .download_timeout_secs(opts.download_timeout);

    if let Some(ref dir) = opts.temp_dir {
        builder = builder.temp_dir(dir.clone());
    }
    if let Some(ref pwd) = opts.password {
        builder = builder.password(pwd.clone());
    }
    if let Some(ref lib) = opts.pdfium_lib {
        builder = builder.pdfium_library_path(lib.clone());
    }
    if opts.fail_on_empty {
        builder = builder.empty_text_placeholder(None);
    }

    builder.build().context("Invalid configuration")
}

/// Parse `--pages` string into `PageSelection`.
fn parse_pages(s: &str) -> Result<PageSelection> {
    let s = s.trim().to_lowercase();

    if s == "all" {
        return Ok(PageSelection::All);
    }

    // Range: "3-15"
    if let Some((start, end)) = s.split_once('-') {
        let start: usize = start
            .trim()
            .parse()
            .context("Invalid start page in range")?;
        let end: usize = end.trim().parse().context("Invalid end page in range")?;

        if start < 1 {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", start);
        }
        if start > end {
            anyhow::bail!(
                "Invalid page range '{}-{}': start must be <= end",
                start,
                end
            );
        }

        return Ok(PageSelection::Range(start, end));
    }

    // Set: "1,3,5,7"
    if s.contains(',') {
        let pages: Vec<usize> = s
            .split(',')
            .map(|p| {
                p.trim()
                    .parse::<usize>()
                    .with_context(|| format!("Invalid page number: '{}'", p.trim()))
            })
            .collect::<Result<Vec<_>>>()?;

        if let Some(&p) = pages.iter().find(|&&p| p < 1) {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", p);
        }

        return Ok(PageSelection::Set(pages));
    }

    // Single page: "5"
    let page: usize = s.parse().context("Invalid page number")?;
    if page < 1 {
        anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", page);
    }

    Ok(PageSelection::Single(page))
}

/// Parse `--separator` string into `PageSeparator`.
fn parse_separator(s: &str) -> PageSeparator {
    match s.trim().to_lowercase().as_str() {
        "none" => PageSeparator::None,
        "page-break" | "pagebreak" | "break" => PageSeparator::PageBreak,
        _ => PageSeparator::Custom(s.to_string()),
    }
}
