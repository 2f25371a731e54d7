//! pdfimg CLI - download PDFs and extract their embedded images

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use pdfimg::{
    fetch_and_extract, list_images, ExtractObserver, ExtractOptions, ExtractedImage,
    ExtractionReport, FetchOptions, HttpFetcher, ImageRef, LogObserver, PageSelection,
    DEFAULT_OUTPUT_DIR,
};

#[derive(Parser)]
#[command(name = "pdfimg")]
#[command(author = "iyulab")]
#[command(version)]
#[command(about = "Download a PDF and extract its embedded images as PNG", long_about = None)]
struct Cli {
    /// URL of the PDF to download
    #[arg(value_name = "URL")]
    url: Option<String>,

    /// Output directory
    #[arg(value_name = "OUTPUT")]
    output_dir: Option<PathBuf>,

    #[command(flatten)]
    extract: ExtractArgs,

    #[command(flatten)]
    download: DownloadArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Download a PDF and extract its images
    Fetch {
        /// URL of the PDF
        #[arg(value_name = "URL")]
        url: String,

        #[command(flatten)]
        extract: ExtractArgs,

        #[command(flatten)]
        download: DownloadArgs,
    },

    /// Extract images from a local PDF file
    File {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        #[command(flatten)]
        extract: ExtractArgs,
    },

    /// List image references without writing anything
    #[command(alias = "ls")]
    List {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Page range (e.g., "1-10", "1,3,5")
        #[arg(long)]
        pages: Option<String>,

        /// Ignore images inside Form XObjects
        #[arg(long)]
        no_forms: bool,

        /// Print the listing as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show version information
    Version,
}

#[derive(Args, Clone)]
struct ExtractArgs {
    /// Output directory [default: extracted_images]
    #[arg(short, long, value_name = "DIR", env = "PDFIMG_OUTPUT_DIR")]
    output: Option<PathBuf>,

    /// Page range (e.g., "1-10", "1,3,5")
    #[arg(long)]
    pages: Option<String>,

    /// Skip images that fail to decode instead of aborting
    #[arg(long)]
    lenient: bool,

    /// Ignore images inside Form XObjects
    #[arg(long)]
    no_forms: bool,

    /// Do not apply soft masks and stencil masks
    #[arg(long)]
    no_masks: bool,

    /// Print the extraction report as JSON
    #[arg(long)]
    json: bool,
}

impl ExtractArgs {
    fn to_options(&self, output: Option<&Path>) -> Result<ExtractOptions, Box<dyn std::error::Error>> {
        let output_dir = output
            .or(self.output.as_deref())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));

        let mut options = ExtractOptions::new()
            .with_output_dir(output_dir)
            .with_pages(parse_pages(self.pages.as_deref())?)
            .with_forms(!self.no_forms)
            .with_masks(!self.no_masks);
        if self.lenient {
            options = options.lenient();
        }
        Ok(options)
    }
}

#[derive(Args, Clone)]
struct DownloadArgs {
    /// Request timeout in seconds
    #[arg(long, value_name = "SECS", default_value_t = 60)]
    timeout: u64,

    /// Abort downloads larger than this many bytes
    #[arg(long, value_name = "BYTES")]
    max_bytes: Option<u64>,
}

impl DownloadArgs {
    fn to_options(&self) -> FetchOptions {
        let mut options = FetchOptions::new().with_timeout(Duration::from_secs(self.timeout));
        if let Some(limit) = self.max_bytes {
            options = options.with_max_bytes(limit);
        }
        options
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Fetch {
            url,
            extract,
            download,
        }) => cmd_fetch(&url, None, &extract, &download),
        Some(Commands::File { input, extract }) => cmd_file(&input, &extract),
        Some(Commands::List {
            input,
            pages,
            no_forms,
            json,
        }) => cmd_list(&input, pages.as_deref(), no_forms, json),
        Some(Commands::Version) => {
            cmd_version();
            Ok(())
        }
        None => {
            // Default behavior: fetch if a URL is provided
            if let Some(url) = cli.url {
                cmd_fetch(&url, cli.output_dir.as_deref(), &cli.extract, &cli.download)
            } else {
                println!("{}", "Usage: pdfimg <URL> [OUTPUT]".yellow());
                println!("       pdfimg --help for more information");
                Ok(())
            }
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn parse_pages(pages: Option<&str>) -> Result<PageSelection, Box<dyn std::error::Error>> {
    Ok(match pages {
        Some(p) => PageSelection::parse(p)?,
        None => PageSelection::All,
    })
}

fn cmd_fetch(
    url: &str,
    output: Option<&Path>,
    args: &ExtractArgs,
    download: &DownloadArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let options = args.to_options(output)?;
    let fetcher = HttpFetcher::new(download.to_options())?;

    let observer = ProgressObserver::new(args.json);
    observer.pb.set_message(format!("Downloading {}...", url));
    let report = fetch_and_extract(&fetcher, url, &options, observer)?;

    print_report(&report, &options, args.json)
}

fn cmd_file(input: &Path, args: &ExtractArgs) -> Result<(), Box<dyn std::error::Error>> {
    let options = args.to_options(None)?;
    let data = fs::read(input)?;

    let report = pdfimg::extract_images_with_observer(&data, &options, ProgressObserver::new(args.json))?;

    print_report(&report, &options, args.json)
}

fn cmd_list(
    input: &Path,
    pages: Option<&str>,
    no_forms: bool,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let options = ExtractOptions::new()
        .with_pages(parse_pages(pages)?)
        .with_forms(!no_forms);
    let data = fs::read(input)?;
    let listed = list_images(&data, &options)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&listed)?);
        return Ok(());
    }

    println!("{}", "Image References".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    let mut distinct = 0;
    for item in &listed {
        let r = &item.reference;
        let mut line = format!(
            "{} {:>4}  /{:<10} {}",
            "page".dimmed(),
            r.page,
            r.name,
            r.resource
        );
        if r.via_form {
            line.push_str(&format!(" {}", "(form)".dimmed()));
        }
        if item.duplicate {
            line.push_str(&format!(" {}", "duplicate".yellow()));
        } else {
            distinct += 1;
        }
        println!("{}", line);
    }

    println!();
    println!(
        "{}: {} ({} distinct)",
        "References".bold(),
        listed.len(),
        distinct
    );
    Ok(())
}

fn print_report(
    report: &ExtractionReport,
    options: &ExtractOptions,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!("{}", report.to_json(true)?);
        return Ok(());
    }

    println!(
        "\n{} {} image(s) extracted to {}",
        "Done!".green().bold(),
        report.image_count(),
        options.output_dir.display()
    );

    let last = report.images.len().saturating_sub(1);
    for (i, image) in report.images.iter().enumerate() {
        let branch = if i == last { "└─" } else { "├─" };
        let name = image
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        println!(
            "  {} {} {}",
            branch.dimmed(),
            name,
            format!("{}x{} {}", image.width, image.height, image.source_color_space).dimmed()
        );
    }

    if report.duplicates_skipped > 0 {
        println!(
            "{} duplicate reference(s) skipped",
            report.duplicates_skipped.to_string().cyan()
        );
    }
    if !report.failures.is_empty() {
        println!(
            "{} image(s) could not be decoded",
            report.failures.len().to_string().yellow()
        );
    }
    Ok(())
}

/// Progress bar fed by extraction events.
struct ProgressObserver {
    pb: ProgressBar,
    log: LogObserver,
    quiet: bool,
}

impl ProgressObserver {
    /// A quiet observer draws nothing so `--json` output stays clean.
    fn new(quiet: bool) -> Self {
        let pb = if quiet {
            ProgressBar::hidden()
        } else {
            let pb = ProgressBar::new(0);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{bar:40.cyan/blue}] {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-"),
            );
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        };
        Self {
            pb,
            log: LogObserver,
            quiet,
        }
    }
}

impl ExtractObserver for ProgressObserver {
    fn document_opened(&mut self, page_count: usize) {
        self.log.document_opened(page_count);
        self.pb.set_length(page_count as u64);
        self.pb.set_message("Scanning pages...");
    }

    fn page_scanned(&mut self, page: u32, references: usize, new_images: usize) {
        self.log.page_scanned(page, references, new_images);
        self.pb.inc(1);
        self.pb
            .set_message(format!("Page {}: {} new image(s)", page, new_images));
    }

    fn image_saved(&mut self, image: &ExtractedImage) {
        self.log.image_saved(image);
    }

    fn image_failed(&mut self, reference: &ImageRef, error: &pdfimg::Error) {
        self.log.image_failed(reference, error);
        if !self.quiet {
            self.pb.println(format!(
                "{} page {} /{}: {}",
                "Skipped".yellow(),
                reference.page,
                reference.name,
                error
            ));
        }
    }

    fn finished(&mut self, report: &ExtractionReport) {
        self.log.finished(report);
        self.pb.finish_and_clear();
    }
}

impl Drop for ProgressObserver {
    fn drop(&mut self) {
        if !self.pb.is_finished() {
            self.pb.finish_and_clear();
        }
    }
}

fn cmd_version() {
    println!("{} {}", "pdfimg".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("PDF image extraction tool");
    println!();
    println!("Repository: {}", "https://github.com/iyulab/pdfimg".dimmed());
    println!("License: MIT");
}
