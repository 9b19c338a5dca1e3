mod display;
mod naming;
mod pipeline;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate, NaiveTime};
use clap::Parser;
use datajud_client::config::{API_KEY_ENV, DEFAULT_BASE_URL};
use datajud_client::{ClientConfig, Fetcher, SearchClient};
use datajud_core::query::{DEFAULT_PAGE_SIZE, LGPD_FIELDS};
use datajud_core::{DateEncoding, QuerySpec, SearchRequest, SearchWindow};
use datajud_store::DEFAULT_TABLE;
use tracing_subscriber::EnvFilter;

use crate::pipeline::{ExportPlan, OutputFormat};

#[derive(Parser)]
#[command(name = "datajud")]
#[command(version, about = "Extract court cases from the DataJud public API")]
struct Cli {
    /// Tribunal alias in the index name, e.g. `tjgo` for `api_publica_tjgo`.
    #[arg(long, default_value = "tjgo")]
    tribunal: String,

    /// API key, with or without the `ApiKey ` prefix.
    #[arg(long, env = API_KEY_ENV, hide_env_values = true)]
    api_key: Option<String>,

    #[arg(long, default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// First filing date (inclusive). Overrides `--days`.
    #[arg(long)]
    from: Option<NaiveDate>,

    /// Last filing date (inclusive). Defaults to now.
    #[arg(long, requires = "from")]
    to: Option<NaiveDate>,

    /// Rolling window length ending now.
    #[arg(long, default_value_t = 365)]
    days: u32,

    /// Match a subject code instead of the full-text query.
    #[arg(long, conflicts_with_all = ["query", "fields"])]
    subject: Option<u32>,

    /// Full-text query. Defaults to the LGPD / personal data preset.
    #[arg(long)]
    query: Option<String>,

    /// Fields searched by `--query`.
    #[arg(long, value_delimiter = ',', requires = "query")]
    fields: Vec<String>,

    /// Restrict `_source` to these fields (repeatable).
    #[arg(long = "source-field")]
    source_fields: Vec<String>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Csv)]
    output: OutputFormat,

    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// Label used in output file names. Derived from the filter when omitted.
    #[arg(long)]
    label: Option<String>,

    /// DuckDB table name.
    #[arg(long, default_value = DEFAULT_TABLE)]
    table: String,

    #[arg(
        long,
        default_value_t = DEFAULT_PAGE_SIZE,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    page_size: u32,

    /// Pause between pages.
    #[arg(long, default_value_t = 3)]
    delay_secs: u64,

    /// Per-request timeout. No timeout when omitted.
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Stop after this many pages. `1` issues a single request.
    #[arg(long)]
    max_pages: Option<u32>,

    /// Rows shown in the preview table.
    #[arg(long, default_value_t = 5)]
    preview: usize,

    /// Print a detail card for the first N cases.
    #[arg(long, default_value_t = 0)]
    cards: usize,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // A missing .env is fine; the key may come from the real environment.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = ClientConfig::new(cli.api_key.as_deref(), &cli.tribunal, &cli.base_url)
        .context("invalid configuration")?
        .with_timeout(cli.timeout_secs.map(Duration::from_secs))
        .with_page_delay(Duration::from_secs(cli.delay_secs))
        .with_max_pages(cli.max_pages);

    let window = search_window(&cli)?;
    let (filter, encoding) = search_filter(&cli);
    let label = cli.label.clone().unwrap_or_else(|| filter.label());

    let mut request = SearchRequest::new(window, filter)
        .with_page_size(cli.page_size)
        .with_encoding(encoding);
    if !cli.source_fields.is_empty() {
        request = request.with_source_fields(cli.source_fields.clone());
    }

    println!(
        "Searching {} from {} to {}",
        config.tribunal().to_uppercase(),
        window.start().format("%d/%m/%Y"),
        window.end().format("%d/%m/%Y"),
    );

    let client = SearchClient::new(&config).context("building HTTP client")?;
    let fetcher = Fetcher::from_config(client, &config);
    let outcome = fetcher.fetch_all(&request).await;

    if outcome.stop.is_failure() {
        eprintln!("Search stopped early: {}", outcome.stop);
    }
    println!(
        "Fetched {} records in {} pages ({})",
        outcome.records.len(),
        outcome.pages,
        outcome.stop
    );

    let plan = ExportPlan {
        format: cli.output,
        out_dir: cli.out_dir.clone(),
        tribunal: config.tribunal().to_string(),
        label,
        table: cli.table.clone(),
        today: Local::now().date_naive(),
    };
    let Some(report) = pipeline::export_outcome(&outcome, &plan)? else {
        println!("No cases matched; nothing written.");
        return Ok(());
    };

    println!(
        "Wrote {} cases ({} fetched) to {}",
        report.rows,
        report.fetched,
        report.path.display()
    );
    display::print_preview(&report.batch, cli.preview)?;
    display::print_cards(&report.batch, cli.cards)?;
    Ok(())
}

/// Subject codes use ISO window bounds; full-text queries the compact form.
fn search_filter(cli: &Cli) -> (QuerySpec, DateEncoding) {
    match (cli.subject, &cli.query) {
        (Some(code), _) => (QuerySpec::Subject { code }, DateEncoding::Iso),
        (None, Some(query)) => {
            let fields = if cli.fields.is_empty() {
                LGPD_FIELDS.iter().map(|f| f.to_string()).collect()
            } else {
                cli.fields.clone()
            };
            let filter = QuerySpec::FullText {
                query: query.clone(),
                fields,
            };
            (filter, DateEncoding::Compact)
        }
        (None, None) => (QuerySpec::lgpd(), DateEncoding::Compact),
    }
}

/// Explicit `--from`/`--to` dates, or the rolling `--days` window.
fn search_window(cli: &Cli) -> Result<SearchWindow> {
    let now = Local::now().naive_local();
    let Some(from) = cli.from else {
        return Ok(SearchWindow::last_days(cli.days, now));
    };
    let start = from.and_time(NaiveTime::MIN);
    let end = match cli.to {
        Some(to) => to.and_hms_opt(23, 59, 59).unwrap_or_else(|| to.and_time(NaiveTime::MIN)),
        None => now,
    };
    SearchWindow::new(start, end).context("invalid date window")
}
