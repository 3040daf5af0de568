//! roisplit CLI - Split ROI reports into Business and Media tables
//!
//! # Main Commands
//!
//! ```bash
//! roisplit convert report.xlsx -o out/      # Write ROI_Business.xlsx + ROI_Media.xlsx
//! roisplit serve                            # Start HTTP server (port 3000)
//! ```
//!
//! # Debug Commands
//!
//! ```bash
//! roisplit preview report.csv -n 5          # Print the first rows of both tables
//! roisplit inspect report.csv               # Show how every column was classified
//! roisplit example-config                   # Print the built-in config as JSON
//! ```

use clap::{Parser, Subcommand};
use roisplit::config::{port_from_env, ReshapeConfig, UndatedRows};
use roisplit::transform::pipeline::format_delimiter;
use roisplit::{
    convert_file, write_outputs, ColumnInfo, ConvertOptions, OutputFormat, OutputTable,
    Scalar, SourceInfo,
};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "roisplit")]
#[command(about = "Split ROI reports into Business and Media tables", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a report and write both tables
    Convert {
        /// Input report (.csv, .tsv, .xlsx, .xls, .ods)
        input: PathBuf,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// Output format: xlsx, csv or json
        #[arg(short, long, default_value = "xlsx")]
        format: String,

        /// Config JSON file (default: $ROISPLIT_CONFIG or built-in)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Drop rows whose date cannot be read
        #[arg(long)]
        drop_undated: bool,

        /// Value of the Product column
        #[arg(long)]
        product: Option<String>,
    },

    /// Print the first rows of both tables
    Preview {
        /// Input report
        input: PathBuf,

        /// Number of rows per table
        #[arg(short = 'n', long, default_value = "10")]
        rows: usize,

        /// Config JSON file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Show how every column of a report is classified
    Inspect {
        /// Input report
        input: PathBuf,

        /// Config JSON file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Show the built-in config
    ExampleConfig,

    /// Start HTTP server
    Serve {
        /// Port to listen on (default: $ROISPLIT_PORT or 3000)
        #[arg(short, long)]
        port: Option<u16>,

        /// Config JSON file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

type CliResult = Result<(), Box<dyn std::error::Error>>;

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Convert {
            input,
            output,
            format,
            config,
            drop_undated,
            product,
        } => cmd_convert(&input, &output, &format, config.as_deref(), drop_undated, product),

        Commands::Preview { input, rows, config } => cmd_preview(&input, rows, config.as_deref()),

        Commands::Inspect { input, config } => cmd_inspect(&input, config.as_deref()),

        Commands::ExampleConfig => cmd_example_config(),

        Commands::Serve { port, config } => cmd_serve(port, config.as_deref()).await,
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn load_options(config: Option<&Path>) -> Result<ConvertOptions, Box<dyn std::error::Error>> {
    Ok(ConvertOptions {
        config: ReshapeConfig::load(config)?,
        ..ConvertOptions::default()
    })
}

fn cmd_convert(
    input: &Path,
    output: &Path,
    format: &str,
    config: Option<&Path>,
    drop_undated: bool,
    product: Option<String>,
) -> CliResult {
    let format: OutputFormat = format.parse()?;
    let mut options = load_options(config)?;
    if drop_undated {
        options.config.undated_rows = UndatedRows::Drop;
    }
    if let Some(label) = product {
        options.config.product_label = label;
    }

    eprintln!("📄 Processing: {}", input.display());
    let conversion = convert_file(input, &options)?;
    print_source(&conversion.source);

    let paths = write_outputs(&conversion.output, output, format)?;
    for path in &paths {
        eprintln!("💾 Written: {}", path.display());
    }

    if !conversion.output.warnings.is_empty() {
        eprintln!("⚠️  {} warning(s)", conversion.output.warnings.len());
    }
    eprintln!("✨ Done!");
    Ok(())
}

fn cmd_preview(input: &Path, rows: usize, config: Option<&Path>) -> CliResult {
    let options = load_options(config)?;
    let conversion = convert_file(input, &options)?;
    let output = &conversion.output;

    println!("ROI_Business ({} rows)", output.business.row_count());
    println!("{}", render_table(&output.business.preview(rows)));
    println!("ROI_Media ({} rows)", output.media.row_count());
    println!("{}", render_table(&output.media.preview(rows)));
    Ok(())
}

fn cmd_inspect(input: &Path, config: Option<&Path>) -> CliResult {
    let options = load_options(config)?;
    let conversion = convert_file(input, &options)?;
    let output = &conversion.output;

    println!("{:>4}  {:<24} {:<28} {:<9} {:<12} METRIC", "COL", "GROUP", "FIELD", "ROLE", "CATEGORY");
    for column in &output.columns {
        println!("{}", render_column(column));
    }
    println!();
    println!("Categories: {}", output.categories.join(", "));
    for warning in &output.warnings {
        println!("⚠️  {}", warning);
    }
    Ok(())
}

fn cmd_example_config() -> CliResult {
    println!("{}", ReshapeConfig::default().to_json()?);
    Ok(())
}

async fn cmd_serve(port: Option<u16>, config: Option<&Path>) -> CliResult {
    let options = load_options(config)?;
    roisplit::server::start_server(port.unwrap_or_else(port_from_env), options).await
}

fn print_source(source: &SourceInfo) {
    if let Some(ref enc) = source.encoding {
        eprintln!("   Encoding: {}", enc);
    }
    if let Some(d) = source.delimiter {
        eprintln!("   Delimiter: '{}'", format_delimiter(d));
    }
    if let Some(ref sheet) = source.sheet {
        eprintln!("   Sheet: {}", sheet);
    }
    eprintln!("   Rows: {}", source.row_count);
}

fn render_column(column: &ColumnInfo) -> String {
    let (category, metric) = column
        .media
        .as_ref()
        .map(|m| (m.category.as_str(), m.metric.as_str()))
        .unwrap_or(("", ""));
    format!(
        "{:>4}  {:<24} {:<28} {:<9} {:<12} {}",
        column.index,
        truncate(&column.group_label, 24),
        truncate(&column.field_name, 28),
        column.role.to_string(),
        category,
        metric
    )
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", cut)
    }
}

/// Plain-text table with padded columns.
fn render_table(table: &OutputTable) -> String {
    let cells: Vec<Vec<String>> = table
        .rows()
        .iter()
        .map(|row| row.iter().map(render_scalar).collect())
        .collect();

    let widths: Vec<usize> = table
        .columns()
        .iter()
        .enumerate()
        .map(|(c, name)| {
            cells
                .iter()
                .map(|row| row[c].chars().count())
                .chain(std::iter::once(name.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let line = |values: &[String]| {
        values
            .iter()
            .zip(&widths)
            .map(|(v, w)| format!("{:<w$}", v, w = *w))
            .collect::<Vec<_>>()
            .join(" | ")
    };

    let mut out = vec![line(table.columns())];
    out.push(widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>().join("-+-"));
    out.extend(cells.iter().map(|row| line(row)));
    out.join("\n")
}

fn render_scalar(value: &Scalar) -> String {
    match value {
        Scalar::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
        other => other.to_text(),
    }
}
