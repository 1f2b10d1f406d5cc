use anyhow::{Context, Result};
use clap::Parser;
use pivotchart::loader::UploadedFile;
use pivotchart::{graph, runtime, table, Aggregation, OutputFormat, RenderOptions, Session};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "pivotchart")]
#[command(about = "Build a pivot table and bar chart from CSV/Excel files", long_about = None)]
struct Args {
    /// Data files (.csv or .xlsx); multiple files must share the same columns
    files: Vec<PathBuf>,

    /// Columns to group by (repeat the flag or separate with commas)
    #[arg(short, long = "group-by", value_delimiter = ',')]
    group_by: Vec<String>,

    /// Column whose values are aggregated
    #[arg(short, long)]
    value: Option<String>,

    /// Aggregation: sum, count, mean or distinct-count (Soma, Contagem, Média, Contagem Distinta)
    #[arg(short, long, default_value = "sum")]
    agg: Aggregation,

    /// Chart x-axis column (defaults to the first group-by column)
    #[arg(short = 'x', long)]
    x_axis: Option<String>,

    /// Chart y-axis column (defaults to the value column)
    #[arg(short = 'y', long)]
    y_axis: Option<String>,

    /// Where to write the chart
    #[arg(short, long, default_value = "pivot_chart.png")]
    output: PathBuf,

    /// Chart format (inferred from the output extension when omitted)
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,

    #[arg(long, default_value_t = 800, value_parser = clap::value_parser!(u32).range(1..=graph::MAX_DIMENSION as i64))]
    width: u32,

    #[arg(long, default_value_t = 600, value_parser = clap::value_parser!(u32).range(1..=graph::MAX_DIMENSION as i64))]
    height: u32,

    /// Rows of loaded data to show
    #[arg(long, default_value_t = 20)]
    preview_rows: usize,

    /// Print the pivot table as JSON instead of a text table
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("PIVOTCHART_LOG")
                .unwrap_or_else(|_| EnvFilter::new("pivotchart=warn")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    if args.files.is_empty() {
        return Ok(());
    }

    // 1. Load and combine
    let mut uploads = Vec::with_capacity(args.files.len());
    for path in &args.files {
        match UploadedFile::from_path(path) {
            Ok(file) => uploads.push(file),
            Err(e) => eprintln!("Error: Failed to read '{}': {}", path.display(), e),
        }
    }

    let mut session = Session::new();
    for failure in session.upload(uploads) {
        eprintln!("Error: {}", failure);
    }

    let Some(combined) = session.combined() else {
        return Ok(());
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    writeln!(out, "Loaded data:")?;
    write!(out, "{}", table::render_table(combined, Some(args.preview_rows)))?;

    // 2. Configure the pivot
    session.select_group_by(args.group_by.clone())?;
    session.select_value(args.value.clone())?;
    session.select_aggregation(args.agg);
    session.select_axes(args.x_axis.clone(), args.y_axis.clone());

    // 3. Compute
    let Some(pivot) = session.pivot().context("Failed to compute pivot table")? else {
        writeln!(out)?;
        writeln!(
            out,
            "Available columns: {}",
            session.candidate_columns().join(", ")
        )?;
        writeln!(out, "Choose --group-by and --value to build a pivot table.")?;
        return Ok(());
    };

    writeln!(out)?;
    writeln!(out, "Pivot table ({}):", pivot.aggregation)?;
    if args.json {
        let json = serde_json::to_string_pretty(&pivot.to_json())
            .context("Failed to serialize pivot table")?;
        writeln!(out, "{}", json)?;
    } else {
        write!(out, "{}", table::render_table(&pivot.flatten(), None))?;
    }

    if pivot.is_empty() {
        eprintln!("Warning: pivot table is empty, no chart written");
        return Ok(());
    }

    // 4. Render the chart
    let chart = session.chart_spec(&pivot)?;
    let options = RenderOptions {
        width: args.width,
        height: args.height,
        format: args
            .format
            .unwrap_or_else(|| OutputFormat::from_path(&args.output)),
    };
    let bytes = runtime::render_pivot_chart(&pivot, &chart, &options)
        .context("Failed to render chart")?;

    std::fs::write(&args.output, bytes)
        .with_context(|| format!("Failed to write chart to '{}'", args.output.display()))?;
    out.flush().context("Failed to flush stdout")?;
    eprintln!("Chart written to {}", args.output.display());

    Ok(())
}
