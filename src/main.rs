// Entry point and CLI flow.
//
// Every command loads its tables from the data directory, runs one analytics
// operation and prints the result as pretty JSON (or writes it with --json).
// The leveling command also exports the flat CSV and prints a short preview.
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use so_analytics::config::{Config, Entity, DATA_DIR_ENV, DEFAULT_DATA_DIR};
use so_analytics::error::AppError;
use so_analytics::output;
use so_analytics::service::{parse_competency, parse_qualitative, AnalyticsService};
use so_analytics::stats::LOW_STOCK_THRESHOLD;
use so_analytics::store::read_table;
use so_analytics::types::{KpiOutcome, LevelingPreviewRow};
use so_analytics::util::format_int;

#[derive(Parser, Debug)]
#[command(name = "so-analytics")]
#[command(about = "Service order statistics and engineer KPI reports")]
#[command(version)]
struct Cli {
    /// Directory holding the CSV tables
    #[arg(long, env = DATA_DIR_ENV, default_value = DEFAULT_DATA_DIR)]
    data_dir: PathBuf,

    /// Write the JSON result to FILE instead of stdout
    #[arg(long, value_name = "FILE", global = true)]
    json: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Response / repair / resolution averages per engineer, month, region, area
    Engineers {
        /// Comma-separated month names, e.g. "April,May"
        #[arg(long)]
        months: Option<String>,
    },
    /// Engineer <-> customer coverage and single-engineer risk
    Relationships,
    /// Customers and service types per area group
    Areas,
    /// KPI sheet for one engineer
    Kpi {
        ce_id: String,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
        /// JSON object of tool flags, e.g. '{"SR":1,"EDC":1}'
        #[arg(long)]
        competency: Option<String>,
        /// JSON object of qualitative scores, e.g. '{"sop":90}'
        #[arg(long)]
        qualitative: Option<String>,
    },
    /// KPI sheet for every engineer in the SO data, exported as CSV
    Leveling {
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
        #[arg(long, value_name = "FILE", default_value = "leveling_report.csv")]
        output: PathBuf,
    },
    /// Summary counts for one table (engineers, machines, stock-parts)
    Stats { data_type: String },
    /// Stock parts below a quantity threshold, fewest first
    LowStock {
        #[arg(long, default_value_t = LOW_STOCK_THRESHOLD)]
        threshold: i64,
    },
    /// Stock parts held at one FSL
    Fsl { name: String },
    /// Bulk upsert a CSV file into one table (engineers, machines, stock-parts, service-orders)
    Import {
        data_type: String,
        file: PathBuf,
    },
}

fn emit<T: Serialize>(value: &T, json: Option<&PathBuf>) -> anyhow::Result<()> {
    match json {
        Some(path) => {
            output::write_json(path, value)
                .with_context(|| format!("writing {}", path.display()))?;
            println!("Result written to {}", path.display());
        }
        None => output::print_json(value)?,
    }
    Ok(())
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let svc = AnalyticsService::new(Config::new(&cli.data_dir));
    let json = cli.json.as_ref();

    match cli.command {
        Command::Engineers { months } => emit(&svc.engineer_stats(months.as_deref())?, json),
        Command::Relationships => emit(&svc.relationships()?, json),
        Command::Areas => emit(&svc.customer_intelligence()?, json),
        Command::Kpi {
            ce_id,
            start,
            end,
            competency,
            qualitative,
        } => {
            let competency = competency.as_deref().map(parse_competency).transpose()?;
            let qualitative = qualitative.as_deref().map(parse_qualitative).transpose()?;
            let outcome = svc.engineer_kpi(
                &ce_id,
                start.as_deref(),
                end.as_deref(),
                competency,
                qualitative,
            )?;
            if let KpiOutcome::NotFound { error } = &outcome {
                info!("{}", error);
            }
            emit(&outcome, json)
        }
        Command::Leveling {
            start,
            end,
            output: out_path,
        } => {
            let rows = svc.leveling(start.as_deref(), end.as_deref())?;
            output::write_csv(&out_path, &rows)
                .with_context(|| format!("writing {}", out_path.display()))?;
            let preview: Vec<LevelingPreviewRow> = rows.iter().map(Into::into).collect();
            output::preview_table_rows("Engineer Leveling Report", &preview, 5);
            println!(
                "({} engineers exported to {})",
                format_int(rows.len()),
                out_path.display()
            );
            if let Some(path) = json {
                emit(&rows, Some(path))?;
            }
            Ok(())
        }
        Command::Stats { data_type } => {
            let entity: Entity = data_type.parse()?;
            emit(&svc.statistics(entity)?, json)
        }
        Command::LowStock { threshold } => emit(&svc.low_stock_parts(threshold)?, json),
        Command::Fsl { name } => emit(&svc.parts_by_fsl(&name)?, json),
        Command::Import { data_type, file } => {
            let entity: Entity = data_type.parse()?;
            let table = read_table(&file)?;
            let count = svc.import(entity, table.rows)?;
            println!(
                "Successfully upserted {} {} rows",
                format_int(count),
                entity.label().to_lowercase()
            );
            Ok(())
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("so_analytics=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{:#}", err);
            let message = err
                .downcast_ref::<AppError>()
                .map(AppError::public_message)
                .unwrap_or_else(|| err.to_string());
            eprintln!("Error: {}", message);
            ExitCode::FAILURE
        }
    }
}
