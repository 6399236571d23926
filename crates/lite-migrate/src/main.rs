//! lite-migrate CLI
//!
//! Plans SQLite migrations from JSON operation batches and model snapshots.

use std::io::Write;
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use lite_migrate::prelude::*;
use lite_migrate::snapshot::{load_operations, load_schema, save_schema};

/// SQLite migration planner.
#[derive(Parser)]
#[command(name = "lite-migrate")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Plan a batch of operations against the target model.
    Plan {
        /// JSON file with the operation batch.
        #[arg(short, long)]
        operations: PathBuf,

        /// JSON snapshot of the target model.
        #[arg(short, long, env = "LITE_MIGRATE_MODEL")]
        model: PathBuf,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Diff two model snapshots and plan the result.
    Diff {
        /// JSON snapshot of the current model (empty model if omitted).
        #[arg(short, long)]
        from: Option<PathBuf>,

        /// JSON snapshot of the target model.
        #[arg(short, long, env = "LITE_MIGRATE_MODEL")]
        to: PathBuf,

        /// Write the target model here once planning succeeds, as the next `--from`.
        #[arg(long)]
        save_model: Option<PathBuf>,

        #[command(flatten)]
        output: OutputArgs,
    },
}

#[derive(clap::Args)]
struct OutputArgs {
    /// Output format.
    #[arg(long, value_enum, default_value_t = Format::Sql)]
    format: Format,

    /// Do not fail when the model already has a `<table>_new` table.
    #[arg(long)]
    no_collision_check: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Sql,
    Json,
}

impl OutputArgs {
    fn planner(&self) -> MigrationPlanner<SqliteDialect> {
        let mut options = PlannerOptions::new();
        if self.no_collision_check {
            options = options.without_collision_check();
        }
        MigrationPlanner::with_options(SqliteDialect::new(), Autodetector::new(), options)
    }
}

fn render_sql(statements: &[MigrationStatement]) -> String {
    let mut out = String::new();
    for statement in statements {
        if statement.suppress_transaction {
            out.push_str("-- outside transaction\n");
        }
        out.push_str(&statement.terminated());
        out.push_str("\n\n");
    }
    out
}

fn write_output(statements: &[MigrationStatement], format: Format) -> anyhow::Result<()> {
    let rendered = match format {
        Format::Sql => render_sql(statements),
        Format::Json => format!("{}\n", serde_json::to_string_pretty(statements)?),
    };
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(rendered.as_bytes())?;
    stdout.flush()?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout carries only the migration.
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Plan {
            operations,
            model,
            output,
        } => {
            let batch = load_operations(&operations)?;
            let model = load_schema(&model)?;

            let statements = output.planner().generate(&batch, &model)?;
            info!(
                operations = batch.len(),
                statements = statements.len(),
                "Planned migration"
            );
            write_output(&statements, output.format)?;
        }

        Commands::Diff {
            from,
            to,
            save_model,
            output,
        } => {
            let current = from.as_ref().map(load_schema).transpose()?;
            let target = load_schema(&to)?;

            let batch = Autodetector::new().diff(current.as_ref(), &target);
            info!(operations = batch.len(), "Detected model changes");
            if batch.is_empty() {
                info!("No changes detected.");
            }

            let statements = output.planner().generate(&batch, &target)?;
            write_output(&statements, output.format)?;

            if let Some(path) = save_model {
                save_schema(&path, &target)?;
                info!(path = %path.display(), "Saved model snapshot");
            }
        }
    }

    Ok(())
}
