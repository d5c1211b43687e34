//! Command-line interface for annotated matrix pipelines.

use clap::{Parser, Subcommand};
use perseus_plugins::error::Result;
use perseus_plugins::io::{write_grouping_template, write_matrix, LoadOptions, TabularLoader};
use perseus_plugins::pipeline::{example_config, Pipeline, PipelineConfig};
use perseus_plugins::progress::ProcessInfo;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "perseus")]
#[command(author, version, about = "Annotated matrix tools for proteomics tables", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize a matrix file
    Summary {
        /// Path to the matrix file
        #[arg(short, long)]
        input: PathBuf,

        /// Output format: text or json
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Run a pipeline from a YAML configuration
    Run {
        /// Path to pipeline YAML config
        #[arg(short, long)]
        config: PathBuf,

        /// Path to the input matrix
        #[arg(short, long)]
        input: PathBuf,

        /// Output path for the resulting matrix
        #[arg(short, long)]
        output: PathBuf,

        /// Maximum worker threads (0 uses all cores)
        #[arg(long, default_value = "0")]
        threads: usize,
    },

    /// Write a grouping template for the expression columns
    Template {
        /// Path to the matrix file
        #[arg(short, long)]
        input: PathBuf,

        /// Output path for the template
        #[arg(short, long)]
        output: PathBuf,

        /// Name of the grouping
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Generate an example pipeline config
    Example {
        /// Output path for YAML config
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Summary { input, format } => cmd_summary(&input, &format),
        Commands::Run {
            config,
            input,
            output,
            threads,
        } => cmd_run(&config, &input, &output, threads),
        Commands::Template {
            input,
            output,
            name,
        } => cmd_template(&input, &output, name.as_deref()),
        Commands::Example { output } => cmd_example(&output),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn console_info(threads: usize) -> ProcessInfo {
    ProcessInfo::new()
        .with_status(|text| eprintln!("{}", text))
        .with_max_threads(threads)
}

/// Print the shape of a matrix file
fn cmd_summary(input: &Path, format: &str) -> Result<()> {
    let loader = TabularLoader::new(LoadOptions::default());
    let matrix = loader.load_inferred(input, &mut ProcessInfo::new())?;
    let summary = matrix.summary();

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&summary)?),
        _ => print!("{}", summary),
    }
    Ok(())
}

/// Path next to `output` with `suffix` replacing the extension.
fn sibling(output: &Path, suffix: &str) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    output.with_file_name(format!("{}.{}", stem, suffix))
}

/// Run a pipeline from configuration
fn cmd_run(config_path: &Path, input: &Path, output: &Path, threads: usize) -> Result<()> {
    eprintln!("Loading pipeline configuration from {:?}...", config_path);
    let config_str = std::fs::read_to_string(config_path)?;
    let config = PipelineConfig::from_yaml(&config_str)?;

    eprintln!("Loading matrix...");
    let mut info = console_info(threads);
    let loader = TabularLoader::new(config.load.clone());
    let matrix = loader.load_inferred(input, &mut info)?;
    eprintln!(
        "Loaded {} rows x {} expression columns",
        matrix.row_count(),
        matrix.expression_column_count()
    );

    eprintln!("Running pipeline '{}'...", config.name);
    let results = Pipeline::from_config(&config).run(&matrix, &mut info)?;

    eprintln!("Writing results to {:?}...", output);
    write_matrix(&results.matrix, output)?;
    for (i, table) in results.supplementary_tables.iter().enumerate() {
        let path = sibling(output, &format!("suppl{}.txt", i + 1));
        write_matrix(table, &path)?;
        eprintln!("  supplementary table {:?}", path);
    }
    for (i, document) in results.documents.iter().enumerate() {
        let path = sibling(output, &format!("{}.doc.txt", i + 1));
        std::fs::write(&path, format!("{}\n\n{}", document.title, document.text))?;
        eprintln!("  document {:?}", path);
    }

    eprintln!(
        "Done! {} rows x {} expression columns",
        results.matrix.row_count(),
        results.matrix.expression_column_count()
    );
    Ok(())
}

/// Write a grouping template
fn cmd_template(input: &Path, output: &Path, name: Option<&str>) -> Result<()> {
    let loader = TabularLoader::new(LoadOptions::default());
    let matrix = loader.load_inferred(input, &mut ProcessInfo::new())?;
    write_grouping_template(&matrix, output, name)?;
    eprintln!(
        "Wrote template for {} columns to {:?}",
        matrix.expression_column_count(),
        output
    );
    Ok(())
}

/// Generate an example pipeline config
fn cmd_example(output_path: &Path) -> Result<()> {
    let yaml = example_config().to_yaml()?;

    std::fs::write(output_path, &yaml)?;
    eprintln!("Wrote example pipeline to {:?}", output_path);
    eprintln!();
    eprintln!("Contents:");
    println!("{}", yaml);

    Ok(())
}
