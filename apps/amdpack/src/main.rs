use amdpack_bundle::{AnalysisOptions, AnalysisPass, BundleOutput, Config};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use log::{debug, info};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "amdpack")]
#[command(about = "Dependency analysis and preload bundling for AMD projects", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Analyze all module sources and print the dependency graph
    Graph(Config),
    /// Analyze all module sources and generate one bundle
    Bundle(Config),
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    // stdio is blocked by LineWriter, use a BufWriter to reduce syscalls.
    // See https://github.com/rust-lang/rust/issues/60673
    let mut stdout = BufWriter::new(std::io::stdout());

    let cli = Cli::parse();
    debug!("Parsed CLI arguments: {:?}", cli.command);

    let start = Instant::now();
    let num_threads = rayon::current_num_threads();

    let (mut cfg, bundling) = match cli.command {
        Commands::Graph(cfg) => (cfg, false),
        Commands::Bundle(cfg) => (cfg, true),
    };
    cfg.initialize()?;
    let request = if bundling { Some(cfg.bundle_request()?) } else { None };

    let pool = cfg.load_pool().await?;
    info!("Running analysis pass (using {} threads)", num_threads);
    let pass = amdpack_bundle::run_analysis_pass(&pool, &AnalysisOptions::default()).await?;

    let output = match &request {
        Some(request) => {
            let output = amdpack_bundle::generate(&pass.graph, &pool, request).await?;
            if let Some(out) = &cfg.out {
                write_artifacts(out, &output).await?;
            }
            Some(output)
        }
        None => None,
    };

    if cfg.json {
        amdpack_bundle::write_json_summary(&mut stdout, &pass, output.as_ref())?;
    } else {
        report(&mut stdout, &pass, output.as_ref(), &cfg)?;
        writeln!(
            stdout,
            "\n{} Finished in {}ms on {} resources (using {} threads).",
            "●".bright_blue(),
            start.elapsed().as_millis().to_string().cyan(),
            pass.resources_analyzed.to_string().cyan(),
            num_threads.to_string().cyan()
        )?;
    }
    stdout.flush()?;

    if !pass.diagnostics.is_empty() {
        // Non-zero exit to fail CI
        std::process::exit(1);
    }
    Ok(())
}

fn report<W: Write>(
    writer: &mut W,
    pass: &AnalysisPass,
    output: Option<&BundleOutput>,
    cfg: &Config,
) -> Result<()> {
    match output {
        Some(output) => amdpack_bundle::print_bundle_summary(writer, output, cfg.out.as_deref())?,
        None => amdpack_bundle::print_graph_summary(writer, pass)?,
    }
    amdpack_bundle::print_diagnostics(writer, &pass.diagnostics)?;
    Ok(())
}

async fn write_artifacts(out: &Path, output: &BundleOutput) -> Result<()> {
    for artifact in &output.artifacts {
        let target = out.join(&artifact.path);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        tokio::fs::write(&target, &artifact.content)
            .await
            .with_context(|| format!("Failed to write {}", target.display()))?;
        debug!("Wrote {}", target.display());
    }
    Ok(())
}
