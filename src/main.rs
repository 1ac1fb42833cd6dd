use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use config_sdk::analyzer::ModuleAnalyzer;
use config_sdk::report::ReportPrinter;

/// Static analyzer for front-end module trees
#[derive(Parser, Debug)]
#[command(name = "analyze-modules")]
#[command(about = "Scan a directory of modules and emit a JSON report with per-module issues and aggregate statistics")]
#[command(version)]
struct Cli {
    /// Directory containing the modules to analyze
    #[arg(default_value = "js/features")]
    features_dir: PathBuf,

    /// Where to write the JSON report
    #[arg(
        short = 'o',
        long = "output",
        default_value = "module-analysis-results.json"
    )]
    output: PathBuf,

    /// Suppress per-module output, print only the summary
    #[arg(short = 'q', long = "quiet")]
    quiet: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let printer = ReportPrinter::new();

    let analyzer = ModuleAnalyzer::new(&cli.features_dir);
    let report = analyzer.run();

    if report.total_modules == 0 {
        eprintln!("No modules found in {}", cli.features_dir.display());
    } else if !cli.quiet {
        println!("Found {} modules:", report.total_modules);
        for module in &report.modules {
            println!("{}", printer.format_module_line(module));
        }
        println!();
    }

    print!("{}", printer.format_summary(&report.summary));

    let json = serde_json::to_string_pretty(&report).context("failed to serialize report")?;
    fs::write(&cli.output, json)
        .with_context(|| format!("failed to write report to {}", cli.output.display()))?;
    println!("\nReport written to {}", cli.output.display());

    Ok(())
}
