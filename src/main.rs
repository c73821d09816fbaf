use clap::Parser;
use filesorter::output::OutputFormatter;
use filesorter::{Cli, logging, run};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match cli.into_run_config() {
        Ok(config) => config,
        Err(e) => {
            OutputFormatter::error(&e.to_string());
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = logging::init(config.verbose, &config.log_file) {
        OutputFormatter::error(&e.to_string());
        return ExitCode::FAILURE;
    }

    if config.dry_run {
        OutputFormatter::dry_run_notice("No files will be moved.");
    }
    OutputFormatter::info(&format!(
        "Sorting {} into {}",
        config.source.display(),
        config.target.display()
    ));

    let report = match run(&config) {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    OutputFormatter::summary(&report);

    if let Some(manifest) = &config.manifest {
        match report.save(manifest) {
            Ok(()) => OutputFormatter::success(&format!(
                "Manifest written to {}",
                manifest.display()
            )),
            Err(e) => tracing::error!("{}", e),
        }
    }

    ExitCode::SUCCESS
}
