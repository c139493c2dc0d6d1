use clap::Parser;
use rinha_interpreter::language::loader;
use rinha_interpreter::runtime::{Builder, Evaluator};
use rinha_interpreter::tools::diagnostics;
use std::io;
use std::path::PathBuf;
use std::time::Instant;

const DEFAULT_SOURCE: &str = "/var/rinha/source.rinha.json";

#[derive(Debug, Parser)]
#[command(
    name = "rinha-interpreter",
    version,
    about = "Tree-walking interpreter for pre-parsed rinha ASTs"
)]
struct Cli {
    /// A .rinha source file or a pre-parsed .json AST
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,
    /// Pass the literal `time` to print elapsed wall time after the run
    #[arg(value_name = "TIME")]
    mode: Option<String>,
}

fn main() {
    let cli = Cli::parse();
    let path = cli
        .file
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SOURCE));
    let timed = cli.mode.as_deref() == Some("time");

    let loaded = match loader::load(&path) {
        Ok(loaded) => loaded,
        Err(error) => {
            diagnostics::report_load_error(error);
            std::process::exit(1);
        }
    };
    let program = Builder::build(&loaded.ast);

    let started = Instant::now();
    let result = {
        let stdout = io::stdout();
        let mut evaluator = Evaluator::new(&program, stdout.lock());
        evaluator.run()
    };
    match result {
        Ok(_) => {
            if timed {
                println!("\ntime: {:.6} secs\n", started.elapsed().as_secs_f64());
            }
        }
        Err(error) => {
            diagnostics::report_runtime_error(
                loaded.source.as_deref(),
                program.site(error.site),
                &error.kind.to_string(),
            );
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod cli_tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn no_arguments_falls_back_to_the_default_path() {
        let cli = Cli::parse_from(["rinha-interpreter"]);
        assert!(cli.file.is_none());
        assert!(cli.mode.is_none());
    }

    #[test]
    fn accepts_a_file_and_the_time_marker() {
        let cli = Cli::parse_from(["rinha-interpreter", "demo.json", "time"]);
        assert_eq!(cli.file.as_deref(), Some(Path::new("demo.json")));
        assert_eq!(cli.mode.as_deref(), Some("time"));
    }
}
