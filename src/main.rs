use std::io::Read;

use clap::Parser;

use ersql::{CompileError, CompileOptions};

#[derive(Parser)]
#[command(name = "ersql", about = "Validate ER graphs and compile them into SQL DDL")]
struct Cli {
    /// Input file, `erGraph` text or JSON snapshot (reads from stdin if not provided)
    file: Option<std::path::PathBuf>,

    /// Only validate; do not emit SQL
    #[arg(long)]
    check: bool,

    /// Omit the comment header from the generated SQL
    #[arg(long)]
    no_header: bool,

    /// Treat warnings as blocking
    #[arg(long)]
    deny_warnings: bool,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let input = match &cli.file {
        Some(path) => std::fs::read_to_string(path).unwrap_or_else(|e| {
            eprintln!("ERROR: failed to read {}: {e}", path.display());
            std::process::exit(1);
        }),
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf).unwrap_or_else(|e| {
                eprintln!("ERROR: failed to read stdin: {e}");
                std::process::exit(1);
            });
            buf
        }
    };

    let graph = ersql::load(&input).unwrap_or_else(|e| {
        eprintln!("ERROR: {e}");
        std::process::exit(1);
    });

    if cli.check {
        let diagnostics = ersql::validate(&graph);
        eprint!("{}", ersql::report::render_diagnostics(&diagnostics));
        eprintln!("{}", ersql::report::summary(&diagnostics));
        let blocked = diagnostics.iter().any(|d| {
            d.is_error() || (cli.deny_warnings && d.severity == ersql::Severity::Warning)
        });
        if blocked {
            std::process::exit(1);
        }
        return;
    }

    let options = CompileOptions {
        header: !cli.no_header,
        deny_warnings: cli.deny_warnings,
    };
    match ersql::compile_with_options(&graph, &options) {
        Ok(sql) => {
            let diagnostics = ersql::validate(&graph);
            if !diagnostics.is_empty() {
                eprint!("{}", ersql::report::render_diagnostics(&diagnostics));
            }
            print!("{sql}");
        }
        Err(CompileError::Invalid(diagnostics)) => {
            eprint!("{}", ersql::report::render_diagnostics(&diagnostics));
            eprintln!("ERROR: {}", ersql::report::summary(&diagnostics));
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("ERROR: {e}");
            std::process::exit(1);
        }
    }
}
