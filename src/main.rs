use callexpr::{CommandTable, Registry};
use clap::Parser;
use miette::{IntoDiagnostic, WrapErr};
use rustyline::{DefaultEditor, error::ReadlineError};

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Evaluate call expressions such as `(add 1 (mul 2 3))`",
    long_about = "Interprets expressions of the form '(<command> {arg}*)', resolves each \
                  command against the built-in command table by name and argument kinds, \
                  and prints the result. Arguments are integers, floats, \"strings\" or \
                  nested calls."
)]
struct Args {
    /// Print the cause of failures and a detailed report
    #[arg(short, long)]
    verbose: bool,

    /// Evaluate an expression and exit instead of starting the shell
    #[arg(short, long = "eval", value_name = "EXPR")]
    eval: Vec<String>,

    /// List the known commands and exit
    #[arg(long)]
    list: bool,
}

fn main() -> miette::Result<()> {
    init_tracing();
    let args = Args::parse();
    let registry = CommandTable::builtin();

    if args.list {
        list(&registry);
        return Ok(());
    }

    if !args.eval.is_empty() {
        let mut failed = false;
        for expr in &args.eval {
            failed |= !run_line(expr, &registry, args.verbose);
        }
        if failed {
            std::process::exit(1);
        }
        return Ok(());
    }

    repl(&registry, args.verbose)
}

/// Only installs a subscriber when `RUST_LOG` is set, so regular output is
/// never interleaved with logs.
fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_level(true),
            )
            .with(EnvFilter::from_default_env())
            .init();
    }
}

fn repl(registry: &CommandTable, mut verbose: bool) -> miette::Result<()> {
    let mut editor = DefaultEditor::new()
        .into_diagnostic()
        .wrap_err("starting the line editor failed")?;

    print_startup();
    loop {
        let line = match editor.readline("> ") {
            Ok(line) => line,
            Err(ReadlineError::Eof | ReadlineError::Interrupted) => break,
            Err(e) => {
                return Err(e).into_diagnostic().wrap_err("reading input failed");
            }
        };
        if !line.trim().is_empty() {
            editor
                .add_history_entry(line.as_str())
                .into_diagnostic()
                .wrap_err("recording history failed")?;
        }

        match line.trim() {
            "q" => {
                println!("bye.");
                break;
            }
            "v" => {
                verbose = !verbose;
                println!("Verbose {}.", if verbose { "on" } else { "off" });
            }
            "f" => list(registry),
            "?" => print_startup(),
            "" => {}
            _ => {
                run_line(&line, registry, verbose);
            }
        }
    }
    Ok(())
}

/// Evaluates one line and prints its value or its diagnostic. Returns whether
/// it succeeded.
fn run_line(line: &str, registry: &CommandTable, verbose: bool) -> bool {
    match callexpr::evaluate(line, registry) {
        Ok(literal) => {
            println!("{literal}");
            true
        }
        Err(e) => {
            println!("{}", e.report());
            if verbose {
                eprintln!("{:?}", miette::Report::new(e));
            }
            false
        }
    }
}

fn list(registry: &CommandTable) {
    for command in registry.commands() {
        println!("{command}");
    }
}

fn print_startup() {
    println!("q           : Quit the program.");
    println!("v           : Toggle verbose mode (detailed error reports).");
    println!("f           : List all known functions.");
    println!("?           : Print this helpful text.");
    println!("<expression>: Evaluate the expression.");
    println!(
        "Expressions can be integers, floats, strings (surrounded in double quotes) or function"
    );
    println!("calls of the form '(identifier {{expression}}*)'.");
}
