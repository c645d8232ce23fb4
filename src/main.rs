use anyhow::Context;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use smallisp::{Config, Environment, Error, Reader, Value, eval, register_stdlib};
use std::env;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

const HISTORY_FILE: &str = ".smallisp_history";

fn global_env() -> Environment {
    let mut env = Environment::with_config(Config::from_env());
    register_stdlib(&mut env);
    env
}

/// Evaluate every form of `input`, printing each result on its own line.
/// Stops at the first error.
fn run<R: BufRead>(input: R) -> smallisp::Result<()> {
    let mut env = global_env();
    let max_depth = env.config().max_depth;
    for form in Reader::with_max_depth(input, max_depth) {
        let result = eval(&form?, &mut env)?;
        println!("{result}");
    }
    Ok(())
}

fn run_path(path: &str) -> anyhow::Result<()> {
    if path == "-" {
        return Ok(run(io::stdin().lock())?);
    }
    let file = File::open(path).with_context(|| format!("failed to open '{path}'"))?;
    Ok(run(BufReader::new(file))?)
}

fn history_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(HISTORY_FILE))
}

fn repl() -> anyhow::Result<()> {
    let mut env = global_env();
    let mut rl = DefaultEditor::new()?;
    let history = history_path();
    if let Some(path) = &history {
        let _ = rl.load_history(path);
    }

    println!("smallisp REPL");
    println!("Type expressions to evaluate, Ctrl-D to quit");
    println!();

    // Holds the lines of a form that is still missing its closing paren.
    let mut pending = String::new();
    loop {
        let prompt = if pending.is_empty() { "> " } else { ". " };
        let line = match rl.readline(prompt) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                pending.clear();
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => return Err(err.into()),
        };
        if pending.is_empty() && line.trim().is_empty() {
            continue;
        }
        let _ = rl.add_history_entry(line.as_str());
        pending.push_str(&line);
        pending.push('\n');

        let reader = Reader::with_max_depth(pending.as_bytes(), env.config().max_depth);
        let forms = match reader.collect::<smallisp::Result<Vec<Value>>>() {
            Ok(forms) => forms,
            Err(Error::UnterminatedList) => continue,
            Err(e) => {
                eprintln!("error: {e}");
                pending.clear();
                continue;
            }
        };
        pending.clear();

        // Unlike file mode, an error only abandons the current input.
        for form in forms {
            match eval(&form, &mut env) {
                Ok(result) => println!("{result}"),
                Err(e) => {
                    eprintln!("error: {e}");
                    break;
                }
            }
        }
    }

    if let Some(path) = &history {
        let _ = rl.save_history(path);
    }
    Ok(())
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  smallisp              Start interactive REPL");
    eprintln!("  smallisp <file.lisp>  Run a Lisp file, printing each result");
    eprintln!("  smallisp -            Run a program read from stdin");
    eprintln!("  smallisp --help       Show this help message");
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let args: Vec<String> = env::args().collect();

    match args.as_slice() {
        [_] => repl(),
        [_, flag] if flag == "--help" || flag == "-h" => {
            print_usage();
            Ok(())
        }
        [_, path] => {
            if let Err(e) = run_path(path) {
                eprintln!("error: {e:#}");
                process::exit(1);
            }
            Ok(())
        }
        _ => {
            eprintln!("Error: Too many arguments");
            print_usage();
            process::exit(1);
        }
    }
}
