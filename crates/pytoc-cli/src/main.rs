use std::env;
use std::fs;
use std::process::ExitCode;

use pytoc::options::CompileOptions;

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    let mut input_path = None;
    let mut output_path = None;
    let mut options = CompileOptions::default();
    let mut verbose = false;

    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-o" | "--output" => output_path = iter.next().cloned(),
            "--debug-asserts" => options.debug_asserts = true,
            "-v" | "--verbose" => verbose = true,
            "--module-name" => {
                if let Some(name) = iter.next() {
                    options.module_name = name.clone();
                }
            }
            other if input_path.is_none() => input_path = Some(other.to_owned()),
            other => {
                eprintln!("error: unrecognized argument `{other}`");
                return ExitCode::FAILURE;
            }
        }
    }

    init_tracing(verbose);

    let Some(input_path) = input_path else {
        eprintln!("usage: pytoc <input.py> [-o <output.c>] [--debug-asserts] [--module-name <name>] [-v]");
        return ExitCode::FAILURE;
    };

    let source = match read_file(&input_path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };

    let generated = match pytoc::compile_module(&source, &options) {
        Ok(c_text) => c_text,
        Err(err) => {
            eprintln!("error:\n{err}");
            return ExitCode::FAILURE;
        }
    };

    match output_path {
        Some(path) => {
            if let Err(err) = fs::write(&path, generated) {
                eprintln!("error writing {path}: {err}");
                return ExitCode::FAILURE;
            }
        }
        None => print!("{generated}"),
    }

    ExitCode::SUCCESS
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn read_file(file_path: &str) -> Result<String, String> {
    match fs::metadata(file_path) {
        Ok(metadata) => {
            if !metadata.is_file() {
                return Err(format!("{file_path} is not a file"));
            }
        }
        Err(err) => return Err(format!("reading {file_path}: {err}")),
    }
    fs::read_to_string(file_path).map_err(|err| format!("reading {file_path}: {err}"))
}
