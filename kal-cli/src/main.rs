use clap::Parser;
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(name = "kalc")]
#[command(about = "An AOT compiler front-end for the Kaleidoscope language")]
struct Args {
    /// Path to the source file to compile
    file: PathBuf,

    /// Emit the IR module to stdout after compilation
    #[arg(long)]
    emit_ir: bool,
}

fn main() {
    let args = Args::parse();

    let source = kal_compiler::preprocess::expand(&args.file).unwrap_or_else(|e| {
        eprintln!("Error reading '{}': {}", args.file.display(), e);
        process::exit(1);
    });

    let output = kal_compiler::compile(&source);

    // Per-form problems are reported but never end the session; the driver
    // has already moved on to the remaining forms.
    for error in &output.diagnostics {
        eprintln!("error: {error}");
    }
    for warning in &output.warnings {
        eprintln!("warning: {warning}");
    }

    if args.emit_ir {
        for line in output.module.to_lines() {
            println!("{line}");
        }
    }
}
