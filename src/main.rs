//! fragua CLI — declarative service schemas to Java sources.

use clap::Parser;

fn main() {
    let cli = fragua::cli::Cli::parse();
    if let Err(e) = fragua::cli::dispatch(cli.command) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
