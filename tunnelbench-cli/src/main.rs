//! `tunnelbench` binary entry point.

fn main() {
    if let Err(error) = tunnelbench_cli::run() {
        eprintln!("error: {error:#}");
        std::process::exit(1);
    }
}
