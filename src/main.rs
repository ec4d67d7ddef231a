use clap::Parser;

fn main() {
    // Load .env file if present (for development convenience)
    // Silently ignore if not found - production uses system env vars
    let _ = dotenvy::dotenv();

    let cli = app_lib::cli::Cli::parse();
    std::process::exit(app_lib::run(cli));
}
