#[cfg(feature = "cli")]
use clap::Parser;

#[cfg(feature = "cli")]
#[derive(Parser)]
#[command(
    name = "asyncapi2components",
    about = "Normalize a bundled AsyncAPI document: hoist schemas into components and rewrite references"
)]
struct Cli {
    /// Path to the bundled AsyncAPI document (YAML or JSON)
    #[arg(value_name = "INPUT")]
    input: String,

    /// Path to the normalized output file
    #[arg(value_name = "OUTPUT")]
    output: String,

    /// Emit JSON regardless of the output extension
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[cfg(feature = "cli")]
fn main() {
    let cli = Cli::parse();

    if let Err(e) = asyncapi2components::normalize_file(&cli.input, &cli.output, cli.json) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("This binary is only available with the `cli` feature enabled.");
    std::process::exit(1);
}
