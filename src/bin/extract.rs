use std::{path::PathBuf, process::ExitCode};

use clap::Parser;
use tracing_subscriber::EnvFilter;

use contas::Extractor;

/// Extract the text or the transactions of a bank statement PDF.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// The statement layout, e.g. nubank_extrato.
    extractor: String,

    /// File path to the statement PDF.
    file_path: PathBuf,

    /// Print the parsed transactions as JSON instead of the plain text.
    #[arg(long)]
    transactions: bool,

    /// The account ID to assign to the parsed transactions.
    #[arg(long, default_value_t = 0, requires = "transactions")]
    account_id: i64,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("contas=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match run(&args) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(error) => {
            eprintln!("Error: {error}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<String, String> {
    let extractor = Extractor::get(&args.extractor).ok_or_else(|| {
        let known: Vec<&str> = Extractor::ALL.iter().map(|extractor| extractor.key()).collect();
        format!(
            "unknown extractor \"{}\", expected one of: {}",
            args.extractor,
            known.join(", ")
        )
    })?;

    let text = extractor
        .extract_text(&args.file_path)
        .map_err(|error| error.to_string())?;

    if !args.transactions {
        return Ok(text);
    }

    let transactions = extractor
        .extract_transactions(&text, args.account_id)
        .map_err(|error| error.to_string())?;

    serde_json::to_string_pretty(&transactions).map_err(|error| error.to_string())
}
