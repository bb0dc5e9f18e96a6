use std::path::PathBuf;

use clap::Parser;
use triage::{Source, run};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Free-text description of the symptoms
    symptoms: String,

    /// JSON file holding the doctor roster
    #[arg(long, conflicts_with = "api_url", required_unless_present = "api_url")]
    roster: Option<PathBuf>,

    /// Upstream API base URL, including the /api prefix
    #[arg(long, requires = "token")]
    api_url: Option<String>,

    /// Bearer token for the upstream API
    #[arg(long)]
    token: Option<String>,

    /// Print the response body as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let source = match (args.roster, args.api_url, args.token) {
        (Some(path), _, _) => Source::File(path),
        (None, Some(api_url), Some(token)) => Source::Remote { api_url, token },
        _ => anyhow::bail!("Either --roster or --api-url with --token is required"),
    };

    println!("{}", run(&args.symptoms, source, args.json).await?);

    Ok(())
}
