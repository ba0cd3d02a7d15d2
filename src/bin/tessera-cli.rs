//! Command line HTTP client over `tessera::Client`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tessera::{Client, ClientError, Method, Options};

#[derive(Parser)]
#[command(name = "tessera-cli")]
#[command(about = "Send HTTP requests from the command line", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a GET request
    Get(RequestArgs),
    /// Send a POST request
    Post(RequestArgs),
    /// Send a PUT request
    Put(RequestArgs),
    /// Send a PATCH request
    Patch(RequestArgs),
    /// Send a DELETE request
    Delete(RequestArgs),
}

#[derive(Args)]
struct RequestArgs {
    url: String,

    /// Header as `key:value`. Repeatable.
    #[arg(short = 'H', long = "header", value_parser = parse_header)]
    headers: Vec<(String, String)>,

    /// Query parameter as `key=value`. Repeatable.
    #[arg(short, long = "query", value_parser = parse_query)]
    query: Vec<(String, String)>,

    /// Request body.
    #[arg(short, long, conflicts_with = "data_file")]
    data: Option<String>,

    /// Read the request body from a file.
    #[arg(long)]
    data_file: Option<PathBuf>,
}

fn parse_header(raw: &str) -> Result<(String, String), String> {
    split_pair(raw, ':')
}

fn parse_query(raw: &str) -> Result<(String, String), String> {
    split_pair(raw, '=')
}

fn split_pair(raw: &str, separator: char) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once(separator)
        .ok_or_else(|| format!("expected key{separator}value, got {raw:?}"))?;
    Ok((key.trim().to_string(), value.trim().to_string()))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let (method, args) = match cli.command {
        Commands::Get(args) => (Method::Get, args),
        Commands::Post(args) => (Method::Post, args),
        Commands::Put(args) => (Method::Put, args),
        Commands::Patch(args) => (Method::Patch, args),
        Commands::Delete(args) => (Method::Delete, args),
    };

    let mut opts = Options {
        headers: args.headers,
        query_params: args.query,
        body: None,
    };
    if let Some(data) = args.data {
        opts = opts.body(data);
    } else if let Some(path) = args.data_file {
        opts = opts.body_reader(std::fs::File::open(path)?)?;
    }

    let client = Client::new();
    match client.request(method, args.url).options(&opts).send().await {
        Ok(res) => {
            eprintln!("{}", res.status());
            println!("{}", res.text().await?);
        }
        Err(ClientError::Request(err)) => {
            eprintln!("Error: {err}");
            println!("{}", err.text());
            std::process::exit(1);
        }
        Err(e) => return Err(e.into()),
    }

    Ok(())
}
