//! Open Fetch CLI
//!
//! Command-line interface for shaping and sending OpenAPI client requests.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use open_fetch::{
    load_config, parse_header_line, Accept, BaseConfig, Body, HttpMethod, OpenFetchClient,
    PathValue, RequestConfig, ReqwestTransport,
};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "open-fetch")]
#[command(about = "Shape and send requests for OpenAPI path templates")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the request a template would produce, without sending it
    Resolve {
        #[command(flatten)]
        request: RequestArgs,
    },

    /// Send a request and print the response body
    Request {
        #[command(flatten)]
        request: RequestArgs,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Pretty-print JSON response bodies
        #[arg(long)]
        pretty: bool,
    },
}

#[derive(Args)]
struct RequestArgs {
    /// URL template, e.g. /pet/{petId}
    template: String,

    /// Client configuration file (JSON)
    #[arg(long, requires = "client")]
    config: Option<PathBuf>,

    /// Named client from the configuration file
    #[arg(long, requires = "config")]
    client: Option<String>,

    /// Base URL (overrides the client's)
    #[arg(long)]
    base_url: Option<String>,

    /// HTTP method (get, post, put, ...)
    #[arg(long, short = 'X')]
    method: Option<String>,

    /// Path parameter as name=value (repeatable)
    #[arg(long = "path", value_name = "NAME=VALUE")]
    path: Vec<String>,

    /// Query parameter as name=value (repeatable)
    #[arg(long = "query", value_name = "NAME=VALUE")]
    query: Vec<String>,

    /// Header as 'Name: value' (repeatable)
    #[arg(long = "header", short = 'H', value_name = "HEADER")]
    headers: Vec<String>,

    /// Accepted response media type (repeatable)
    #[arg(long)]
    accept: Vec<String>,

    /// JSON request body
    #[arg(long)]
    body: Option<String>,

    /// Request timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Retries for failed requests
    #[arg(long)]
    retry: Option<u32>,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Resolve { request } => run_resolve(request),
        Commands::Request {
            request,
            output,
            pretty,
        } => run_request(request, output, pretty).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

fn run_resolve(args: RequestArgs) -> Result<(), u8> {
    let client = build_client(&args)?;
    let call = call_config(&args)?;

    let prepared = client.prepare(&args.template, Some(call)).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    let headers: serde_json::Map<String, Value> = prepared
        .options
        .headers
        .iter()
        .map(|(name, value)| {
            (
                name.to_string(),
                Value::String(String::from_utf8_lossy(value.as_bytes()).into_owned()),
            )
        })
        .collect();

    let output = serde_json::json!({
        "url": prepared.url,
        "method": prepared.options.method_or_default().as_str(),
        "baseURL": prepared.options.base_url,
        "headers": headers,
        "query": prepared.options.query,
        "body": prepared.options.body.as_ref().map(Body::to_text),
        "transport": format!("{:?}", client.transport_for(&args.template, &prepared)).to_lowercase(),
    });

    let rendered = serde_json::to_string_pretty(&output).map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;
    println!("{}", rendered);
    Ok(())
}

async fn run_request(args: RequestArgs, output: Option<PathBuf>, pretty: bool) -> Result<(), u8> {
    let client = build_client(&args)?;
    let call = call_config(&args)?;

    let response = client.fetch(&args.template, Some(call)).await.map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    let rendered = if pretty {
        match response.json::<Value>() {
            Ok(value) => serde_json::to_string_pretty(&value).unwrap_or_else(|_| response.text()),
            Err(_) => response.text(),
        }
    } else {
        response.text()
    };

    match output {
        Some(path) => {
            std::fs::write(&path, &rendered).map_err(|e| {
                eprintln!("Error writing to {}: {}", path.display(), e);
                3u8
            })?;
        }
        None => {
            println!("{}", rendered);
        }
    }

    Ok(())
}

fn build_client(args: &RequestArgs) -> Result<OpenFetchClient, u8> {
    let transport = ReqwestTransport::new().map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    match (&args.config, &args.client) {
        (Some(config_path), Some(name)) => {
            let config = load_config(config_path).map_err(|e| {
                eprintln!("Error: {}", e);
                e.exit_code() as u8
            })?;
            OpenFetchClient::from_config(&config, name, Arc::new(transport)).map_err(|e| {
                eprintln!("Error: {}", e);
                e.exit_code() as u8
            })
        }
        _ => Ok(OpenFetchClient::new(BaseConfig::default(), Arc::new(transport))),
    }
}

/// Per-call overrides from command-line flags.
fn call_config(args: &RequestArgs) -> Result<RequestConfig, u8> {
    let mut call = RequestConfig::new();

    if let Some(base_url) = &args.base_url {
        call = call.base_url(base_url);
    }

    if let Some(method) = &args.method {
        let parsed = HttpMethod::parse(method).ok_or_else(|| {
            eprintln!("Error: unknown method \"{}\"", method);
            2u8
        })?;
        call = call.method(parsed);
    }

    for pair in &args.path {
        let (name, value) = split_pair(pair)?;
        call = call.path_param(name, PathValue::from(value));
    }

    for pair in &args.query {
        let (name, value) = split_pair(pair)?;
        call = call.query_param(name, value);
    }

    if !args.headers.is_empty() {
        let pairs = args
            .headers
            .iter()
            .map(|line| parse_header_line(line))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| {
                eprintln!("Error: {}", e);
                e.exit_code() as u8
            })?;
        call = call.headers(pairs);
    }

    match args.accept.as_slice() {
        [] => {}
        [single] => call = call.accept(single.as_str()),
        many => call = call.accept(Accept::Many(many.to_vec())),
    }

    if let Some(body) = &args.body {
        let value: Value = serde_json::from_str(body).map_err(|e| {
            eprintln!("Error: invalid JSON body: {}", e);
            2u8
        })?;
        call = call.body(Body::Json(value));
    }

    if let Some(ms) = args.timeout_ms {
        call = call.timeout(Duration::from_millis(ms));
    }

    if let Some(retry) = args.retry {
        call = call.retry(retry);
    }

    Ok(call)
}

fn split_pair(pair: &str) -> Result<(&str, &str), u8> {
    pair.split_once('=').ok_or_else(|| {
        eprintln!("Error: expected NAME=VALUE, got \"{}\"", pair);
        2u8
    })
}
