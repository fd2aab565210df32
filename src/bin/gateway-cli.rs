use std::path::PathBuf;

use clap::{Parser, Subcommand};
use definition_gateway::definition::DefinitionParser;
use serde_json::Value;

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Management CLI for the definition gateway", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse definition files offline and report each result
    Check {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// List the routes a running gateway has published
    Routes {
        #[arg(short, long, default_value = "http://localhost:8080")]
        url: String,

        #[arg(short, long, default_value = "help")]
        route: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Check { paths } => {
            if !check(&paths) {
                std::process::exit(1);
            }
        }
        Commands::Routes { url, route } => {
            let res = reqwest::Client::new()
                .get(format!("{}/{}", url.trim_end_matches('/'), route.trim_start_matches('/')))
                .send()
                .await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

/// Returns whether every file parsed.
fn check(paths: &[PathBuf]) -> bool {
    let parser = DefinitionParser::new();
    let mut all_ok = true;

    for path in paths {
        let result = std::fs::read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|text| parser.parse_str(&text).map_err(|e| e.to_string()));
        match result {
            Ok(definition) => println!(
                "ok     {}  {} {} ({})",
                path.display(),
                definition.method.to_uppercase(),
                definition.route_template,
                definition.provider.kind()
            ),
            Err(e) => {
                all_ok = false;
                println!("error  {}  {}", path.display(), e);
            }
        }
    }
    all_ok
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: gateway returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    let routes = json.get("response").unwrap_or(&json);
    println!("{}", serde_json::to_string_pretty(routes)?);
    Ok(())
}
