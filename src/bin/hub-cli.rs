use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;

use hub_auth::config::ClientConfig;
use hub_auth::HubAuthClient;

#[derive(Parser)]
#[command(name = "hub-cli")]
#[command(about = "Management CLI for the Hub authorization service", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8081")]
    url: String,

    /// Admin API key (`admin.api_key` in the Hub config)
    #[arg(short, long, env = "HUB_ADMIN_KEY", default_value = "")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check Hub status
    Status,
    /// List instances and their token generations
    Instances,
    /// Issue a fresh API token for an instance, retiring the old one
    Issue { instance_id: String },
    /// Revoke every API token of an instance
    Revoke { instance_id: String },
    /// Validate a session cookie the way a single-user server would
    Check {
        cookie: String,
        /// API token of the instance asking
        #[arg(short, long, env = "HUB_API_TOKEN")]
        token: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    match cli.command {
        Commands::Status => {
            let res = client.get(format!("{}/hub/api/status", cli.url))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Instances => {
            let res = client.get(format!("{}/hub/api/instances", cli.url))
                .headers(headers)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Issue { instance_id } => {
            let res = client.post(format!("{}/hub/api/instances/{}/token", cli.url, instance_id))
                .headers(headers)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Revoke { instance_id } => {
            let res = client.delete(format!("{}/hub/api/instances/{}/token", cli.url, instance_id))
                .headers(headers)
                .send()
                .await?;
            if res.status().is_success() {
                println!("Revoked tokens for {}", instance_id);
            } else {
                eprintln!("Error: Admin API returned status {}", res.status());
            }
        }
        Commands::Check { cookie, token } => {
            let config = ClientConfig {
                hub_api_url: format!("{}/hub/api", cli.url),
                api_token: token,
                cache_ttl_secs: 0,
                ..ClientConfig::default()
            };
            let hub = HubAuthClient::new(&config)?;
            match hub.validate(&cookie).await {
                Ok(user) => println!("{}", serde_json::to_string_pretty(&user)?),
                Err(e) => eprintln!("Error: {}", e),
            }
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: Hub API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
