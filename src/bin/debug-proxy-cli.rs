use clap::{Parser, Subcommand};
use futures_util::StreamExt;
use serde_json::Value;
use tokio_tungstenite::tungstenite::Message;

#[derive(Parser)]
#[command(name = "debug-proxy-cli")]
#[command(about = "Inspect traffic captured by the HTTP debugging proxy", long_about = None)]
struct Cli {
    /// Base URL of the proxy's web interface.
    #[arg(short, long, default_value = "http://localhost:8091")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List captured exchanges
    List {
        /// Case-insensitive URL substring
        #[arg(long)]
        url: Option<String>,
        /// HTTP method
        #[arg(long)]
        method: Option<String>,
        /// Exact status code
        #[arg(long)]
        status_code: Option<u16>,
    },
    /// Drop every captured exchange
    Clear,
    /// Show proxy status
    Status,
    /// Follow newly captured exchanges
    Tail,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let base = cli.url.trim_end_matches('/');
    let client = reqwest::Client::new();

    match cli.command {
        Commands::List {
            url,
            method,
            status_code,
        } => {
            let mut query: Vec<(&str, String)> = Vec::new();
            if let Some(url) = url {
                query.push(("url", url));
            }
            if let Some(method) = method {
                query.push(("method", method));
            }
            if let Some(status_code) = status_code {
                query.push(("status_code", status_code.to_string()));
            }
            let res = client
                .get(format!("{}/api/logs", base))
                .query(&query)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Clear => {
            let res = client
                .post(format!("{}/api/logs/clear", base))
                .send()
                .await?;
            let status = res.status();
            let text = res.text().await?;
            if status.is_success() {
                print!("{}", text);
            } else {
                eprintln!("Error: clear returned status {}: {}", status, text.trim());
            }
        }
        Commands::Status => {
            let res = client.get(format!("{}/api/status", base)).send().await?;
            print_response(res).await?;
        }
        Commands::Tail => tail(base).await?,
    }

    Ok(())
}

async fn tail(base: &str) -> Result<(), Box<dyn std::error::Error>> {
    let ws_url = format!("{}/api/ws", base.replacen("http", "ws", 1));
    let (mut socket, _) = tokio_tungstenite::connect_async(ws_url.as_str()).await?;
    eprintln!("Following {} (Ctrl+C to stop)", ws_url);

    while let Some(frame) = socket.next().await {
        match frame? {
            Message::Text(text) => {
                let envelope: Value = serde_json::from_str(text.as_str())?;
                print_envelope(&envelope);
            }
            Message::Close(_) => break,
            _ => {}
        }
    }
    Ok(())
}

fn print_envelope(envelope: &Value) {
    let summary = |log: &Value| {
        format!(
            "{} {} {} -> {} ({} ms)",
            log["timestamp"].as_str().unwrap_or("-"),
            log["method"].as_str().unwrap_or("-"),
            log["url"].as_str().unwrap_or("-"),
            log["status_code"],
            log["duration"],
        )
    };

    match envelope["type"].as_str() {
        Some("new_log") => println!("{}", summary(&envelope["data"])),
        Some("log_list") => {
            for log in envelope["data"].as_array().into_iter().flatten() {
                println!("{}", summary(log));
            }
        }
        _ => println!("{}", envelope),
    }
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
