use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, COOKIE, SET_COOKIE};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "panel-cli")]
#[command(about = "Management CLI for a running panel-guard server", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://127.0.0.1:8080")]
    url: String,

    /// Session cookie value, as printed by `login`.
    #[arg(short, long, env = "PANEL_SESSION")]
    session: Option<String>,

    #[arg(long, default_value = "session")]
    cookie_name: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and print the session cookie value
    Login {
        username: String,
        password: String,
    },
    /// Check server health
    Health,
    /// Show host and sampler information
    System,
    /// Show resource history
    History {
        /// One of 5m, 15m, 30m, 1h
        #[arg(short, long, default_value = "1h")]
        period: String,
    },
    /// Show a fresh resource snapshot
    Realtime,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()?;

    let mut headers = HeaderMap::new();
    if let Some(session) = &cli.session {
        headers.insert(
            COOKIE,
            HeaderValue::from_str(&format!("{}={}", cli.cookie_name, session))?,
        );
    }

    let path = match &cli.command {
        Commands::Login { username, password } => {
            let res = client
                .post(format!("{}/login", cli.url))
                .form(&[("username", username), ("password", password)])
                .send()
                .await?;
            return print_session(res, &cli.cookie_name).await;
        }
        Commands::Health => "/health".to_string(),
        Commands::System => "/api/system".to_string(),
        Commands::History { period } => format!("/api/resources/history?period={period}"),
        Commands::Realtime => "/api/resources/realtime".to_string(),
    };

    let res = client
        .get(format!("{}{}", cli.url, path))
        .headers(headers)
        .send()
        .await?;
    print_response(res).await
}

async fn print_session(
    res: reqwest::Response,
    cookie_name: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let prefix = format!("{cookie_name}=");
    let session = res
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.strip_prefix(&prefix))
        .filter_map(|v| v.split(';').next())
        .find(|v| !v.is_empty())
        .map(str::to_owned);

    match session {
        Some(value) => println!("{value}"),
        None => {
            eprintln!("Error: login failed with status {}", res.status());
            if let Ok(text) = res.text().await {
                eprintln!("Response: {}", text);
            }
        }
    }
    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if status.is_redirection() {
        eprintln!("Error: not signed in (pass --session)");
        return Ok(());
    }
    if !status.is_success() {
        eprintln!("Error: server returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
