use clap::{Parser, Subcommand};
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "farm-cli")]
#[command(about = "Command-line client for the Smart Farming gateway", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:5000")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show gateway and prediction service health
    Health,
    /// Request a fertility prediction from a JSON file of soil readings
    Fertility { file: PathBuf },
    /// Request an irrigation prediction from a JSON file of sensor readings
    Moisture { file: PathBuf },
    /// Classify a soil image
    SoilImage {
        image: PathBuf,
        /// MIME type sent with the image
        #[arg(long, default_value = "image/jpeg")]
        mime: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let res = match cli.command {
        Commands::Health => client.get(format!("{}/api/health", base)).send().await?,
        Commands::Fertility { file } => {
            let body: Value = serde_json::from_str(&std::fs::read_to_string(file)?)?;
            client
                .post(format!("{}/api/crops/fertility", base))
                .json(&body)
                .send()
                .await?
        }
        Commands::Moisture { file } => {
            let body: Value = serde_json::from_str(&std::fs::read_to_string(file)?)?;
            client
                .post(format!("{}/api/crops/moisture", base))
                .json(&body)
                .send()
                .await?
        }
        Commands::SoilImage { image, mime } => {
            let file_name = image
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "soil.jpg".to_string());
            let bytes = tokio::fs::read(&image).await?;
            let part = Part::bytes(bytes).file_name(file_name).mime_str(&mime)?;
            client
                .post(format!("{}/api/crops/soil-image", base))
                .multipart(Form::new().part("image", part))
                .send()
                .await?
        }
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;

    let rendered = match serde_json::from_str::<Value>(&text) {
        Ok(json) => serde_json::to_string_pretty(&json)?,
        Err(_) => text,
    };

    if status.is_success() {
        println!("{}", rendered);
    } else {
        eprintln!("Error: gateway returned status {}", status);
        eprintln!("{}", rendered);
    }
    Ok(())
}
