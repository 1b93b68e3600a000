use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_stream::StreamExt;

use pantryscan::{render, UploadConfig, UploadController};

/// CLI for the pantryscan recognition workflow
#[derive(Parser)]
#[command(name = "pantryscan")]
#[command(about = "Upload grocery photos to a recognition backend", long_about = None)]
struct Cli {
    /// Backend base URL
    #[arg(
        short,
        long,
        env = "PANTRYSCAN_SERVER",
        default_value = "http://127.0.0.1:5000"
    )]
    server: String,

    /// Per-request timeout in milliseconds
    #[arg(long, env = "PANTRYSCAN_TIMEOUT_MS", default_value_t = 30_000)]
    timeout_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload an image and submit the recognized result
    Submit {
        /// Path to the image file (jpg, jpeg or png)
        image: PathBuf,
    },

    /// Print the inline preview data URL for an image
    Preview {
        /// Path to the image file
        image: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("pantryscan=info")),
        )
        .init();

    let cli = Cli::parse();

    let config = UploadConfig {
        base_url: cli.server,
        timeout_ms: cli.timeout_ms,
        ..UploadConfig::default()
    };
    let controller = UploadController::new(config);

    match cli.command {
        Commands::Submit { image } => {
            let mut updates = controller.subscribe();

            // Terminal renderer: apply the display instructions as they stream out
            let printer = tokio::spawn(async move {
                while let Some(update) = updates.next().await {
                    let display = render(&update.state, None);
                    if display.loading {
                        println!("[loading] sending image to /upload");
                    }
                    if display.processing {
                        println!("[processing] {}", display.result);
                    }
                    if update.state.is_terminal() {
                        break;
                    }
                }
            });

            let result = controller.submit(&image).await;
            let _ = printer.await;

            let display = controller.display();
            match result {
                Ok(_) => println!("✓ {}", display.result),
                Err(_) => {
                    eprintln!("✗ {}", display.result);
                    std::process::exit(1);
                }
            }
        }

        Commands::Preview { image } => {
            let data_url = controller
                .preview(&image)
                .await
                .context("Failed to build image preview")?;
            println!("{}", data_url);
        }
    }

    Ok(())
}
