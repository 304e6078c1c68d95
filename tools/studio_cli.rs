//! Interactive client for the image-studio proxy.
//!
//! Reads prompts from stdin, submits them through the studio controller, and
//! writes returned images to disk. The prompt history persists between runs,
//! so `/show` re-displays earlier results without a network call.

use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use clap::Parser;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

use image_studio::config::Config;
use image_studio::controller::{StudioController, StylePreset, ViewState};
use image_studio::gemini::{GenerateError, ImageGenerator};
use image_studio::history::HistoryStore;
use image_studio::server::{ErrorResponse, GenerateRequest, GenerateResponse};
use image_studio::storage::FileStorage;

/// Interactive prompt-to-image client
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Base URL of the image-studio proxy
    #[arg(short, long, default_value = "http://localhost:3000")]
    server: String,

    /// History file path (defaults to ~/.image-studio/history.json)
    #[arg(long)]
    history: Option<PathBuf>,

    /// Directory where generated images are written
    #[arg(short, long, default_value = "generated")]
    out_dir: PathBuf,

    /// Style preset: photorealistic, watercolor, pixel-art, sketch
    #[arg(long)]
    style: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// [`ImageGenerator`] backed by the proxy's `/generate-image` endpoint.
struct HttpGenerator {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpGenerator {
    fn new(server: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: format!("{}/generate-image", server.trim_end_matches('/')),
        }
    }
}

#[async_trait]
impl ImageGenerator for HttpGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerateError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&GenerateRequest {
                prompt: prompt.to_string(),
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let message = match response.json::<ErrorResponse>().await {
                Ok(body) => body.error,
                Err(e) => format!("request failed: {}", e),
            };
            return Err(GenerateError::Proxy(message));
        }

        let body: GenerateResponse = response.json().await?;
        Ok(body.image_url)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    let history_path = match &args.history {
        Some(path) => path.clone(),
        None => Config::load_or_default().history_path()?,
    };
    debug!("History file: {:?}", history_path);

    let history = HistoryStore::new(FileStorage::new(history_path));
    let generator = HttpGenerator::new(&args.server);
    let mut controller = StudioController::new(generator, history);

    if let Some(name) = &args.style {
        let style = StylePreset::from_name(name)
            .with_context(|| format!("Unknown style '{}'; try /style with no argument", name))?;
        controller.set_style(Some(style));
    }

    println!("image-studio client — {} ( /help for commands )", args.server);
    if !controller.visible_prompts().is_empty() {
        println!("{} prompts in history, /history to list them", controller.visible_prompts().len());
    }

    let stdin = std::io::stdin();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break; // EOF
        }
        let line = line.trim();

        match line {
            "" => continue,
            "/quit" | "/exit" => break,
            "/help" => print_help(),
            "/history" => print_history(&controller),
            "/clear" => {
                print!("Delete all saved images? This cannot be undone. Type 'yes' to confirm: ");
                std::io::stdout().flush()?;
                let mut answer = String::new();
                stdin.lock().read_line(&mut answer)?;
                if answer.trim() == "yes" {
                    controller.clear_history()?;
                    println!("History cleared.");
                }
            }
            _ if line.starts_with("/style") => {
                let name = line.trim_start_matches("/style").trim();
                if name.is_empty() {
                    controller.set_style(None);
                    println!(
                        "Style cleared. Available: {}",
                        StylePreset::ALL
                            .iter()
                            .map(|s| s.name())
                            .collect::<Vec<_>>()
                            .join(", ")
                    );
                } else if let Some(style) = StylePreset::from_name(name) {
                    controller.set_style(Some(style));
                    println!("Style set: {}", style.name());
                } else {
                    println!("Unknown style '{}'", name);
                }
            }
            _ if line.starts_with("/show") => {
                let index: Option<usize> =
                    line.trim_start_matches("/show").trim().parse().ok();
                let prompt = index
                    .and_then(|n| n.checked_sub(1))
                    .and_then(|n| controller.visible_prompts().get(n).cloned());
                match prompt {
                    Some(prompt) if controller.select_history(&prompt) => {
                        render(controller.state(), &args.out_dir)?;
                    }
                    _ => println!("No such history entry; /history to list them."),
                }
            }
            prompt => {
                println!("Generating…");
                controller.submit(prompt).await;
                render(controller.state(), &args.out_dir)?;
                if let Some(notice) = controller.storage_notice() {
                    println!("{}", notice);
                }
            }
        }
    }

    Ok(())
}

fn print_help() {
    println!("Type a prompt to generate an image. Commands:");
    println!("  /history      list saved prompts, newest first");
    println!("  /show <n>     re-display entry n from /history (no network call)");
    println!("  /style <name> set a style preset; /style alone clears it");
    println!("  /clear        delete the entire history");
    println!("  /quit         exit");
}

fn print_history<G: ImageGenerator, B: image_studio::storage::StorageBackend>(
    controller: &StudioController<G, B>,
) {
    if controller.visible_prompts().is_empty() {
        println!("History is empty.");
        return;
    }
    for (i, prompt) in controller.visible_prompts().iter().enumerate() {
        println!("{:3}. {}", i + 1, prompt);
    }
}

fn render(state: &ViewState, out_dir: &Path) -> Result<()> {
    match state {
        ViewState::ShowingResult { prompt, image_url } => {
            let path = save_image(image_url, out_dir)?;
            println!("{} -> {}", prompt, path.display());
        }
        ViewState::Error { message } => println!("Error: {}", message),
        ViewState::Idle | ViewState::Submitting => {}
    }
    Ok(())
}

/// Decode a base64 data URL and write it to a timestamped file.
fn save_image(data_url: &str, out_dir: &Path) -> Result<PathBuf> {
    let (_, payload) = data_url
        .split_once("base64,")
        .context("Image reference is not a base64 data URL")?;
    let bytes = STANDARD
        .decode(payload)
        .context("Failed to decode image payload")?;

    std::fs::create_dir_all(out_dir)?;
    let filename = format!(
        "img-{}.png",
        chrono::Local::now().format("%Y%m%d-%H%M%S%.3f")
    );
    let path = out_dir.join(filename);
    std::fs::write(&path, bytes)?;
    Ok(path)
}
