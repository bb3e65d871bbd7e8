use std::time::Instant;

use gpt4all_bridge::{Gpt4All, Gpt4AllConfig};
use tracing_subscriber::EnvFilter;

const DEFAULT_PROMPTS: [&str; 2] = [
    "Tell me about how Open Access to AI is going to help humanity.",
    "Explain to a five year old why AI is nothing to be afraid of.",
];

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let started = Instant::now();
    if let Err(e) = run().await {
        eprintln!("[ERROR] {}", e);
        std::process::exit(1);
    }
    println!("period {:.3}", started.elapsed().as_secs_f64());
}

async fn run() -> gpt4all_bridge::BridgeResult<()> {
    // 1. Config from GPT4ALL_* variables / .env.local / GPT4ALL_CONFIG
    let config = Gpt4AllConfig::load()?;
    tracing::info!(model = %config.model, "Loaded configuration");

    let prompts: Vec<String> = {
        let args: Vec<String> = std::env::args().skip(1).collect();
        if args.is_empty() {
            DEFAULT_PROMPTS.iter().map(|p| p.to_string()).collect()
        } else {
            args
        }
    };

    // 2. Download missing files and start the chat process
    let setup_started = Instant::now();
    let mut gpt4all = Gpt4All::new(config)?;
    gpt4all.init(false).await?;
    gpt4all.open().await?;
    println!("period {:.3}", setup_started.elapsed().as_secs_f64());

    // 3. One prompt at a time
    for prompt in &prompts {
        let prompt_started = Instant::now();
        let result = gpt4all.prompt(prompt).await;
        let response = match result {
            Ok(response) => response,
            Err(e) => {
                gpt4all.close().await;
                return Err(e);
            }
        };
        println!("Prompt: {}", prompt);
        println!("Response: {}", response);
        println!("period {:.3}", prompt_started.elapsed().as_secs_f64());
    }

    gpt4all.close().await;
    Ok(())
}
