use anyhow::Result;
use clap::Parser;
use futures_util::StreamExt;
use openai_content_generator::ai::{
    ContentGenerator, EmbedContentParameters, GenerateContentParameters, OpenAiContentGenerator,
};
use openai_content_generator::Config;
use std::io::Write;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "content-gen")]
#[command(about = "Generate text or embeddings through an OpenAI-compatible API")]
struct CliArgs {
    /// Prompt text sent as a single user turn.
    #[arg(value_name = "PROMPT", value_parser = parse_prompt_arg)]
    prompt: String,

    /// Print deltas as they arrive instead of waiting for the full reply.
    #[arg(long, conflicts_with = "embed")]
    stream: bool,

    /// Request an embedding of the prompt and print the raw JSON response.
    #[arg(long)]
    embed: bool,
}

fn parse_prompt_arg(input: &str) -> std::result::Result<String, String> {
    if input.trim().is_empty() {
        Err("Prompt must not be empty".to_string())
    } else {
        Ok(input.to_string())
    }
}

async fn run(args: CliArgs) -> Result<()> {
    let config = Config::from_env()?;
    info!("Using model {} at {}", config.model(), config.base_url());

    let generator = OpenAiContentGenerator::new(config);

    if args.embed {
        let response = generator
            .embed_content(EmbedContentParameters::new(args.prompt))
            .await?;
        println!("{}", serde_json::to_string_pretty(response.as_json())?);
        return Ok(());
    }

    let request = GenerateContentParameters::from_text(args.prompt);

    if args.stream {
        let mut stream = generator.generate_content_stream(request).await?;
        let mut stdout = std::io::stdout();
        while let Some(chunk) = stream.next().await {
            if let Some(text) = chunk?.text() {
                write!(stdout, "{}", text)?;
                stdout.flush()?;
            }
        }
        writeln!(stdout)?;
    } else {
        let response = generator.generate_content(request).await?;
        println!("{}", response.text().unwrap_or_default());
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "openai_content_generator=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = CliArgs::parse();

    match run(args).await {
        Ok(()) => Ok(()),
        Err(e) => {
            error!("Generation failed: {}", e);
            std::process::exit(1);
        }
    }
}
