use mj_studio::{BotCredentials, GenerationParameters, GenerationRequest, ServerConfig, Studio};
use std::env;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if it exists
    dotenvy::dotenv().ok();

    // Relay and storage settings come from the same variables the server reads
    let studio = Studio::from_config(&ServerConfig::from_env())?;

    let credentials = BotCredentials::new(
        env::var("BOT_SERVER_ID")?,
        env::var("BOT_CHANNEL_ID")?,
        env::var("BOT_TOKEN")?,
    );

    let prompt = env::args()
        .nth(1)
        .unwrap_or_else(|| "a red fox in a snowy forest".to_string());
    let mut request = GenerationRequest::new(prompt.as_str(), credentials).with_parameters(
        GenerationParameters {
            ar: Some("16:9".to_string()),
            ..Default::default()
        },
    );
    if let Ok(api_key) = env::var("OPENAI_API_KEY") {
        request = request.with_enhancement(api_key);
    }

    println!("Generating images for prompt: '{}'", prompt);

    match studio.generate(&request).await {
        Ok(outcome) => {
            if let Some(enhanced) = &outcome.enhanced_prompt {
                println!("Enhanced prompt: {}", enhanced);
            }
            for image in &outcome.images {
                println!("  #{} {}", image.index, image.url);
            }
            if let Some(first) = outcome.images.first() {
                println!(
                    "Upscale with msgId={} hash={} flags={}",
                    first.msg_id, first.hash, first.flags
                );
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
        }
    }

    Ok(())
}
