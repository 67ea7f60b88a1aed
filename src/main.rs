use std::sync::Arc;

use narravox_backend::controllers::voiceover::VoiceoverController;
use narravox_backend::domain::voiceover::VoiceoverService;
use narravox_backend::infrastructure::config::{Config, LogFormat, SynthesisProvider};
use narravox_backend::infrastructure::db::{check_connection, create_pool, run_migrations};
use narravox_backend::infrastructure::http::start_http_server;
use narravox_backend::infrastructure::repositories::{
    FsAudioBlobRepository, OpenAiSynthesisRepository, PgVoiceoverCacheRepository,
    PollySynthesisRepository, SynthesisRepository,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    init_logging(&config);

    tracing::info!(
        "Starting NarraVox Backend on {}:{}",
        config.host,
        config.port
    );

    // Create database connection pool
    let pool = create_pool(&config.database_url).await?;
    tracing::info!("Database connection pool created");

    // Verify database connection and apply migrations
    check_connection(&pool).await?;
    run_migrations(&pool).await?;
    tracing::info!("Database connection verified, migrations applied");

    let pool = Arc::new(pool);
    let config = Arc::new(config);

    // === DEPENDENCY INJECTION SETUP ===
    // 1. Instantiate repositories
    tracing::info!("Instantiating repositories...");
    let cache_repo = Arc::new(PgVoiceoverCacheRepository::new(pool.clone()));
    let blob_repo = Arc::new(FsAudioBlobRepository::new(
        config.audio_storage_dir.clone(),
    ));
    let synthesis_repo = build_synthesis_repository(&config).await?;

    // 2. Instantiate services
    tracing::info!("Instantiating services...");
    let voiceover_service = Arc::new(VoiceoverService::new(
        cache_repo,
        blob_repo,
        synthesis_repo,
        config.voiceover_memory_cache_enabled,
    ));

    // 3. Instantiate controllers
    tracing::info!("Instantiating controllers...");
    let voiceover_controller = Arc::new(VoiceoverController::new(voiceover_service));

    // Start HTTP server with all routes
    start_http_server(pool, config, voiceover_controller).await?;

    Ok(())
}

async fn build_synthesis_repository(
    config: &Config,
) -> Result<Arc<dyn SynthesisRepository>, Box<dyn std::error::Error>> {
    match config.synthesis_provider {
        SynthesisProvider::Polly => {
            tracing::info!(
                "Initializing AWS Polly client with region: {}",
                config.aws_region
            );

            let aws_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
                .region(aws_config::Region::new(config.aws_region.clone()))
                .load()
                .await;

            tracing::info!(region = ?aws_config.region(), "AWS configuration loaded");

            let polly_client = Arc::new(aws_sdk_polly::Client::new(&aws_config));
            Ok(Arc::new(PollySynthesisRepository::new(polly_client)))
        }
        SynthesisProvider::OpenAi => {
            tracing::info!("Initializing OpenAI TTS client");

            let api_key = config
                .openai_api_key
                .clone()
                .ok_or("OPENAI_API_KEY is required when SYNTHESIS_PROVIDER=openai")?;
            let openai_config = async_openai::config::OpenAIConfig::new().with_api_key(api_key);
            let client = Arc::new(async_openai::Client::with_config(openai_config));
            Ok(Arc::new(OpenAiSynthesisRepository::new(
                client,
                "tts-1".to_string(),
            )))
        }
    }
}

fn init_logging(config: &Config) {
    if config.log_format == LogFormat::Json {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "narravox_backend=debug,tower_http=debug".into()),
            )
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "narravox_backend=debug,tower_http=debug".into()),
            )
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }
}
