//! Binary entry point: load config from env, wire the transports, run the
//! dispatcher. Fatal startup errors exit non-zero.

use std::sync::Arc;

use anyhow::Result;
use teloxide::Bot;
use tokio::sync::Mutex;
use tracing::info;

use robotron::{
    init_tracing, register_commands, AiGateway, ChatTransport, CommandHandler, Config, Dispatcher,
    FfmpegTranscoder, OpenAiGateway, ReplyEngine, TelegramTransport, ThreadStore, Transcoder,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    init_tracing(&config.log_level)?;
    info!("Starting.");

    let bot = Bot::new(config.telegram_token.clone());
    register_commands(&bot).await?;

    let transport: Arc<dyn ChatTransport> = Arc::new(TelegramTransport::new(bot.clone()));
    let ai: Arc<dyn AiGateway> = Arc::new(OpenAiGateway::new(
        config.openai_api_key.clone(),
        config.measure_units,
    ));
    let transcoder: Arc<dyn Transcoder> = Arc::new(FfmpegTranscoder);
    let store = Arc::new(Mutex::new(ThreadStore::new()));

    let reply = ReplyEngine::new(
        transport.clone(),
        ai.clone(),
        transcoder,
        store.clone(),
    );
    let commands = CommandHandler::new(transport, ai, store);

    Dispatcher::new(bot, config.allowed_users.clone(), reply, commands)
        .run()
        .await?;

    Ok(())
}
