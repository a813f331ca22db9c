//! `cairn-service`: the HTTP binary wiring C1-C6 together and serving the spec §6 API.

use std::sync::Arc;

use cairn_service::config::CairnConfig;
use cairn_service::facade::CairnService;
use cairn_service::http;
use cairn_service::llm_client::HttpLlmClient;
use cairn_store::InMemoryIndex;
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "cairn-service", about = "Conversational retrieval-augmented QA service")]
struct Cli {
    /// Address to bind the HTTP server to.
    #[arg(long, default_value = "0.0.0.0:8080")]
    bind: String,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,cairn=debug"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    init_tracing();

    let cli = Cli::parse();
    let config = CairnConfig::load()?;
    tracing::info!(bind = %cli.bind, "loaded configuration");

    let store = Arc::new(InMemoryIndex::new());
    let llm = Arc::new(HttpLlmClient::new(
        config.llm_base_url.clone(),
        config.llm_api_key.clone(),
        config.llm_chat_model.clone(),
        config.llm_embed_model.clone(),
    ));

    let retriever = Arc::new(cairn_retrieve::HybridRetriever::new(store, llm.clone(), config.retriever_config()));
    let generator = Arc::new(cairn_generate::AnswerGenerator::new(llm.clone()).with_chat_options(config.chat_options()));
    let router = Arc::new(cairn_router::ConversationalRouter::new(
        retriever,
        generator,
        Some(llm as Arc<dyn cairn_generate::LlmClient>),
        config.router_config(),
    ));

    let sessions = Arc::new(cairn_session::SessionManager::new(
        config.session_timeout(),
        config.window_k as usize,
        config.sweep_interval(),
    ));
    let _sweeper = sessions.clone().spawn_sweeper();

    let service = Arc::new(CairnService::new(sessions, router, config));
    let app = http::router(service);

    let listener = tokio::net::TcpListener::bind(&cli.bind).await?;
    tracing::info!(bind = %cli.bind, "cairn-service listening");
    axum::serve(listener, app).await?;

    Ok(())
}
