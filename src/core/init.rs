use anyhow::{anyhow, Result};
use langchain_rust::{
    embedding::openai::OpenAiEmbedder,
    llm::{
        openai::{OpenAI, OpenAIModel},
        OpenAIConfig,
    },
    vectorstore::pgvector::{Store, StoreBuilder},
};
use sqlx::{Pool, Postgres};
use std::sync::Arc;

use crate::core::config::PnlConfig;
use crate::db;

/// Everything a pipeline stage or request handler needs, constructed once at
/// process start and passed down explicitly.
pub struct AppContext {
    pub llm: OpenAI<OpenAIConfig>,
    pub store: Arc<Store>,
    pub pool: Pool<Postgres>,
}

pub fn initialize_openai(config: &PnlConfig) -> OpenAI<OpenAIConfig> {
    OpenAI::default()
        .with_config(OpenAIConfig::default().with_api_key(config.openai_key.clone()))
        .with_model(OpenAIModel::Gpt4oMini.to_string())
}

pub async fn initialize_vector_store(config: &PnlConfig) -> Result<Arc<Store>> {
    let embedder = OpenAiEmbedder::default()
        .with_config(OpenAIConfig::default().with_api_key(config.openai_key.clone()));

    let store = StoreBuilder::new()
        .embedder(embedder)
        .connection_url(&config.database_url[..])
        .collection_table_name(db::COLLECTIONS_TABLE)
        .embedder_table_name(db::EMBEDDER_TABLE)
        .vector_dimensions(1536)
        .build()
        .await
        .map_err(|e| anyhow!("failed to build vector store: {}", e))?;

    Ok(Arc::new(store))
}

pub async fn initialize(config: &PnlConfig) -> Result<AppContext> {
    let llm = initialize_openai(config);
    let store = initialize_vector_store(config).await?;
    let pool = db::get_pool(&config.database_url).await?;
    Ok(AppContext { llm, store, pool })
}
