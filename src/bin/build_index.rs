use anyhow::Result;
use pnlchat::{
    core::{config::PnlConfig, init},
    index,
};

/// Builds the retrieval index: chunks every interim text artifact, embeds the
/// chunks and stores them with company/source metadata. Exits non-zero when
/// nothing was indexed -- an empty index is never a valid build.
#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();

    let config = PnlConfig::from_env()?;
    let store = init::initialize_vector_store(&config).await?;
    log::info!("vector store ready; indexing {}", config.interim_dir().display());

    let total = index::build_index(
        &config.interim_dir(),
        store.as_ref(),
        config.chunk_size,
        config.chunk_overlap,
    )
    .await?;

    log::info!("successfully indexed {} chunks", total);
    Ok(())
}
