use anyhow::Result;
use sqlx::{query_as, Pool, Postgres};

/// Table names handed to the vector-store builder. The store owns the schema;
/// this module only reads metadata back out of it.
pub const COLLECTIONS_TABLE: &str = "pnl_collections";
pub const EMBEDDER_TABLE: &str = "pnl_embeddings";

pub async fn get_pool(database_url: &str) -> Result<Pool<Postgres>> {
    sqlx::postgres::PgPoolOptions::new()
        .max_connections(16)
        .connect(database_url)
        .await
        .map_err(Into::into)
}

/// Distinct company slugs present in the index, sorted. Backs the listing
/// endpoint so the dashboard can populate its company picker.
pub async fn list_company_slugs(pool: &Pool<Postgres>) -> Result<Vec<String>> {
    let query_str = format!(
        "SELECT DISTINCT cmetadata->>'company_slug' AS slug FROM {} \
         WHERE cmetadata->>'company_slug' IS NOT NULL ORDER BY slug",
        EMBEDDER_TABLE
    );
    let rows: Vec<(String,)> = query_as(&query_str).fetch_all(pool).await?;
    Ok(rows.into_iter().map(|r| r.0).collect())
}
