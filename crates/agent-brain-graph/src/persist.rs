//! JSON snapshot persistence for the arena graph index, mirroring the
//! other indices' persist/reset symmetry.

use std::path::Path;

use crate::error::GraphResult;
use crate::model::Edge;

pub async fn load(path: &Path) -> GraphResult<Vec<Edge>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let contents = tokio::fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&contents)?)
}

pub async fn save(path: &Path, edges: &[Edge]) -> GraphResult<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let contents = serde_json::to_string_pretty(edges)?;
    tokio::fs::write(path, contents).await?;
    Ok(())
}
