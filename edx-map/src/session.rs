use crate::boundary::BoundaryIndex;
use crate::error::{MapError, Result};
use log::info;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::OnceCell;

/// Connection details for the imagery platform plus the state boundary index.
///
/// Build one per process and share it behind an `Arc`. The boundary file is
/// read on first use only.
#[derive(Debug)]
pub struct EarthEngineSession {
    project: String,
    boundaries_path: PathBuf,
    boundaries: OnceCell<BoundaryIndex>,
}

impl EarthEngineSession {
    pub fn new(project: impl Into<String>, boundaries_path: impl Into<PathBuf>) -> Self {
        Self {
            project: project.into(),
            boundaries_path: boundaries_path.into(),
            boundaries: OnceCell::new(),
        }
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn boundaries_path(&self) -> &Path {
        &self.boundaries_path
    }

    /// The boundary index, loading it on the first call.
    pub async fn boundaries(&self) -> Result<&BoundaryIndex> {
        self.boundaries
            .get_or_try_init(|| async {
                let path = &self.boundaries_path;
                let text = tokio::fs::read_to_string(path).await.map_err(|source| {
                    if source.kind() == ErrorKind::NotFound {
                        MapError::BoundaryFileMissing(path.clone())
                    } else {
                        MapError::BoundaryRead {
                            path: path.clone(),
                            source,
                        }
                    }
                })?;
                let index = BoundaryIndex::from_geojson_str(&text)?;
                info!(
                    "Loaded {} state boundaries from {} for project {}",
                    index.len(),
                    path.display(),
                    self.project
                );
                Ok(index)
            })
            .await
    }
}
