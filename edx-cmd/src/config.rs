//! Runtime settings, read from flags or the environment.

use crate::turn::Collaborators;
use anyhow::Context;
use clap::Args;
use edx_core::client::{GeminiClient, MistralClient};
use edx_core::service::CorpusFolder;
use edx_map::{EarthEngineSession, LayerMapRenderer, MapRenderer};
use log::{info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_MISTRAL_API_URL: &str = "https://api.mistral.ai/v1/chat/completions";

#[derive(Args, Debug, Clone)]
pub struct Settings {
    /// Chat completions endpoint of the values service
    #[arg(long, env = "MISTRAL_API_URL", default_value = DEFAULT_MISTRAL_API_URL)]
    pub mistral_api_url: String,

    #[arg(long, env = "MISTRAL_API_KEY", hide_env_values = true)]
    pub mistral_api_key: Option<String>,

    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub gemini_api_key: Option<String>,

    /// Imagery platform project; maps are skipped when unset
    #[arg(long, env = "EE_PROJECT")]
    pub ee_project: Option<String>,

    /// Folder holding "<State>_training_corpus.txt" files
    #[arg(long, env = "EDX_CORPUS_FOLDER", default_value = "./CORPUS")]
    pub corpus_folder: PathBuf,

    /// State boundary GeoJSON
    #[arg(long, env = "EDX_BOUNDARIES", default_value = "./SHAPE/india_states.geojson")]
    pub boundaries: PathBuf,

    /// Seconds to wait for map generation
    #[arg(long, env = "EDX_MAP_TIMEOUT_SECS", default_value_t = 120)]
    pub map_timeout_secs: u64,
}

impl Settings {
    pub fn map_timeout(&self) -> Duration {
        Duration::from_secs(self.map_timeout_secs)
    }

    /// Build the hosted clients, the corpus folder and, when wanted, the map renderer.
    pub fn collaborators(&self, with_map: bool) -> anyhow::Result<Collaborators> {
        let mistral_key = self
            .mistral_api_key
            .as_deref()
            .context("MISTRAL_API_KEY is not set")?;
        let gemini_key = self
            .gemini_api_key
            .as_deref()
            .context("GEMINI_API_KEY is not set")?;

        let values = MistralClient::new(self.mistral_api_url.clone(), mistral_key)?;
        let narration = GeminiClient::new(gemini_key)?;

        let map = match (with_map, &self.ee_project) {
            (true, Some(project)) => {
                info!("Map rendering enabled for project {}", project);
                let session = Arc::new(EarthEngineSession::new(project.clone(), self.boundaries.clone()));
                Some(Arc::new(LayerMapRenderer::new(session)) as Arc<dyn MapRenderer>)
            }
            (true, None) => {
                warn!("EE_PROJECT is not set, maps disabled");
                None
            }
            (false, _) => None,
        };

        Ok(Collaborators {
            corpus: Arc::new(CorpusFolder::new(self.corpus_folder.clone())),
            values: Arc::new(values),
            narration: Arc::new(narration),
            map,
            map_timeout: self.map_timeout(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        settings: Settings,
    }

    #[test]
    fn test_defaults() {
        let harness = Harness::try_parse_from(["edx", "--mistral-api-key", "m"]).unwrap();
        let settings = harness.settings;
        assert_eq!(settings.corpus_folder, PathBuf::from("./CORPUS"));
        assert_eq!(settings.map_timeout(), Duration::from_secs(120));
        assert_eq!(settings.mistral_api_key.as_deref(), Some("m"));
    }

    #[test]
    fn test_missing_key_is_reported() {
        let harness = Harness::try_parse_from(["edx", "--mistral-api-key", "m"]).unwrap();
        let mut settings = harness.settings;
        settings.gemini_api_key = None;
        let err = settings.collaborators(false).err().unwrap();
        assert_eq!(err.to_string(), "GEMINI_API_KEY is not set");
    }
}
