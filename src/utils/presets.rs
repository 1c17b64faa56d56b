use std::collections::BTreeMap;
use std::path::PathBuf;
use serde::{Deserialize, Serialize};
use crate::analysis::disease_report::ReportLimits;
use crate::collaborators::drug_targets::DEFAULT_TOP_TARGETS;
use crate::collaborators::enrichment::DEFAULT_MAX_TERMS;
use crate::collaborators::kegg::{DEFAULT_MAX_GENES, DEFAULT_MAX_PATHWAYS};
use crate::utils::history::{JsonFileStore, StoreError};

/// A saved analysis configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresetConfig {
    pub disease_name: String,
    #[serde(default = "default_max_genes")]
    pub max_genes: usize,
    #[serde(default = "default_max_pathways")]
    pub max_pathways: usize,
    #[serde(default = "default_max_terms")]
    pub max_terms: usize,
}

fn default_max_genes() -> usize {
    DEFAULT_MAX_GENES
}

fn default_max_pathways() -> usize {
    DEFAULT_MAX_PATHWAYS
}

fn default_max_terms() -> usize {
    DEFAULT_MAX_TERMS
}

impl PresetConfig {
    pub fn limits(&self) -> ReportLimits {
        ReportLimits {
            max_genes: self.max_genes,
            max_pathways: self.max_pathways,
            max_terms: self.max_terms,
            max_drug_targets: DEFAULT_TOP_TARGETS,
        }
    }
}

pub type Presets = BTreeMap<String, PresetConfig>;

pub struct PresetStore {
    store: JsonFileStore<Presets>,
}

impl PresetStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        Ok(Self {
            store: JsonFileStore::open(path)?,
        })
    }

    pub fn load_all(&self) -> Result<Presets, StoreError> {
        self.store.read()
    }

    pub fn get(&self, name: &str) -> Result<Option<PresetConfig>, StoreError> {
        Ok(self.store.read()?.get(name).cloned())
    }

    /// Saves `config` under `name`, replacing any preset of that name.
    pub fn save(&self, name: &str, config: PresetConfig) -> Result<(), StoreError> {
        self.store.update(|presets| {
            presets.insert(name.to_string(), config);
            Ok(())
        })
    }

    /// Returns whether a preset was removed.
    pub fn delete(&self, name: &str) -> Result<bool, StoreError> {
        self.store.update(|presets| Ok(presets.remove(name).is_some()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn preset(disease: &str) -> PresetConfig {
        PresetConfig {
            disease_name: disease.to_string(),
            max_genes: 20,
            max_pathways: 3,
            max_terms: 5,
        }
    }

    #[test]
    fn save_get_and_delete() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("presets.json");
        let presets = PresetStore::open(&path).unwrap();

        presets.save("neuro", preset("alzheimer")).unwrap();
        presets.save("neuro", preset("parkinson")).unwrap();
        presets.save("metabolic", preset("diabetes")).unwrap();

        let reopened = PresetStore::open(&path).unwrap();
        assert_eq!(reopened.load_all().unwrap().len(), 2);
        assert_eq!(reopened.get("neuro").unwrap().unwrap().disease_name, "parkinson");

        assert!(reopened.delete("neuro").unwrap());
        assert!(!reopened.delete("neuro").unwrap());
        assert!(reopened.get("neuro").unwrap().is_none());
    }

    #[test]
    fn missing_limits_take_defaults() {
        let config: PresetConfig = serde_json::from_str(r#"{"disease_name": "asthma"}"#).unwrap();
        let limits = config.limits();
        assert_eq!(limits, ReportLimits::default());
    }
}
