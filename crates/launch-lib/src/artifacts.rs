//! Persistence of the trained artifact triple
//!
//! The scaler, classifier and feature-name list are written as three JSON
//! files in one directory. Each file goes to a temp path, is synced, then
//! renamed into place. The three writes are not transactional: if `save`
//! fails part-way the directory must be treated as inconsistent and training
//! re-run, never patched one artifact at a time.

use crate::error::{PredictorError, Result};
use crate::predictor::{Artifacts, FeatureSchema, RandomForest, StandardScaler};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const SCALER_FILE: &str = "weather_scaler.json";
pub const CLASSIFIER_FILE: &str = "launch_model.json";
pub const SCHEMA_FILE: &str = "feature_names.json";

/// Record of one persisted artifact file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactFile {
    pub path: PathBuf,
    pub checksum: String,
    pub size_bytes: usize,
}

/// Result of a successful `save`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedArtifacts {
    pub scaler: ArtifactFile,
    pub classifier: ArtifactFile,
    pub schema: ArtifactFile,
}

impl SavedArtifacts {
    /// Short identifier of the saved triple, derived from the file checksums
    pub fn model_id(&self) -> String {
        let mut hasher = Sha256::new();
        for file in [&self.scaler, &self.classifier, &self.schema] {
            hasher.update(file.checksum.as_bytes());
        }
        hex::encode(hasher.finalize())[..12].to_string()
    }
}

/// Directory-backed store for the (scaler, classifier, schema) triple
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn scaler_path(&self) -> PathBuf {
        self.dir.join(SCALER_FILE)
    }

    pub fn classifier_path(&self) -> PathBuf {
        self.dir.join(CLASSIFIER_FILE)
    }

    pub fn schema_path(&self) -> PathBuf {
        self.dir.join(SCHEMA_FILE)
    }

    /// True when all three artifact files are present
    pub fn exists(&self) -> bool {
        [self.scaler_path(), self.classifier_path(), self.schema_path()]
            .iter()
            .all(|p| p.is_file())
    }

    pub fn save(&self, scaler: &StandardScaler, classifier: &RandomForest, schema: &FeatureSchema) -> Result<SavedArtifacts> {
        fs::create_dir_all(&self.dir)?;

        let saved = SavedArtifacts {
            scaler: write_json(&self.scaler_path(), scaler)?,
            classifier: write_json(&self.classifier_path(), classifier)?,
            schema: write_json(&self.schema_path(), schema)?,
        };

        info!(
            dir = %self.dir.display(),
            model_id = %saved.model_id(),
            classifier_bytes = saved.classifier.size_bytes,
            features = schema.len(),
            "Artifacts saved"
        );
        Ok(saved)
    }

    pub fn save_artifacts(&self, artifacts: &Artifacts) -> Result<SavedArtifacts> {
        self.save(&artifacts.scaler, &artifacts.classifier, &artifacts.schema)
    }

    /// Load the triple; every file must be present and decodable, and the
    /// scaler and classifier must match the schema width
    pub fn load(&self) -> Result<Artifacts> {
        let paths = [self.scaler_path(), self.classifier_path(), self.schema_path()];
        if let Some(missing) = paths.iter().find(|p| !p.is_file()) {
            return Err(PredictorError::ArtifactNotFound { path: missing.clone() });
        }

        let scaler: StandardScaler = read_json(&paths[0])?;
        let classifier: RandomForest = read_json(&paths[1])?;
        let schema: FeatureSchema = read_json(&paths[2])?;

        classifier.validate().map_err(|reason| PredictorError::ArtifactCorrupt {
            path: paths[1].clone(),
            reason,
        })?;
        if scaler.mean().len() != scaler.scale().len() {
            return Err(PredictorError::ArtifactCorrupt {
                path: paths[0].clone(),
                reason: "mean and scale lengths differ".to_string(),
            });
        }

        let artifacts = Artifacts::new(scaler, classifier, schema);
        artifacts.check_consistency()?;

        info!(
            dir = %self.dir.display(),
            features = artifacts.schema.len(),
            trees = artifacts.classifier.trees().len(),
            "Artifacts loaded"
        );
        Ok(artifacts)
    }

    /// SHA256 checksums of the files currently on disk
    pub fn checksums(&self) -> Result<SavedArtifacts> {
        let describe = |path: PathBuf| -> Result<ArtifactFile> {
            let bytes = fs::read(&path).map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => PredictorError::ArtifactNotFound { path: path.clone() },
                _ => PredictorError::Io(e),
            })?;
            Ok(ArtifactFile {
                checksum: compute_checksum(&bytes),
                size_bytes: bytes.len(),
                path,
            })
        };
        Ok(SavedArtifacts {
            scaler: describe(self.scaler_path())?,
            classifier: describe(self.classifier_path())?,
            schema: describe(self.schema_path())?,
        })
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<ArtifactFile> {
    let bytes = serde_json::to_vec(value).map_err(|e| PredictorError::ArtifactCorrupt {
        path: path.to_path_buf(),
        reason: format!("serialization failed: {}", e),
    })?;

    let temp_path = path.with_extension("tmp");
    let mut file = File::create(&temp_path)?;
    file.write_all(&bytes)?;
    file.sync_all()?;
    fs::rename(&temp_path, path)?;

    let checksum = compute_checksum(&bytes);
    debug!(path = %path.display(), size = bytes.len(), checksum = %checksum, "Wrote artifact");
    Ok(ArtifactFile {
        path: path.to_path_buf(),
        checksum,
        size_bytes: bytes.len(),
    })
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => PredictorError::ArtifactNotFound {
            path: path.to_path_buf(),
        },
        _ => PredictorError::Io(e),
    })?;
    serde_json::from_slice(&bytes).map_err(|e| PredictorError::ArtifactCorrupt {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Compute SHA256 checksum of data
fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
