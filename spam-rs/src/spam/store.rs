//! On-disk persistence for the trained model and its training corpus
//!
//! Both are plain JSON files. Writes go through a sibling temp file and a
//! rename so a crash never leaves a half-written model behind.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use super::classifier::{Model, ModelParams};
use super::types::{RawTrainingRow, TrainingSet};
use crate::config::ClassifierConfig;
use crate::error::Result;

/// Where the model and corpus live
#[derive(Debug, Clone)]
pub struct ModelStore {
    model_path: PathBuf,
    corpus_path: PathBuf,
}

/// Model and corpus as loaded at startup
pub struct LoadedModel {
    pub model: Model,
    pub corpus: TrainingSet,
}

impl ModelStore {
    pub fn new(model_path: impl Into<PathBuf>, corpus_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            corpus_path: corpus_path.into(),
        }
    }

    pub fn from_config(config: &ClassifierConfig) -> Self {
        Self::new(&config.model_path, &config.training_data_path)
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    pub fn corpus_path(&self) -> &Path {
        &self.corpus_path
    }

    pub fn save_model(&self, model: &Model) -> Result<()> {
        write_json(&self.model_path, model)?;
        info!(path = %self.model_path.display(), "Saved spam model");
        Ok(())
    }

    /// `Ok(None)` when no model file exists yet. A model whose parts
    /// disagree is an error, like unparsable JSON.
    pub fn load_model(&self) -> Result<Option<Model>> {
        if !self.model_path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.model_path)?;
        let model: Model = serde_json::from_str(&content)?;
        model.validate()?;
        Ok(Some(model))
    }

    /// Read the stored corpus, dropping rows without text or with a bad label
    pub fn load_corpus(&self) -> Result<Option<TrainingSet>> {
        if !self.corpus_path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.corpus_path)?;
        let rows: Vec<RawTrainingRow> = serde_json::from_str(&content)?;
        Ok(Some(TrainingSet::from_raw_rows(rows)))
    }

    pub fn save_corpus(&self, corpus: &TrainingSet) -> Result<()> {
        write_json(&self.corpus_path, corpus)?;
        info!(path = %self.corpus_path.display(), samples = corpus.len(), "Saved training corpus");
        Ok(())
    }

    /// Persist a model together with the corpus it was trained on. Both
    /// files are staged first; neither is replaced unless both staged.
    pub fn save(&self, model: &Model, corpus: &TrainingSet) -> Result<()> {
        let corpus_tmp = stage_json(&self.corpus_path, corpus)?;
        let model_tmp = match stage_json(&self.model_path, model) {
            Ok(tmp) => tmp,
            Err(e) => {
                let _ = fs::remove_file(&corpus_tmp);
                return Err(e);
            }
        };

        // the corpus on disk is never older than the model
        if let Err(e) = fs::rename(&corpus_tmp, &self.corpus_path) {
            let _ = fs::remove_file(&corpus_tmp);
            let _ = fs::remove_file(&model_tmp);
            return Err(e.into());
        }
        fs::rename(&model_tmp, &self.model_path)?;

        info!(
            model = %self.model_path.display(),
            corpus = %self.corpus_path.display(),
            samples = corpus.len(),
            "Saved spam model and training corpus"
        );
        Ok(())
    }

    /// Where an unusable corpus file is moved before a default replaces it
    pub fn rejected_corpus_path(&self) -> PathBuf {
        let mut name = self.corpus_path.as_os_str().to_owned();
        name.push(".rejected");
        PathBuf::from(name)
    }

    /// Load the persisted model, or train one from the stored corpus, or
    /// from the built-in corpus as a last resort. Failing to persist a
    /// freshly trained model is logged, not fatal.
    pub fn load_or_create_default(&self, params: &ModelParams) -> Result<LoadedModel> {
        let corpus = match self.load_corpus() {
            Ok(Some(corpus)) if !corpus.is_empty() => Some(corpus),
            Ok(Some(_)) => {
                warn!(path = %self.corpus_path.display(), "Training corpus has no usable rows");
                None
            }
            Ok(None) => None,
            Err(e) => {
                warn!(path = %self.corpus_path.display(), error = %e, "Cannot read training corpus");
                self.set_aside_corpus();
                None
            }
        };

        match self.load_model() {
            Ok(Some(model)) => {
                info!(
                    path = %self.model_path.display(),
                    vocabulary_size = model.vocabulary_size(),
                    "Loaded spam model"
                );
                return Ok(LoadedModel {
                    model,
                    corpus: corpus.unwrap_or_default(),
                });
            }
            Ok(None) => {}
            Err(e) => {
                warn!(path = %self.model_path.display(), error = %e, "Stored model unusable, retraining");
            }
        }

        if let Some(corpus) = corpus {
            match Model::train(&corpus, params) {
                Ok(model) => {
                    if let Err(e) = self.save_model(&model) {
                        warn!(path = %self.model_path.display(), error = %e, "Cannot persist model, serving it from memory");
                    }
                    return Ok(LoadedModel { model, corpus });
                }
                Err(e) => {
                    warn!(error = %e, "Stored corpus unusable, falling back to built-in samples");
                }
            }
        } else {
            warn!("No stored model or corpus, training on built-in samples");
        }

        let corpus = TrainingSet::builtin();
        let model = Model::train(&corpus, params)?;

        if let Err(e) = self.save_model(&model) {
            warn!(path = %self.model_path.display(), error = %e, "Cannot persist default model, serving it from memory");
        }
        if self.set_aside_corpus() {
            if let Err(e) = self.save_corpus(&corpus) {
                warn!(path = %self.corpus_path.display(), error = %e, "Cannot persist default corpus");
            }
        }

        Ok(LoadedModel { model, corpus })
    }

    /// Move an existing corpus file out of the way. `false` when it had to
    /// stay in place and must not be overwritten.
    fn set_aside_corpus(&self) -> bool {
        if !self.corpus_path.exists() {
            return true;
        }
        let rejected = self.rejected_corpus_path();
        match fs::rename(&self.corpus_path, &rejected) {
            Ok(()) => {
                warn!(
                    path = %self.corpus_path.display(),
                    moved_to = %rejected.display(),
                    "Moved unusable training corpus aside"
                );
                true
            }
            Err(e) => {
                warn!(path = %self.corpus_path.display(), error = %e, "Cannot move training corpus aside, leaving it untouched");
                false
            }
        }
    }
}

fn write_json<T: serde::Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let tmp = stage_json(path, value)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Write `value` to a sibling temp file of `path` and return the temp path
fn stage_json<T: serde::Serialize + ?Sized>(path: &Path, value: &T) -> Result<PathBuf> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, serde_json::to_vec_pretty(value)?)?;
    Ok(tmp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spam::classifier::ModelView;
    use crate::spam::types::{Label, TrainingExample};
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> ModelStore {
        ModelStore::new(dir.path().join("model.json"), dir.path().join("corpus.json"))
    }

    #[test]
    fn test_missing_files() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        assert!(store.load_model().unwrap().is_none());
        assert!(store.load_corpus().unwrap().is_none());
    }

    #[test]
    fn test_model_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let model = Model::train(&TrainingSet::builtin(), &ModelParams::default()).unwrap();

        store.save_model(&model).unwrap();
        let loaded = store.load_model().unwrap().unwrap();

        let text = "Click here for a free offer";
        assert!((loaded.predict_proba(text) - model.predict_proba(text)).abs() < 1e-12);
        assert_eq!(loaded.vocabulary_size(), model.vocabulary_size());
    }

    #[test]
    fn test_corpus_drops_invalid_rows() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        fs::write(
            store.corpus_path(),
            r#"[{"text":"free money","label":1},{"text":"hi","label":9},{"label":0},{"text":"lunch?","label":0}]"#,
        )
        .unwrap();

        let corpus = store.load_corpus().unwrap().unwrap();
        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus.count(Label::Spam), 1);
    }

    #[test]
    fn test_load_or_create_default_uses_builtin() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let loaded = store.load_or_create_default(&ModelParams::default()).unwrap();
        assert_eq!(loaded.corpus, TrainingSet::builtin());
        assert!(store.model_path().exists());
        assert!(store.corpus_path().exists());

        // second start reads the persisted model
        let again = store.load_or_create_default(&ModelParams::default()).unwrap();
        assert_eq!(again.model.vocabulary_size(), loaded.model.vocabulary_size());
        assert_eq!(again.corpus.len(), loaded.corpus.len());
    }

    #[test]
    fn test_load_or_create_default_trains_from_corpus() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let corpus = TrainingSet::new(vec![
            TrainingExample::new("cheap pills online", Label::Spam),
            TrainingExample::new("see you at lunch", Label::Ham),
        ]);
        store.save_corpus(&corpus).unwrap();

        let loaded = store.load_or_create_default(&ModelParams::default()).unwrap();
        assert_eq!(loaded.corpus, corpus);
        assert!(loaded.model.class_log_prob(Label::Spam, "pills").is_some());
    }

    #[test]
    fn test_inconsistent_model_is_retrained() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let model = Model::train(&TrainingSet::builtin(), &ModelParams::default()).unwrap();
        let mut blob = serde_json::to_value(&model).unwrap();
        blob["feature_log_prob"] = serde_json::json!([[], []]);
        fs::write(store.model_path(), blob.to_string()).unwrap();

        assert!(store.load_model().is_err());
        let loaded = store.load_or_create_default(&ModelParams::default()).unwrap();
        assert!((0.0..=1.0).contains(&loaded.model.predict_proba("free prize money now")));
        assert!(store.load_model().unwrap().is_some());
    }

    #[test]
    fn test_unwritable_location_still_starts() {
        let dir = TempDir::new().unwrap();
        // a regular file where the parent directory should be
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "").unwrap();
        let store = ModelStore::new(blocker.join("model.json"), blocker.join("corpus.json"));

        let loaded = store.load_or_create_default(&ModelParams::default()).unwrap();
        assert_eq!(loaded.corpus, TrainingSet::builtin());
        assert!(loaded.model.vocabulary_size() > 0);
    }

    #[test]
    fn test_unreadable_corpus_is_kept_aside() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let truncated = r#"[{"text":"user row one","label":1},{"text":"user row tw"#;
        fs::write(store.corpus_path(), truncated).unwrap();

        let loaded = store.load_or_create_default(&ModelParams::default()).unwrap();
        assert_eq!(loaded.corpus, TrainingSet::builtin());
        assert_eq!(fs::read_to_string(store.rejected_corpus_path()).unwrap(), truncated);
        assert!(store.load_corpus().unwrap().is_some());
    }

    #[test]
    fn test_single_class_corpus_is_kept_aside() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let corpus = TrainingSet::new(vec![TrainingExample::new("user spam only", Label::Spam)]);
        store.save_corpus(&corpus).unwrap();

        let loaded = store.load_or_create_default(&ModelParams::default()).unwrap();
        assert_eq!(loaded.corpus, TrainingSet::builtin());
        assert!(fs::read_to_string(store.rejected_corpus_path()).unwrap().contains("user spam only"));
    }

    #[test]
    fn test_save_replaces_nothing_when_model_write_fails() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "").unwrap();
        let corpus_path = dir.path().join("corpus.json");
        let store = ModelStore::new(blocker.join("model.json"), &corpus_path);

        let old = TrainingSet::new(vec![TrainingExample::new("old row", Label::Ham)]);
        store.save_corpus(&old).unwrap();

        let corpus = TrainingSet::builtin();
        let model = Model::train(&corpus, &ModelParams::default()).unwrap();
        assert!(store.save(&model, &corpus).is_err());

        assert_eq!(store.load_corpus().unwrap().unwrap(), old);
        assert!(!corpus_path.with_extension("tmp").exists());
    }

    #[test]
    fn test_save_writes_both() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let corpus = TrainingSet::builtin();
        let model = Model::train(&corpus, &ModelParams::default()).unwrap();

        store.save(&model, &corpus).unwrap();
        assert_eq!(store.load_corpus().unwrap().unwrap(), corpus);
        assert!(store.load_model().unwrap().is_some());
    }

    #[test]
    fn test_corrupt_model_is_retrained() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        fs::write(store.model_path(), "{ not json").unwrap();

        let loaded = store.load_or_create_default(&ModelParams::default()).unwrap();
        assert!(loaded.model.vocabulary_size() > 0);
        assert!(store.load_model().unwrap().is_some());
    }
}
