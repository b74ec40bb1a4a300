use serde::{Deserialize, Serialize};
use std::path::Path;
use talos_core::{Result, TalosError};
use tracing::{debug, info};

use crate::ner::NerModel;

/// Training passes used by `talos trainer`.
pub const DEFAULT_ITERATIONS: usize = 100;

/// Training set file: declared labels plus annotated example sentences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSet {
    pub meta: TrainingMeta,
    pub training_data: Vec<TrainingExample>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingMeta {
    /// Entity labels used in the training data.
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingExample {
    pub sentence: String,
    pub entities: Vec<EntitySpan>,
}

/// An annotated entity. `start` and `end` are character offsets, `end`
/// exclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySpan {
    pub label: String,
    pub start: usize,
    pub end: usize,
}

impl TrainingSet {
    /// Parse and validate a training set.
    pub fn from_json(content: &str) -> Result<Self> {
        let set: TrainingSet =
            serde_json::from_str(content).map_err(|e| TalosError::TrainingSet(e.to_string()))?;
        set.validate()?;
        Ok(set)
    }

    /// Check label names and entity offsets.
    pub fn validate(&self) -> Result<()> {
        if let Some(i) = self.meta.labels.iter().position(|l| l.trim().is_empty()) {
            return Err(TalosError::TrainingSet(format!("meta.labels[{i}] is empty")));
        }

        for (i, example) in self.training_data.iter().enumerate() {
            let chars = example.sentence.chars().count();
            for (j, ent) in example.entities.iter().enumerate() {
                let at = format!("training_data[{i}].entities[{j}]");
                if ent.label.trim().is_empty() {
                    return Err(TalosError::TrainingSet(format!("{at}: empty label")));
                }
                if !self.meta.labels.contains(&ent.label) {
                    return Err(TalosError::TrainingSet(format!(
                        "{at}: label '{}' is not declared in meta.labels",
                        ent.label
                    )));
                }
                if ent.start > ent.end || ent.end > chars {
                    return Err(TalosError::TrainingSet(format!(
                        "{at}: span {}..{} is outside the {chars}-character sentence",
                        ent.start, ent.end
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Trains [`NerModel`]s from training set files.
pub struct NerTrainer;

impl NerTrainer {
    /// Read and validate the training set at `path`.
    pub fn load_training_set(path: impl AsRef<Path>) -> Result<TrainingSet> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            TalosError::TrainingSet(format!("cannot read {}: {e}", path.display()))
        })?;
        let set = TrainingSet::from_json(&content)?;
        info!(
            path = %path.display(),
            examples = set.training_data.len(),
            labels = set.meta.labels.len(),
            "loaded training set"
        );
        Ok(set)
    }

    /// A blank model, or the model stored in `from_model` to keep training it.
    pub fn build_model(from_model: Option<&Path>) -> Result<NerModel> {
        match from_model {
            Some(dir) => {
                let model = NerModel::load(dir)?;
                info!(model = %dir.display(), "loaded model");
                Ok(model)
            }
            None => {
                info!("created blank model");
                Ok(NerModel::blank())
            }
        }
    }

    /// Train `model` on `training_set` for `n_iter` passes.
    ///
    /// Returns the number of wrongly tagged tokens seen in the last pass.
    /// Training stops early once a pass makes no mistakes.
    pub fn train_model(model: &mut NerModel, training_set: &TrainingSet, n_iter: usize) -> usize {
        for label in &training_set.meta.labels {
            if model.add_label(label.clone()) {
                debug!(label = %label, "added label");
            }
        }

        let mut losses = 0;
        for ith in 0..n_iter {
            debug!("Starting iteration #{ith}");
            losses = training_set
                .training_data
                .iter()
                .map(|example| model.update(example))
                .sum();
            info!("Iteration {ith} - Losses: {losses}");
            if losses == 0 {
                debug!("converged after {} iterations", ith + 1);
                break;
            }
        }
        losses
    }

    pub fn save_model(model: &NerModel, output_dir: impl AsRef<Path>) -> Result<()> {
        let path = model.save(output_dir.as_ref())?;
        info!("Model saved into {}", path.display());
        Ok(())
    }

    /// Build, train and save a model.
    pub fn run(
        training_set_path: impl AsRef<Path>,
        output_model: impl AsRef<Path>,
        from_model: Option<&Path>,
    ) -> Result<NerModel> {
        let mut model = Self::build_model(from_model)?;
        let training_set = Self::load_training_set(training_set_path)?;
        Self::train_model(&mut model, &training_set, DEFAULT_ITERATIONS);
        Self::save_model(&model, output_model)?;
        Ok(model)
    }
}
