use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use talos_core::{ExtractionPatterns, Params, Result, TalosError};
use tracing::{debug, info, warn};

use crate::parser::Parser;
use crate::trainer::TrainingExample;

/// File holding the model inside a model directory.
pub const MODEL_FILE: &str = "model.json";

const MODEL_FORMAT: u32 = 1;

/// Context cue used for the first token of a sentence.
const SENTENCE_START: &str = "<s>";

/// A recognised entity. `start` and `end` are character offsets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub label: String,
    pub text: String,
    pub start: usize,
    pub end: usize,
}

/// A whitespace token with surrounding punctuation trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Token {
    pub text: String,
    pub start: usize,
    pub end: usize,
}

impl Token {
    fn key(&self) -> String {
        self.text.to_lowercase()
    }
}

fn is_trimmed(c: char) -> bool {
    matches!(
        c,
        ',' | '.' | ';' | ':' | '!' | '?' | '"' | '\'' | '(' | ')' | '[' | ']' | '{' | '}' | '<' | '>'
    )
}

/// Split on whitespace, keeping character offsets.
pub(crate) fn tokenize(sentence: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut current: Vec<(usize, char)> = Vec::new();

    let mut flush = |current: &mut Vec<(usize, char)>| {
        let word = std::mem::take(current);
        let first = word.iter().position(|(_, c)| !is_trimmed(*c));
        let last = word.iter().rposition(|(_, c)| !is_trimmed(*c));
        if let (Some(first), Some(last)) = (first, last) {
            let chars = &word[first..=last];
            tokens.push(Token {
                text: chars.iter().map(|(_, c)| *c).collect(),
                start: chars[0].0,
                end: chars[chars.len() - 1].0 + 1,
            });
        }
    };

    for (idx, c) in sentence.chars().enumerate() {
        if c.is_whitespace() {
            flush(&mut current);
        } else {
            current.push((idx, c));
        }
    }
    flush(&mut current);
    tokens
}

/// Named-entity model learned by `NerTrainer`.
///
/// Per label the model keeps a gazetteer of entity surface forms seen in
/// training and a weight for every token that preceded an entity (its
/// context cue). A token is tagged when it is a known surface form, or when
/// the token before it is a cue with positive weight; the highest weight
/// wins and earlier labels win ties. Entities never span several tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NerModel {
    format: u32,
    labels: Vec<String>,
    #[serde(default)]
    gazetteer: BTreeMap<String, BTreeSet<String>>,
    #[serde(default)]
    contexts: BTreeMap<String, BTreeMap<String, i64>>,
}

impl Default for NerModel {
    fn default() -> Self {
        Self::blank()
    }
}

impl NerModel {
    /// A model that knows no labels.
    pub fn blank() -> Self {
        Self {
            format: MODEL_FORMAT,
            labels: Vec::new(),
            gazetteer: BTreeMap::new(),
            contexts: BTreeMap::new(),
        }
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    /// Register a label. Returns false if it was already known.
    pub fn add_label(&mut self, label: impl Into<String>) -> bool {
        let label = label.into();
        if self.has_label(&label) {
            return false;
        }
        self.labels.push(label);
        true
    }

    /// Number of distinct surface forms known for `label`.
    pub fn surface_forms(&self, label: &str) -> usize {
        self.gazetteer.get(label).map_or(0, BTreeSet::len)
    }

    pub fn model_file(dir: &Path) -> PathBuf {
        dir.join(MODEL_FILE)
    }

    /// Load `model.json` from a model directory.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let path = Self::model_file(dir.as_ref());
        if !path.exists() {
            return Err(TalosError::Model(format!(
                "no NER model at {} (train one with `talos trainer`)",
                path.display()
            )));
        }
        let content = std::fs::read_to_string(&path)?;
        let model: NerModel = serde_json::from_str(&content)
            .map_err(|e| TalosError::Model(format!("{}: {e}", path.display())))?;
        if model.format != MODEL_FORMAT {
            return Err(TalosError::Model(format!(
                "{}: unsupported model format {} (expected {MODEL_FORMAT})",
                path.display(),
                model.format
            )));
        }
        debug!(path = %path.display(), labels = model.labels.len(), "loaded NER model");
        Ok(model)
    }

    /// Write `model.json` into `dir`, creating the directory when missing.
    pub fn save(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        let path = Self::model_file(dir);
        std::fs::write(&path, serde_json::to_string_pretty(self)?)?;
        info!(path = %path.display(), "NER model saved");
        Ok(path)
    }

    fn predict(&self, tokens: &[Token], i: usize) -> Option<&str> {
        let key = tokens[i].key();
        if let Some(label) = self
            .labels
            .iter()
            .find(|l| self.gazetteer.get(*l).is_some_and(|g| g.contains(&key)))
        {
            return Some(label.as_str());
        }

        let cue = if i == 0 {
            SENTENCE_START.to_string()
        } else {
            tokens[i - 1].key()
        };
        let mut best: Option<(&str, i64)> = None;
        for label in &self.labels {
            let weight = self
                .contexts
                .get(label)
                .and_then(|c| c.get(&cue))
                .copied()
                .unwrap_or(0);
            if weight > 0 && best.is_none_or(|(_, w)| weight > w) {
                best = Some((label.as_str(), weight));
            }
        }
        best.map(|(label, _)| label)
    }

    /// Entities found in `sentence`, in sentence order.
    pub fn recognize(&self, sentence: &str) -> Vec<Entity> {
        let tokens = tokenize(sentence);
        (0..tokens.len())
            .filter_map(|i| {
                self.predict(&tokens, i).map(|label| Entity {
                    label: label.to_string(),
                    text: tokens[i].text.clone(),
                    start: tokens[i].start,
                    end: tokens[i].end,
                })
            })
            .collect()
    }

    /// One training step on `example`. Returns the number of tokens the
    /// model tagged wrongly before the update.
    ///
    /// A wrong tag is unlearned where it came from: a surface form leaves
    /// the gazetteer, a cue loses weight.
    pub fn update(&mut self, example: &TrainingExample) -> usize {
        let tokens = tokenize(&example.sentence);
        let gold: Vec<Option<&str>> = tokens
            .iter()
            .map(|t| {
                example
                    .entities
                    .iter()
                    .find(|e| t.start >= e.start && t.end <= e.end)
                    .map(|e| e.label.as_str())
            })
            .collect();

        for entity in &example.entities {
            self.add_label(entity.label.clone());
            if !tokens.iter().any(|t| t.start == entity.start && t.end == entity.end) {
                debug!(
                    label = %entity.label,
                    start = entity.start,
                    end = entity.end,
                    "entity does not align with a single token"
                );
            }
        }

        let mut errors = 0;
        let mut corrections: Vec<(String, String, i64)> = Vec::new();
        for (i, token) in tokens.iter().enumerate() {
            let predicted = self.predict(&tokens, i).map(str::to_string);
            if predicted.as_deref() == gold[i] {
                continue;
            }
            errors += 1;
            let cue = if i == 0 {
                SENTENCE_START.to_string()
            } else {
                tokens[i - 1].key()
            };
            if let Some(label) = gold[i] {
                corrections.push((label.to_string(), cue.clone(), 1));
                self.gazetteer
                    .entry(label.to_string())
                    .or_default()
                    .insert(token.key());
            }
            if let Some(label) = predicted {
                let key = token.key();
                let from_gazetteer = self
                    .gazetteer
                    .get_mut(&label)
                    .is_some_and(|forms| forms.remove(&key));
                if from_gazetteer {
                    debug!(label = %label, token = %key, "dropped surface form");
                } else {
                    corrections.push((label, cue, -1));
                }
            }
        }

        for (label, cue, delta) in corrections {
            *self
                .contexts
                .entry(label)
                .or_default()
                .entry(cue)
                .or_insert(0) += delta;
        }
        errors
    }
}

/// Parser backed by an [`NerModel`]. Entity labels are parameter names.
pub struct NerParser {
    model: NerModel,
}

impl NerParser {
    /// Load the model stored in `model_path`.
    pub fn new(model_path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::from_model(NerModel::load(model_path)?))
    }

    pub fn from_model(model: NerModel) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &NerModel {
        &self.model
    }

    fn labels(patterns: &ExtractionPatterns) -> BTreeSet<String> {
        patterns.names().into_iter().map(str::to_string).collect()
    }
}

impl Parser for NerParser {
    fn name(&self) -> &str {
        "ner"
    }

    fn validate(&self, patterns: &ExtractionPatterns) -> Result<()> {
        for label in Self::labels(patterns) {
            if !self.model.has_label(&label) {
                warn!(label = %label, "NER model was not trained on this label");
            }
        }
        Ok(())
    }

    fn extract_parameters(
        &self,
        sentence: &str,
        patterns: &ExtractionPatterns,
        all_required: bool,
    ) -> Result<Params> {
        let entities = self.model.recognize(sentence);
        for ent in &entities {
            debug!(label = %ent.label, text = %ent.text, "recognised entity");
        }

        let mut parameters = Params::new();
        for label in Self::labels(patterns) {
            match entities.iter().rev().find(|e| e.label == label) {
                Some(ent) => {
                    parameters.insert(label, ent.text.clone());
                }
                None if all_required => {
                    return Err(TalosError::MissingParameters(format!(
                        "Could not extract any parameter for {label} entity"
                    )));
                }
                None => {}
            }
        }
        Ok(parameters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trainer::EntitySpan;

    fn example(sentence: &str, entities: &[(&str, usize, usize)]) -> TrainingExample {
        TrainingExample {
            sentence: sentence.to_string(),
            entities: entities
                .iter()
                .map(|(label, start, end)| EntitySpan {
                    label: label.to_string(),
                    start: *start,
                    end: *end,
                })
                .collect(),
        }
    }

    #[test]
    fn tokenize_trims_punctuation_and_keeps_offsets() {
        let tokens = tokenize("Run job build_42, now!");
        let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["Run", "job", "build_42", "now"]);
        assert_eq!((tokens[2].start, tokens[2].end), (8, 16));
        assert_eq!((tokens[3].start, tokens[3].end), (18, 21));
    }

    #[test]
    fn tokenize_uses_char_offsets() {
        let tokens = tokenize("héllo wörld");
        assert_eq!((tokens[1].start, tokens[1].end), (6, 11));
    }

    #[test]
    fn tokenize_drops_pure_punctuation() {
        assert!(tokenize(" ... !! ").is_empty());
    }

    #[test]
    fn blank_model_recognises_nothing() {
        assert!(NerModel::blank().recognize("Run job build_42").is_empty());
    }

    #[test]
    fn update_learns_gazetteer_and_cue() {
        let mut model = NerModel::blank();
        let errors = model.update(&example("Run job build_42", &[("JOB", 8, 16)]));
        assert_eq!(errors, 1);
        assert_eq!(model.labels(), &["JOB".to_string()]);
        assert_eq!(model.surface_forms("JOB"), 1);

        // Known surface form and learned cue.
        let ents = model.recognize("please run job deploy_7");
        assert_eq!(ents.len(), 1);
        assert_eq!(ents[0].text, "deploy_7");
        assert_eq!(model.update(&example("Run job build_42", &[("JOB", 8, 16)])), 0);
    }

    #[test]
    fn wrong_cue_is_penalised() {
        let mut model = NerModel::blank();
        model.update(&example("the job build_1", &[("JOB", 8, 15)]));
        assert_eq!(model.recognize("the job x9").len(), 1);

        assert_eq!(model.update(&example("the job failed", &[])), 1);
        assert!(model.recognize("the job x9").is_empty());
        // The surface form is still known.
        assert_eq!(model.recognize("the job build_1")[0].text, "build_1");
    }

    #[test]
    fn wrong_surface_form_is_forgotten() {
        let mut model = NerModel::blank();
        model.update(&example("run job build", &[("JOB", 8, 13)]));
        assert_eq!(model.recognize("build the app").len(), 1);

        assert_eq!(model.update(&example("build the app", &[])), 1);
        assert_eq!(model.surface_forms("JOB"), 0);
        assert!(model.recognize("build the app").is_empty());
        // The cue still tags the word where it is an entity.
        assert_eq!(model.recognize("run job build")[0].text, "build");
    }

    #[test]
    fn parser_takes_last_entity_for_label() {
        let mut model = NerModel::blank();
        model.update(&example("job a1", &[("JOB", 4, 6)]));
        let parser = NerParser::from_model(model);
        let params = parser
            .extract_parameters("job a1 then job b2", &ExtractionPatterns::entities(["JOB"]), true)
            .unwrap();
        assert_eq!(params["JOB"], "b2");
    }

    #[test]
    fn parser_missing_label() {
        let parser = NerParser::from_model(NerModel::blank());
        let err = parser
            .extract_parameters("hello", &ExtractionPatterns::entities(["JOB"]), true)
            .unwrap_err();
        assert_eq!(err.to_string(), "Could not extract any parameter for JOB entity");

        let params = parser
            .extract_parameters("hello", &ExtractionPatterns::entities(["JOB"]), false)
            .unwrap();
        assert!(params.is_empty());
    }
}
