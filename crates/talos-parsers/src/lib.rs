//! # talos-parsers
//!
//! Parsers extract a skill's named parameters from the utterance.
//!
//! - [`RegexParser`]: one regular expression per parameter, the first
//!   capture group is the value.
//! - [`NerParser`]: a named-entity model trained with `talos trainer`
//!   recognises entities; the entity label is the parameter name.

pub mod ner;
pub mod parser;
pub mod regex_parser;
pub mod trainer;

pub use ner::{Entity, MODEL_FILE, NerModel, NerParser};
pub use parser::Parser;
pub use regex_parser::RegexParser;
pub use trainer::{
    DEFAULT_ITERATIONS, EntitySpan, NerTrainer, TrainingExample, TrainingMeta, TrainingSet,
};
