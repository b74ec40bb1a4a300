//! # talos-skills
//!
//! A skill is a handler keyed by a sentence pattern. When an utterance
//! matches the sentence, the bot extracts the skill's parameters and calls
//! the handler, whose return value is the reply.
//!
//! ## Registering skills
//!
//! ```
//! use talos_core::{ExtractionPatterns, Params};
//! use talos_skills::{Skill, SkillRegistry};
//!
//! let mut registry = SkillRegistry::new();
//! registry.register(Skill::new(
//!     "Execute the job ([a-zA-Z0-9_]+) in the project some/repository",
//!     ExtractionPatterns::expressions([("JOB", "job ([a-zA-Z0-9_]+)")]),
//!     |params: &Params| format!("Checking pipeline {}...", params["JOB"]),
//! ));
//! assert_eq!(registry.len(), 1);
//! ```
//!
//! Skills declared in `talos.toml` use a [`TemplateReply`] handler instead of
//! a closure.

pub mod handler;
pub mod registry;

pub use handler::{DEFAULT_REPLY, DefaultReply, SkillHandler, TemplateReply};
pub use registry::{Skill, SkillRegistry};
