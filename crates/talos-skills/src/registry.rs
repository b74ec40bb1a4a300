use std::sync::Arc;
use talos_core::ExtractionPatterns;
use tracing::{debug, info};

use crate::handler::{DefaultReply, SkillHandler};

/// A registered skill: the sentence it answers to, how to extract its
/// parameters, and the handler producing the reply.
#[derive(Clone)]
pub struct Skill {
    pub sentence: String,
    pub patterns: ExtractionPatterns,
    pub handler: Arc<dyn SkillHandler>,
    pub description: Option<String>,
}

impl Skill {
    pub fn new(
        sentence: impl Into<String>,
        patterns: ExtractionPatterns,
        handler: impl SkillHandler + 'static,
    ) -> Self {
        Self {
            sentence: sentence.into(),
            patterns,
            handler: Arc::new(handler),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl std::fmt::Debug for Skill {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Skill")
            .field("sentence", &self.sentence)
            .field("patterns", &self.patterns)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// Sentence-keyed skills plus the default skill.
///
/// Skills keep their registration order, which is the order the regex
/// matcher scans them in. Registering a sentence twice replaces the first
/// skill in place.
pub struct SkillRegistry {
    skills: Vec<Skill>,
    default: Arc<dyn SkillHandler>,
}

impl Default for SkillRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SkillRegistry {
    pub fn new() -> Self {
        Self {
            skills: Vec::new(),
            default: Arc::new(DefaultReply::default()),
        }
    }

    /// Register a skill. Returns the skill it replaced, if any.
    pub fn register(&mut self, skill: Skill) -> Option<Skill> {
        if let Some(existing) = self.skills.iter_mut().find(|s| s.sentence == skill.sentence) {
            debug!(sentence = %skill.sentence, "replacing registered skill");
            return Some(std::mem::replace(existing, skill));
        }
        info!(sentence = %skill.sentence, "registered skill");
        self.skills.push(skill);
        None
    }

    /// Override the skill used when nothing matches.
    pub fn set_default(&mut self, handler: impl SkillHandler + 'static) {
        self.default = Arc::new(handler);
    }

    /// The skill used when nothing matches.
    pub fn default_handler(&self) -> Arc<dyn SkillHandler> {
        Arc::clone(&self.default)
    }

    /// Get a skill by its sentence.
    pub fn get(&self, sentence: &str) -> Option<&Skill> {
        self.skills.iter().find(|s| s.sentence == sentence)
    }

    /// Registered sentences, in registration order.
    pub fn sentences(&self) -> Vec<&str> {
        self.skills.iter().map(|s| s.sentence.as_str()).collect()
    }

    /// All registered skills, in registration order.
    pub fn list(&self) -> &[Skill] {
        &self.skills
    }

    /// Remove a skill by sentence.
    pub fn remove(&mut self, sentence: &str) -> bool {
        let before = self.skills.len();
        self.skills.retain(|s| s.sentence != sentence);
        self.skills.len() < before
    }

    pub fn len(&self) -> usize {
        self.skills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{DEFAULT_REPLY, TemplateReply};
    use talos_core::Params;

    fn skill(sentence: &str, reply: &'static str) -> Skill {
        Skill::new(sentence, ExtractionPatterns::None, move |_: &Params| reply.to_string())
    }

    #[test]
    fn register_and_list_skills() {
        let mut reg = SkillRegistry::new();
        assert!(reg.is_empty());
        reg.register(skill("hello", "hi"));
        reg.register(skill("bye", "ciao"));

        assert_eq!(reg.len(), 2);
        assert_eq!(reg.sentences(), vec!["hello", "bye"]);
        assert!(reg.get("hello").is_some());
        assert!(reg.get("nonexistent").is_none());
    }

    #[tokio::test]
    async fn re_registering_replaces_in_place() {
        let mut reg = SkillRegistry::new();
        reg.register(skill("a", "first"));
        reg.register(skill("b", "b"));
        let replaced = reg.register(skill("a", "second"));

        assert!(replaced.is_some());
        assert_eq!(reg.sentences(), vec!["a", "b"]);
        let out = reg.get("a").unwrap().handler.handle(&Params::new()).await.unwrap();
        assert_eq!(out, "second");
    }

    #[test]
    fn remove_skill() {
        let mut reg = SkillRegistry::new();
        reg.register(skill("a", "x"));
        assert!(reg.remove("a"));
        assert!(!reg.remove("a"));
        assert!(reg.is_empty());
    }

    #[tokio::test]
    async fn default_skill_can_be_overridden() {
        let mut reg = SkillRegistry::new();
        let out = reg.default_handler().handle(&Params::new()).await.unwrap();
        assert_eq!(out, DEFAULT_REPLY);

        reg.set_default(TemplateReply::new("No skill, my bad!"));
        let out = reg.default_handler().handle(&Params::new()).await.unwrap();
        assert_eq!(out, "No skill, my bad!");
    }

    #[test]
    fn skill_debug_omits_handler() {
        let s = skill("a", "x").with_description("says x");
        let dbg = format!("{s:?}");
        assert!(dbg.contains("says x"));
        assert!(dbg.contains(".."));
    }
}
