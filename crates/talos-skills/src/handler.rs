use async_trait::async_trait;
use talos_core::{Params, Result};

/// Reply of the built-in default skill.
pub const DEFAULT_REPLY: &str = "I have no skill for that, sorry!";

/// Something that turns extracted parameters into a reply.
///
/// Plain closures `Fn(&Params) -> String` implement this trait, so most
/// skills never name it. Implement it directly for skills that do I/O or
/// can fail.
#[async_trait]
pub trait SkillHandler: Send + Sync {
    async fn handle(&self, params: &Params) -> Result<String>;
}

#[async_trait]
impl<F> SkillHandler for F
where
    F: Fn(&Params) -> String + Send + Sync,
{
    async fn handle(&self, params: &Params) -> Result<String> {
        Ok(self(params))
    }
}

/// A fixed reply that ignores parameters. Backs the default skill.
#[derive(Debug, Clone)]
pub struct DefaultReply(pub String);

impl Default for DefaultReply {
    fn default() -> Self {
        Self(DEFAULT_REPLY.to_string())
    }
}

#[async_trait]
impl SkillHandler for DefaultReply {
    async fn handle(&self, _params: &Params) -> Result<String> {
        Ok(self.0.clone())
    }
}

/// A reply template where `{NAME}` is replaced with parameter `NAME`.
///
/// Placeholders without a matching parameter are left verbatim, and `{{` /
/// `}}` produce literal braces.
#[derive(Debug, Clone)]
pub struct TemplateReply {
    template: String,
}

impl TemplateReply {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn render(&self, params: &Params) -> String {
        let mut out = String::with_capacity(self.template.len());
        let mut rest = self.template.as_str();

        while let Some(pos) = rest.find(['{', '}']) {
            out.push_str(&rest[..pos]);
            let tail = &rest[pos..];

            if tail.starts_with("{{") {
                out.push('{');
                rest = &tail[2..];
            } else if tail.starts_with("}}") {
                out.push('}');
                rest = &tail[2..];
            } else if tail.starts_with('{') {
                match tail[1..].find('}') {
                    Some(end) => {
                        let name = &tail[1..1 + end];
                        match params.get(name) {
                            Some(value) => out.push_str(value),
                            None => out.push_str(&tail[..end + 2]),
                        }
                        rest = &tail[end + 2..];
                    }
                    None => {
                        out.push_str(tail);
                        rest = "";
                    }
                }
            } else {
                out.push('}');
                rest = &tail[1..];
            }
        }
        out.push_str(rest);
        out
    }
}

#[async_trait]
impl SkillHandler for TemplateReply {
    async fn handle(&self, params: &Params) -> Result<String> {
        Ok(self.render(params))
    }
}
