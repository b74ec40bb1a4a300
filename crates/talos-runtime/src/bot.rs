use std::sync::Arc;
use talos_channels::{Channel, ChannelEvent, OutgoingMessage};
use talos_core::{ExtractionPatterns, Message, Params, Result, TalosError};
use talos_matchers::Matcher;
use talos_parsers::Parser;
use talos_skills::{Skill, SkillHandler, SkillRegistry};
use tracing::{debug, error, info, warn};

/// The bot: skills plus the strategies that pick one and feed it.
///
/// An utterance goes through the matcher (which registered sentence?), the
/// parser (which parameters?) and finally the skill handler (which reply?).
pub struct Bot {
    matcher: Arc<dyn Matcher>,
    parser: Arc<dyn Parser>,
    skills: SkillRegistry,
    all_required: bool,
}

impl Bot {
    pub fn new(matcher: Arc<dyn Matcher>, parser: Arc<dyn Parser>) -> Self {
        Self {
            matcher,
            parser,
            skills: SkillRegistry::new(),
            all_required: true,
        }
    }

    /// Whether every parameter a skill asks for must be found.
    pub fn with_all_required(mut self, all_required: bool) -> Self {
        self.all_required = all_required;
        self
    }

    pub fn matcher(&self) -> &dyn Matcher {
        self.matcher.as_ref()
    }

    pub fn parser(&self) -> &dyn Parser {
        self.parser.as_ref()
    }

    pub fn skills(&self) -> &SkillRegistry {
        &self.skills
    }

    /// Register a skill answering to `sentence`.
    ///
    /// The matcher and the parser check the sentence and patterns first, so a
    /// bad expression fails here instead of on the first message.
    pub fn register(
        &mut self,
        sentence: impl Into<String>,
        patterns: ExtractionPatterns,
        handler: impl SkillHandler + 'static,
    ) -> Result<()> {
        self.register_skill(Skill::new(sentence, patterns, handler))
    }

    pub fn register_skill(&mut self, skill: Skill) -> Result<()> {
        self.matcher.prepare(&skill.sentence)?;
        self.parser.validate(&skill.patterns)?;
        if self.skills.register(skill).is_some() {
            debug!("skill replaced");
        }
        Ok(())
    }

    /// Remove the skill answering to `sentence`, and whatever the matcher
    /// cached for it. Returns false if no such skill was registered.
    pub fn unregister(&mut self, sentence: &str) -> bool {
        self.matcher.forget(sentence);
        self.skills.remove(sentence)
    }

    /// Replace the skill used when nothing matches.
    pub fn default_match(&mut self, handler: impl SkillHandler + 'static) {
        self.skills.set_default(handler);
    }

    /// Run the skill `sentence` refers to and return its reply.
    ///
    /// An utterance no skill matches (or that matches two equally well) gets
    /// the default skill. Parameter extraction and handler failures are
    /// returned as errors.
    pub async fn execute_skill(&self, sentence: &str) -> Result<String> {
        let candidates = self.skills.sentences();
        let matched = match self.matcher.sentence_matcher(sentence, &candidates).await {
            Ok(matched) => matched,
            Err(e @ (TalosError::NoMatchingSkill(_) | TalosError::AmbiguousScore(_))) => {
                warn!(matcher = self.matcher.name(), "Cannot match any sentence, getting the default one: {e}");
                return self.skills.default_handler().handle(&Params::new()).await;
            }
            Err(e) => return Err(e),
        };

        let skill = self.skills.get(&matched).ok_or_else(|| {
            TalosError::NoMatchingSkill(format!("matched sentence is not registered: {matched}"))
        })?;
        debug!(sentence = %matched, "matched skill");

        let params = self
            .parser
            .extract_parameters(sentence, &skill.patterns, self.all_required)?;
        debug!(parser = self.parser.name(), ?params, "Extracted parameters");

        skill.handler.handle(&params).await.map_err(|e| match e {
            TalosError::Skill { .. } => e,
            other => TalosError::Skill {
                skill: matched.clone(),
                reason: other.to_string(),
            },
        })
    }

    /// Answer a message. The reply keeps the message's `meta`; failures
    /// become an apology so the user always hears back.
    pub async fn message_handler(&self, message: &Message) -> Message {
        match self.execute_skill(&message.text).await {
            Ok(reply) => message.reply(reply),
            Err(e) => {
                error!(error = %e, text = %message.text, "failed to handle message");
                message.reply(format!("Sorry, I couldn't process that: {e}"))
            }
        }
    }

    /// Serve a channel until it closes or the process is interrupted.
    pub async fn run(&self, channel: Box<dyn Channel>) -> Result<()> {
        self.run_until(channel, async {
            let _ = tokio::signal::ctrl_c().await;
            info!("interrupted, shutting down");
        })
        .await
    }

    /// Serve a channel until it closes or `shutdown` completes. A shutdown
    /// requested while a message is being handled ends the loop right after
    /// the reply is sent.
    pub async fn run_until(
        &self,
        mut channel: Box<dyn Channel>,
        shutdown: impl Future<Output = ()>,
    ) -> Result<()> {
        let mut events = channel.start().await?;
        info!(
            channel = channel.channel_type(),
            matcher = self.matcher.name(),
            parser = self.parser.name(),
            skills = self.skills.len(),
            "bot running"
        );

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(ChannelEvent::Message(incoming)) => {
                        let _ = channel.send_typing(&incoming.target).await;
                        let reply = self.message_handler(&incoming.to_message()).await;
                        match OutgoingMessage::from_reply(&reply) {
                            Some(out) => {
                                if let Err(e) = channel.send(out).await {
                                    error!(error = %e, channel = channel.id(), "failed to send reply");
                                }
                            }
                            None => warn!("reply has no route back to the channel"),
                        }
                    }
                    Some(ChannelEvent::Connected) => {
                        info!(channel = channel.id(), "channel connected");
                    }
                    Some(ChannelEvent::Disconnected(reason)) => {
                        info!(channel = channel.id(), reason = ?reason, "channel disconnected");
                    }
                    None => break,
                },
                _ = &mut shutdown => break,
            }
        }

        channel.stop().await?;
        info!("bot stopped");
        Ok(())
    }
}
