use std::sync::Arc;
use talos_channels::{Channel, CliChannel, SlackChannel, TelegramAccess, TelegramChannel};
use talos_config::{
    ChannelKind, ChannelsConfig, MatcherConfig, MatcherKind, ParserConfig, ParserKind, TalosConfig,
};
use talos_core::Result;
use talos_matchers::{EmbeddingMatcher, Matcher, RegexMatcher};
use talos_parsers::{NerParser, Parser, RegexParser};
use talos_skills::{Skill, TemplateReply};
use tracing::info;

use crate::bot::Bot;

pub fn matcher_from_config(config: &MatcherConfig) -> Result<Arc<dyn Matcher>> {
    match config.kind {
        MatcherKind::Regex => Ok(Arc::new(RegexMatcher::new())),
        MatcherKind::Embedding => {
            let provider = talos_embed::provider_from_config(&config.embedding)?;
            info!(
                provider = provider.name(),
                threshold = config.acceptance_threshold,
                "embedding matcher"
            );
            Ok(Arc::new(
                EmbeddingMatcher::new(provider).with_threshold(config.acceptance_threshold),
            ))
        }
    }
}

pub fn parser_from_config(config: &ParserConfig) -> Result<Arc<dyn Parser>> {
    match config.kind {
        ParserKind::Regex => Ok(Arc::new(RegexParser::new())),
        ParserKind::Ner => {
            let parser = NerParser::new(&config.model_path)?;
            info!(
                model = %config.model_path.display(),
                labels = parser.model().labels().len(),
                "NER parser"
            );
            Ok(Arc::new(parser))
        }
    }
}

pub fn channel_from_config(kind: ChannelKind, config: &ChannelsConfig) -> Box<dyn Channel> {
    match kind {
        ChannelKind::Cli => Box::new(CliChannel::new()),
        ChannelKind::Telegram => {
            let tg = &config.telegram;
            let access = TelegramAccess {
                trigger_word: tg.trigger_word.clone(),
                restricted: tg.restricted,
                white_list: tg.white_list.clone(),
            };
            Box::new(
                TelegramChannel::new("telegram".into(), tg.token.clone().unwrap_or_default())
                    .with_access(access),
            )
        }
        ChannelKind::Slack => {
            let slack = &config.slack;
            Box::new(
                SlackChannel::new(
                    "slack".into(),
                    slack.app_token.clone().unwrap_or_default(),
                    slack.bot_token.clone().unwrap_or_default(),
                )
                .with_trigger_word(&slack.trigger_word),
            )
        }
    }
}

impl Bot {
    /// Build the matcher, parser, default reply and `[[skills]]` a config
    /// describes.
    pub fn from_config(config: &TalosConfig) -> Result<Self> {
        let matcher = matcher_from_config(&config.matcher)?;
        let parser = parser_from_config(&config.parser)?;
        let mut bot = Bot::new(matcher, parser).with_all_required(config.parser.all_required);

        if let Some(reply) = &config.bot.default_reply {
            bot.default_match(TemplateReply::new(reply.clone()));
        }

        for skill in &config.skills {
            let mut s = Skill::new(
                skill.sentence.clone(),
                skill.extraction_patterns(),
                TemplateReply::new(skill.reply.clone()),
            );
            if let Some(description) = &skill.description {
                s = s.with_description(description.clone());
            }
            bot.register_skill(s)?;
        }

        info!(skills = bot.skills().len(), "bot configured");
        Ok(bot)
    }
}
