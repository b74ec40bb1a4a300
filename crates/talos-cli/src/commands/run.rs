use console::style;
use tracing::info;

use talos_config::{ChannelKind, TalosConfig};
use talos_core::Message;
use talos_runtime::{Bot, channel_from_config};

pub(super) async fn cmd_run(config: &TalosConfig, channel: ChannelKind) -> talos_core::Result<()> {
    let bot = Bot::from_config(config)?;

    if channel == ChannelKind::Cli {
        println!(
            "{} v{}  {} skills, {} matcher, {} parser",
            style("Talos").bold(),
            env!("CARGO_PKG_VERSION"),
            bot.skills().len(),
            bot.matcher().name(),
            bot.parser().name(),
        );
        println!("{}", style("Type 'exit' or press Ctrl-D to quit.").dim());
    }

    info!(%channel, "starting bot");
    bot.run(channel_from_config(channel, &config.channels)).await
}

pub(super) async fn cmd_ask(config: &TalosConfig, sentence: &str) -> talos_core::Result<()> {
    let bot = Bot::from_config(config)?;
    let reply = bot.message_handler(&Message::new(sentence)).await;
    println!("{}", reply.text);
    Ok(())
}
