use console::style;
use std::path::Path;

use talos_core::TalosError;

/// The file `talos init` writes. Every section is optional; this one wires
/// two template skills to the regex matcher and parser.
pub const STARTER_CONFIG: &str = r#"# Talos configuration

[bot]
channel = "cli"              # cli, telegram or slack
# default_reply = "I have no skill for that, sorry!"

[matcher]
kind = "regex"               # regex or embedding
# acceptance_threshold = 0.8

# [matcher.embedding]
# provider = "ollama"        # ollama or openai (or env: OPENAI_API_KEY)
# model = "nomic-embed-text"

[parser]
kind = "regex"               # regex or ner
# model_path = "./ner_model" # written by `talos trainer` (or env: MODEL_PATH)
# all_required = true

# [channels.telegram]
# token = "123456:ABC..."    # or env: TELEGRAM_TOKEN
# trigger_word = "talos"
# restricted = false
# white_list = [12345678]

# [channels.slack]
# app_token = "xapp-..."     # or env: SLACK_APP_TOKEN
# bot_token = "xoxb-..."     # or env: SLACK_BOT_TOKEN
# trigger_word = "/talos"

[[skills]]
sentence = "(hi|hello)"
reply = "Hello! Try: Execute the job build_42 in the project some/repository"
description = "Say hello"

[[skills]]
sentence = "Execute the job ([a-zA-Z0-9_]+) in the project ([a-zA-Z/]+)"
reply = "Checking pipeline {JOB} for project {PROJECT}..."
description = "Check a CI pipeline"
patterns = { PROJECT = ".*project ([a-zA-Z/]+).*", JOB = ".*job ([a-zA-Z0-9_]+).*" }

[logging]
level = "info"
# format = "pretty"          # pretty, compact or json
# file = "talos.log"         # or env: TALOS_LOG_FILE
"#;

pub(super) fn cmd_init(path: &Path, force: bool) -> talos_core::Result<()> {
    write_starter_config(path, force)?;
    println!("{} Created {}", style("✓").green(), path.display());
    println!("   Try it with: talos ask \"hello\"");
    println!("   Then start the bot with: talos run");
    Ok(())
}

/// Write [`STARTER_CONFIG`] to `path`, creating parent directories.
/// An existing file is only replaced with `force`.
pub(super) fn write_starter_config(path: &Path, force: bool) -> talos_core::Result<()> {
    if path.exists() && !force {
        return Err(TalosError::Config(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, STARTER_CONFIG)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn starter_config_is_valid() {
        let config: talos_config::TalosConfig = toml::from_str(STARTER_CONFIG).unwrap();
        assert_eq!(config.skills.len(), 2);
        assert_eq!(config.skills[1].patterns.len(), 2);
        let warnings = config.validate().unwrap();
        assert!(warnings.is_empty(), "{warnings:?}");
    }

    #[test]
    fn init_refuses_to_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("conf").join("talos.toml");

        write_starter_config(&path, false).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), STARTER_CONFIG);

        std::fs::write(&path, "# mine").unwrap();
        let err = write_starter_config(&path, false).unwrap_err();
        assert!(err.to_string().contains("already exists"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# mine");

        write_starter_config(&path, true).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), STARTER_CONFIG);
    }
}
