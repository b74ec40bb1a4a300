#[cfg(test)]
mod tests {
    use clap::Parser;
    use talos_cli::Cli;
    use talos_cli::commands::STARTER_CONFIG;
    use talos_config::{ConfigLoader, TalosConfig};
    use talos_runtime::Bot;

    // ── Argument parsing ───────────────────────────────────────

    #[test]
    fn test_every_subcommand_parses() {
        for args in [
            vec!["talos", "run"],
            vec!["talos", "run", "--channel", "slack"],
            vec!["talos", "ask", "hello"],
            vec!["talos", "trainer", "--trainingset", "a.json", "--output", "m", "--model", "old"],
            vec!["talos", "skills"],
            vec!["talos", "config", "--json"],
            vec!["talos", "init", "--force"],
            vec!["talos", "completions", "zsh"],
        ] {
            assert!(Cli::try_parse_from(&args).is_ok(), "{args:?}");
        }
    }

    #[test]
    fn test_unknown_subcommand_fails() {
        assert!(Cli::try_parse_from(["talos", "serve"]).is_err());
        assert!(Cli::try_parse_from(["talos"]).is_err());
    }

    // ── Starter config ─────────────────────────────────────────

    #[tokio::test]
    async fn test_starter_config_answers() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("talos.toml");
        std::fs::write(&path, STARTER_CONFIG).unwrap();

        let loader = ConfigLoader::load(Some(path.as_path())).unwrap();
        let config: TalosConfig = loader.get();
        let bot = Bot::from_config(&config).unwrap();

        assert_eq!(bot.skills().len(), 2);
        assert!(bot.execute_skill("hello").await.unwrap().starts_with("Hello!"));
        assert_eq!(
            bot.execute_skill("Execute the job build_42 in the project some/repository")
                .await
                .unwrap(),
            "Checking pipeline build_42 for project some/repository..."
        );
    }
}
