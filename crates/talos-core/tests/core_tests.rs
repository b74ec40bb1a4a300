#[cfg(test)]
mod tests {
    use talos_core::*;

    // ── Message tests ──────────────────────────────────────────

    #[test]
    fn test_message_new_has_no_meta() {
        let msg = Message::new("hello");
        assert_eq!(msg.text, "hello");
        assert!(msg.meta.is_empty());
    }

    #[test]
    fn test_reply_keeps_meta() {
        let mut meta = serde_json::Map::new();
        meta.insert("chat_id".into(), serde_json::json!("42"));
        let msg = Message::with_meta("ping", meta);
        let reply = msg.reply("pong");
        assert_eq!(reply.text, "pong");
        assert_eq!(reply.meta_str("chat_id"), Some("42"));
        assert_ne!(reply.id, msg.id);
    }

    #[test]
    fn test_message_serde_skips_empty_meta() {
        let msg = Message::new("test message");
        let json = serde_json::to_string(&msg).unwrap();
        assert!(!json.contains("meta"));
        let restored: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.text, "test message");
    }

    // ── Pattern tests ──────────────────────────────────────────

    #[test]
    fn test_expression_names_keep_order() {
        let patterns = ExtractionPatterns::expressions([
            ("PROJECT", ".*project ([a-zA-Z/]+).*"),
            ("JOB", ".*job ([a-zA-Z0-9_]+).*"),
        ]);
        assert_eq!(patterns.names(), vec!["PROJECT", "JOB"]);
    }

    #[test]
    fn test_entity_names() {
        let patterns = ExtractionPatterns::entities(["PROJECT", "JOB"]);
        assert_eq!(patterns.names(), vec!["PROJECT", "JOB"]);
        assert!(!patterns.is_none());
        assert!(ExtractionPatterns::default().is_none());
        assert!(ExtractionPatterns::None.names().is_empty());
    }

    // ── Error tests ────────────────────────────────────────────

    #[test]
    fn test_missing_parameters_display_is_bare() {
        let err = TalosError::MissingParameters("Missing required parameter: JOB".into());
        assert_eq!(err.to_string(), "Missing required parameter: JOB");
    }

    #[test]
    fn test_no_match_classification() {
        assert!(TalosError::NoMatchingSkill("x".into()).is_no_match());
        assert!(TalosError::AmbiguousScore("x".into()).is_no_match());
        assert!(!TalosError::Embedding("x".into()).is_no_match());
    }

    #[test]
    fn test_error_invalid_pattern() {
        let err = TalosError::InvalidPattern {
            pattern: "(".into(),
            reason: "unclosed group".into(),
        };
        let s = err.to_string();
        assert!(s.contains("("));
        assert!(s.contains("unclosed group"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err: TalosError = io_err.into();
        assert!(matches!(err, TalosError::Io(_)));
        assert!(err.to_string().contains("file missing"));
    }
}
