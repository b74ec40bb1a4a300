#[cfg(test)]
mod tests {
    use std::path::Path;
    use talos_core::{ExtractionPatterns, TalosError};
    use talos_parsers::{MODEL_FILE, NerModel, NerParser, NerTrainer, Parser, RegexParser, TrainingSet};
    use tempfile::TempDir;

    const TRAINING_SET: &str = r#"{
        "meta": { "labels": ["JOB", "PROJECT"] },
        "training_data": [
            {
                "sentence": "Execute the job build_42 in the project some/repository",
                "entities": [
                    { "label": "JOB", "start": 16, "end": 24 },
                    { "label": "PROJECT", "start": 40, "end": 55 }
                ]
            },
            {
                "sentence": "Run the job deploy_prod in the project acme/web",
                "entities": [
                    { "label": "JOB", "start": 12, "end": 23 },
                    { "label": "PROJECT", "start": 39, "end": 47 }
                ]
            }
        ]
    }"#;

    fn write_training_set(dir: &Path, content: &str) -> std::path::PathBuf {
        let path = dir.join("training.json");
        std::fs::write(&path, content).unwrap();
        path
    }

    fn job_entities() -> ExtractionPatterns {
        ExtractionPatterns::entities(["JOB", "PROJECT", "JOB"])
    }

    // ── Regex parser ───────────────────────────────────────────

    #[test]
    fn test_regex_parser_pipeline_example() {
        let parser = RegexParser::new();
        let patterns = ExtractionPatterns::expressions([
            ("PROJECT", ".*project ([a-zA-Z/]+).*"),
            ("JOB", ".*job ([a-zA-Z0-9_]+).*"),
        ]);
        parser.validate(&patterns).unwrap();
        let params = parser
            .extract_parameters(
                "Execute the job build_42 in the project some/repository",
                &patterns,
                true,
            )
            .unwrap();
        assert_eq!(params["PROJECT"], "some/repository");
        assert_eq!(params["JOB"], "build_42");
    }

    // ── Training set ───────────────────────────────────────────

    #[test]
    fn test_load_training_set() {
        let dir = TempDir::new().unwrap();
        let path = write_training_set(dir.path(), TRAINING_SET);
        let set = NerTrainer::load_training_set(&path).unwrap();
        assert_eq!(set.meta.labels, vec!["JOB", "PROJECT"]);
        assert_eq!(set.training_data.len(), 2);
        assert_eq!(set.training_data[0].entities[1].end, 55);
    }

    #[test]
    fn test_training_set_missing_file() {
        let err = NerTrainer::load_training_set("/nonexistent/training.json").unwrap_err();
        assert!(matches!(err, TalosError::TrainingSet(_)));
    }

    #[test]
    fn test_training_set_structure_is_enforced() {
        let missing_meta = r#"{ "training_data": [] }"#;
        assert!(matches!(
            TrainingSet::from_json(missing_meta),
            Err(TalosError::TrainingSet(_))
        ));

        let negative = r#"{
            "meta": { "labels": ["JOB"] },
            "training_data": [
                { "sentence": "job x", "entities": [{ "label": "JOB", "start": -1, "end": 5 }] }
            ]
        }"#;
        assert!(matches!(
            TrainingSet::from_json(negative),
            Err(TalosError::TrainingSet(_))
        ));
    }

    #[test]
    fn test_training_set_span_outside_sentence() {
        let content = r#"{
            "meta": { "labels": ["JOB"] },
            "training_data": [
                { "sentence": "job x", "entities": [{ "label": "JOB", "start": 4, "end": 9 }] }
            ]
        }"#;
        let err = TrainingSet::from_json(content).unwrap_err();
        assert!(err.to_string().contains("training_data[0].entities[0]"));
    }

    #[test]
    fn test_training_set_undeclared_label() {
        let content = r#"{
            "meta": { "labels": ["JOB"] },
            "training_data": [
                { "sentence": "job x", "entities": [{ "label": "ENV", "start": 4, "end": 5 }] }
            ]
        }"#;
        let err = TrainingSet::from_json(content).unwrap_err();
        assert!(err.to_string().contains("ENV"));
    }

    // ── Trainer ────────────────────────────────────────────────

    #[test]
    fn test_train_converges() {
        let set = TrainingSet::from_json(TRAINING_SET).unwrap();
        let mut model = NerTrainer::build_model(None).unwrap();
        let losses = NerTrainer::train_model(&mut model, &set, 100);
        assert_eq!(losses, 0);
        assert_eq!(model.labels(), &["JOB".to_string(), "PROJECT".to_string()]);
    }

    #[test]
    fn test_train_converges_on_conflicting_word() {
        let set = TrainingSet::from_json(
            r#"{
                "meta": { "labels": ["JOB"] },
                "training_data": [
                    { "sentence": "run job build", "entities": [{ "label": "JOB", "start": 8, "end": 13 }] },
                    { "sentence": "build the app", "entities": [] }
                ]
            }"#,
        )
        .unwrap();
        let mut model = NerModel::blank();
        let losses = NerTrainer::train_model(&mut model, &set, 100);
        assert_eq!(losses, 0);

        let parser = NerParser::from_model(model);
        let patterns = ExtractionPatterns::entities(["JOB"]);
        assert!(parser.extract_parameters("build the app", &patterns, true).is_err());
        let params = parser
            .extract_parameters("run job build", &patterns, true)
            .unwrap();
        assert_eq!(params["JOB"], "build");
    }

    #[test]
    fn test_run_saves_model_and_parser_loads_it() {
        let dir = TempDir::new().unwrap();
        let training = write_training_set(dir.path(), TRAINING_SET);
        let output = dir.path().join("ner_model");

        NerTrainer::run(&training, &output, None).unwrap();
        assert!(output.join(MODEL_FILE).exists());

        let parser = NerParser::new(&output).unwrap();
        let params = parser
            .extract_parameters(
                "Execute the job nightly in the project foo/bar",
                &job_entities(),
                true,
            )
            .unwrap();
        assert_eq!(params.len(), 2);
        assert_eq!(params["JOB"], "nightly");
        assert_eq!(params["PROJECT"], "foo/bar");
    }

    #[test]
    fn test_known_surface_form_without_cue() {
        let set = TrainingSet::from_json(TRAINING_SET).unwrap();
        let mut model = NerModel::blank();
        NerTrainer::train_model(&mut model, &set, 10);
        let parser = NerParser::from_model(model);
        let params = parser
            .extract_parameters(
                "what about build_42",
                &ExtractionPatterns::entities(["JOB"]),
                true,
            )
            .unwrap();
        assert_eq!(params["JOB"], "build_42");
    }

    #[test]
    fn test_continue_training_existing_model() {
        let dir = TempDir::new().unwrap();
        let first = dir.path().join("first");
        let training = write_training_set(dir.path(), TRAINING_SET);
        NerTrainer::run(&training, &first, None).unwrap();

        let extra = r#"{
            "meta": { "labels": ["ENV"] },
            "training_data": [
                { "sentence": "deploy to staging", "entities": [{ "label": "ENV", "start": 10, "end": 17 }] }
            ]
        }"#;
        let extra_path = dir.path().join("extra.json");
        std::fs::write(&extra_path, extra).unwrap();
        let second = dir.path().join("second");
        let model = NerTrainer::run(&extra_path, &second, Some(first.as_path())).unwrap();

        assert!(model.has_label("JOB"));
        assert!(model.has_label("ENV"));
        let reloaded = NerModel::load(&second).unwrap();
        assert_eq!(reloaded, model);
    }

    // ── Model files ────────────────────────────────────────────

    #[test]
    fn test_missing_model_dir() {
        let dir = TempDir::new().unwrap();
        let err = NerParser::new(dir.path().join("absent")).err().unwrap();
        assert!(matches!(err, TalosError::Model(_)));
        assert!(matches!(
            NerTrainer::build_model(Some(dir.path().join("absent").as_path())),
            Err(TalosError::Model(_))
        ));
    }

    #[test]
    fn test_corrupt_model_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(MODEL_FILE), "{ not json").unwrap();
        assert!(matches!(NerModel::load(dir.path()), Err(TalosError::Model(_))));

        std::fs::write(
            dir.path().join(MODEL_FILE),
            r#"{ "format": 99, "labels": [] }"#,
        )
        .unwrap();
        let err = NerModel::load(dir.path()).unwrap_err();
        assert!(err.to_string().contains("unsupported model format"));
    }
}
