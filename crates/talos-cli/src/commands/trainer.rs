use console::style;
use std::path::Path;

use talos_parsers::NerTrainer;

pub(super) fn cmd_trainer(
    training_set: &Path,
    output: &Path,
    from_model: Option<&Path>,
    iterations: usize,
) -> talos_core::Result<()> {
    let mut model = NerTrainer::build_model(from_model)?;
    let set = NerTrainer::load_training_set(training_set)?;
    let losses = NerTrainer::train_model(&mut model, &set, iterations);
    NerTrainer::save_model(&model, output)?;

    println!(
        "{} Trained on {} sentences, labels: {}",
        style("✓").green(),
        set.training_data.len(),
        model.labels().join(", ")
    );
    if losses > 0 {
        println!(
            "  {} {losses} tokens were still mistagged after {iterations} iterations",
            style("!").yellow()
        );
    }
    println!("  Model saved into {}", style(output.display()).cyan());
    Ok(())
}
