use console::style;

use talos_config::TalosConfig;
use talos_core::ExtractionPatterns;

pub(super) fn cmd_skills(config: &TalosConfig) -> talos_core::Result<()> {
    if config.skills.is_empty() {
        println!("No skills declared.");
        println!("  Add a [[skills]] table to your talos.toml, or run: talos init");
        return Ok(());
    }

    println!("{}\n", style(format!("Skills ({}):", config.skills.len())).bold());
    for skill in &config.skills {
        println!("  {}", style(&skill.sentence).cyan());
        if let Some(ref description) = skill.description {
            println!("    {description}");
        }
        match skill.extraction_patterns() {
            ExtractionPatterns::None => {}
            patterns => println!("    Parameters: {}", patterns.names().join(", ")),
        }
        println!("    Reply: {}", skill.reply);
        println!();
    }
    Ok(())
}
