use anyhow::Result;
use colored::Colorize;

use crate::Context;
use crate::ui;

pub fn run(ctx: &Context) -> Result<()> {
    let registry = super::load_registry(ctx)?;

    ui::header("Profiles");
    for profile in registry.profiles() {
        println!(
            "  {} {}",
            profile.name.bold(),
            profile.description.as_deref().unwrap_or_default().dimmed()
        );
        if !profile.includes.is_empty() {
            ui::dim(&format!("  includes {}", profile.includes.join(", ")));
        }
    }
    Ok(())
}
