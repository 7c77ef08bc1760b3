use anyhow::Result;
use std::path::Path;

use crate::Context;
use crate::ui;

pub fn run(ctx: &Context, path: &Path, key: Option<&str>) -> Result<()> {
    let facts = super::load_facts(path)?;

    if let Some(key) = key {
        match facts.get(key) {
            Some(value) => println!("{value}"),
            None => anyhow::bail!("Fact '{key}' not found in {}", path.display()),
        }
        return Ok(());
    }

    if !ctx.quiet {
        ui::header(&format!("Facts: {}", facts.describe_os()));
    }
    for (key, value) in facts.iter() {
        ui::kv(key, value);
    }
    Ok(())
}
