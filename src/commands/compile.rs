use anyhow::Result;
use colored::Colorize;

use crate::Context;
use crate::cli::CompileArgs;
use crate::ui;

pub fn run(ctx: &Context, args: &CompileArgs) -> Result<()> {
    let catalog = super::load_catalog(ctx, &args.catalog)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&catalog)?);
        return Ok(());
    }

    ui::header(&format!("Catalog: {}", catalog.profile()));
    ui::kv("Profiles", &catalog.profiles().join(", "));
    ui::kv("Digest", ui::short_digest(&catalog.digest()));

    for (number, layer) in catalog.layers().iter().enumerate() {
        ui::section(&format!("Layer {}", number + 1));
        for &i in layer {
            let resource = &catalog.resources()[i];
            println!(
                "  {} {}",
                resource.description(),
                format!("({})", resource.declared_by).dimmed()
            );
            for required in &resource.requires {
                ui::dim(&format!("  requires {required}"));
            }
        }
    }

    if catalog.is_empty() && !ctx.quiet {
        println!();
        ui::info("Catalog is empty");
    }
    Ok(())
}
