use anyhow::Result;

use crate::Context;
use crate::cli::VerifyArgs;
use crate::engine;
use crate::state_file::StateFile;
use crate::ui;

pub fn run(ctx: &Context, args: &VerifyArgs) -> Result<()> {
    let catalog = super::load_catalog(ctx, &args.catalog)?;
    let state = StateFile::load(&args.state)?;
    let options = ctx.config.reconcile_options(None, true);

    let report = declarative::verify(&catalog, &state, &options);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        ui::header(&format!("Verify: {}", catalog.profile()));
        engine::display_verification(&report);
    }

    if !report.all_passed() {
        anyhow::bail!("Verification failed");
    }
    Ok(())
}
