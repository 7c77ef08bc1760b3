use anyhow::Result;

use crate::Context;
use crate::cli::ApplyArgs;
use crate::engine::{self, ExecuteOptions};
use crate::state_file::StateFile;
use crate::ui;

pub fn run(ctx: &Context, args: &ApplyArgs) -> Result<()> {
    ui::header("Applying Configuration");

    if args.dry_run {
        ui::warn("Dry run - no changes will be made");
    }

    let catalog = super::load_catalog(ctx, &args.catalog)?;
    let state = StateFile::load(&args.state)?;
    let opts = ExecuteOptions {
        engine: ctx.config.reconcile_options(args.jobs, args.dry_run),
        yes: args.yes,
        verbose: ctx.verbose > 0,
    };

    let reconciliation = declarative::reconcile(&catalog, &state, &opts.engine);
    let Some(outcomes) = engine::execute(&reconciliation, &state, &opts)? else {
        return Ok(());
    };

    state.save()?;

    if !declarative::summarize(&outcomes).is_success() {
        anyhow::bail!("Some resources failed to apply");
    }
    Ok(())
}
