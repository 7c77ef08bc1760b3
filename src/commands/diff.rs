use anyhow::Result;

use crate::Context;
use crate::cli::DiffArgs;
use crate::engine;
use crate::state_file::StateFile;
use crate::ui;

pub fn run(ctx: &Context, args: &DiffArgs) -> Result<()> {
    let catalog = super::load_catalog(ctx, &args.catalog)?;
    let state = StateFile::load(&args.state)?;
    let options = ctx.config.reconcile_options(args.jobs, true);

    ui::header(&format!("Diff: {}", catalog.profile()));
    let reconciliation = declarative::reconcile(&catalog, &state, &options);
    engine::display_diff(&reconciliation);
    Ok(())
}
