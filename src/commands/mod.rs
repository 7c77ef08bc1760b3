//! Command implementations

pub mod apply;
pub mod compile;
pub mod diff;
pub mod facts;
pub mod profiles;
pub mod verify;

use anyhow::{Context as AnyhowContext, Result};
use declarative::{Catalog, FactStore, ProfileRegistry, filter_by_target};
use std::path::Path;

use crate::Context;

/// Built-in profiles plus any from the profiles directory
///
/// `--profiles` wins over `profiles_dir` in the config file.
pub fn load_registry(ctx: &Context) -> Result<ProfileRegistry> {
    let mut builder = ProfileRegistry::builder().with_builtins();

    let dir = ctx
        .profiles
        .clone()
        .or_else(|| ctx.config.profiles_path());
    if let Some(dir) = dir {
        if dir.is_dir() {
            builder = builder
                .load_dir(&dir)
                .with_context(|| format!("Failed to load profiles from {}", dir.display()))?;
        } else {
            log::warn!("Profiles directory {} does not exist", dir.display());
        }
    }

    Ok(builder.build())
}

pub fn load_facts(path: &Path) -> Result<FactStore> {
    FactStore::load_file(path)
        .with_context(|| format!("Failed to load facts from {}", path.display()))
}

/// Compile the requested profile and narrow it to the target, if any
pub fn load_catalog(ctx: &Context, args: &crate::cli::CatalogArgs) -> Result<Catalog> {
    let registry = load_registry(ctx)?;
    let facts = load_facts(&args.facts)?;

    let catalog = declarative::compile(&registry, &args.profile, &facts)
        .with_context(|| format!("Failed to compile profile '{}'", args.profile))?;
    let catalog = filter_by_target(&catalog, args.target.as_deref())?;

    log::debug!(
        "Catalog {} for {}: {} resources in {} layers",
        crate::ui::short_digest(&catalog.digest()),
        facts.describe_os(),
        catalog.len(),
        catalog.layers().len()
    );
    Ok(catalog)
}
