//! One-shot library build.

use std::time::Instant;

use anyhow::{Result, bail};

use crate::config::ProjectConfig;
use crate::core::{TargetSet, display_targets};
use crate::host::ManifestProject;
use crate::log;
use crate::rebuild::executor::{BuildExecutor, BuildOptions, CommandExecutor};

/// Build the library of every named package (all libraries when none given).
pub fn build_libraries(config: &ProjectConfig, packages: &[String], strict: bool) -> Result<()> {
    config.validate_build_tool()?;

    let project = ManifestProject::new(config);
    let targets = select_libraries(config, &project, packages)?;
    if targets.is_empty() {
        log!("build"; "no library targets");
        return Ok(());
    }

    let executor = CommandExecutor::new(&config.build);
    let options = BuildOptions {
        warnings_non_fatal: !strict,
    };

    log!("build"; "building {}", display_targets(&targets));
    let start = Instant::now();
    match executor.run_build(&project, &targets, &options) {
        Some(result) if result.is_success() => {
            log!("build"; "done in {:.2}s", start.elapsed().as_secs_f64());
            Ok(())
        }
        Some(result) => match result.code {
            Some(code) => bail!("build failed with exit code {code}"),
            None => bail!("build terminated by signal"),
        },
        None => bail!("build could not be started"),
    }
}

/// Library targets of `packages`, or of every package when empty.
fn select_libraries(
    config: &ProjectConfig,
    project: &ManifestProject,
    packages: &[String],
) -> Result<TargetSet> {
    if let Some(unknown) = packages.iter().find(|name| config.package(name).is_none()) {
        bail!("unknown package `{unknown}`");
    }

    let mut targets = project.libraries();
    if !packages.is_empty() {
        targets.retain(|c| packages.contains(&c.package));
    }
    Ok(targets)
}
