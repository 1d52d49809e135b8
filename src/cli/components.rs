//! Component listing and file resolution.

use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use owo_colors::OwoColorize;
use serde::Serialize;

use crate::config::ProjectConfig;
use crate::core::ComponentInfo;
use crate::host::{ComponentRegistry, ManifestProject};
use crate::utils::path::resolve_path;

#[derive(Debug, Serialize)]
struct ComponentRow {
    #[serde(flatten)]
    component: ComponentInfo,
    source_dirs: Vec<PathBuf>,
}

pub fn run_components(config: &ProjectConfig, file: Option<&Path>, json: bool) -> Result<()> {
    let project = ManifestProject::new(config);

    if let Some(file) = file {
        let path = resolve_path(file, config.get_root());
        let Some(component) = project.resolve_component(&path) else {
            bail!("{} is not under any source dir", path.display());
        };
        if json {
            println!("{}", serde_json::to_string_pretty(&component)?);
        } else {
            println!("{}", component.target);
        }
        return Ok(());
    }

    let rows = collect_rows(&project);
    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        print_table(&rows, config.get_root());
    }
    Ok(())
}

/// One row per component, sorted by target.
fn collect_rows(project: &ManifestProject) -> Vec<ComponentRow> {
    let mut rows: Vec<ComponentRow> = Vec::new();
    for root in project.source_roots() {
        match rows.iter_mut().find(|r| r.component == root.component) {
            Some(row) => row.source_dirs.push(root.dir.clone()),
            None => rows.push(ComponentRow {
                component: root.component.clone(),
                source_dirs: vec![root.dir.clone()],
            }),
        }
    }
    rows.sort_by(|a, b| a.component.cmp(&b.component));
    for row in &mut rows {
        row.source_dirs.sort();
    }
    rows
}

fn print_table(rows: &[ComponentRow], root: &Path) {
    let width = rows
        .iter()
        .map(|r| r.component.target.len())
        .max()
        .unwrap_or(0);

    for row in rows {
        let dirs = row
            .source_dirs
            .iter()
            .map(|d| d.strip_prefix(root).unwrap_or(d).display().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        let stanza = row.component.stanza.label();
        if row.component.is_library() {
            println!("{:width$}  {:10}  {}", row.component.target.bold(), stanza.green(), dirs);
        } else {
            println!("{:width$}  {:10}  {}", row.component.target, stanza.dimmed(), dirs);
        }
    }
}
