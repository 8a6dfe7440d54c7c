// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! List OSS entries or Main catalog entries

use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use serde_json::json;

use super::{entry_json, Session};
use crate::include::IncludeOptions;
use crate::traverse::ListStats;

/// Run list-oss command
pub fn run_oss(session: &Session, pattern: Option<&str>, include: Option<&str>) -> Result<()> {
    let include: IncludeOptions = include.unwrap_or_default().parse()?;
    let catalog = session.catalog()?;
    let ctx = session.context(&catalog);
    let stats = catalog
        .list_oss(&ctx, pattern, include, |entry| {
            if session.json {
                let line = entry_json(entry).and_then(|v| Ok(serde_json::to_string(&v)?));
                match line {
                    Ok(line) => println!("{line}"),
                    Err(e) => tracing::warn!(id = %entry.entry_id(), error = %e, "cannot render entry"),
                }
            } else {
                println!("{}", session.entry_line(entry));
            }
            Ok(())
        })
        .with_context(|| format!("Failed to list OSS entries in {}", session.environment))?;
    summary(session, stats);
    Ok(())
}

/// Run list-main command
pub fn run_main(session: &Session, pattern: Option<&str>, deployments: bool) -> Result<()> {
    let catalog = session.catalog()?;
    let ctx = session.context(&catalog);
    let stats = catalog
        .list_main(&ctx, pattern, deployments, |entry| {
            if session.json {
                let v = json!({
                    "id": entry.resource.id,
                    "name": entry.resource.name,
                    "kind": entry.resource.kind,
                    "path": entry.catalog_path,
                    "visibility": entry.effective_visibility,
                });
                println!("{v}");
            } else {
                let kind = entry.kind.to_string();
                let kind = if session.color { kind.cyan().to_string() } else { kind };
                println!("{kind:<24} {:<60} {}", entry.catalog_path, entry.resource.display_name());
            }
            Ok(())
        })
        .context("Failed to list the Main catalog")?;
    summary(session, stats);
    Ok(())
}

fn summary(session: &Session, stats: ListStats) {
    if !session.json {
        eprintln!("{stats}");
    }
    if stats.errors > 0 {
        tracing::warn!(errors = stats.errors, "some entries could not be decoded");
    }
}
