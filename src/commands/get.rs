// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Read one OSS entry by id

use anyhow::{Context, Result};

use super::{entry_json, Session};
use crate::include::IncludeOptions;

/// Run get command
pub fn run(session: &Session, id: &str, include: Option<&str>) -> Result<()> {
    let include: IncludeOptions = include.unwrap_or_default().parse()?;
    let catalog = session.catalog()?;
    let ctx = session.context(&catalog);
    let entries = catalog
        .read_oss_entry(&ctx, id, include)
        .with_context(|| format!("Failed to read {id} from {}", session.environment))?;

    for entry in &entries {
        if session.json {
            println!("{}", serde_json::to_string_pretty(&entry_json(entry)?)?);
        } else {
            println!("{}", entry.long_description());
        }
    }
    Ok(())
}
