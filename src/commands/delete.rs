// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Delete one OSS entry by id

use anyhow::{Context, Result};

use super::Session;

/// Run delete command
pub fn run(session: &Session, id: &str) -> Result<()> {
    let catalog = session.catalog()?;
    let ctx = session.context(&catalog);
    catalog
        .delete_oss_entry(&ctx, id)
        .with_context(|| format!("Failed to delete {id} from {}", session.environment))?;
    println!("Deleted {id}");
    Ok(())
}
