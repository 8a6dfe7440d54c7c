// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! Osscatalog library - read and write OSS records in the IBM Cloud Global Catalog
//!
//! The [`catalog::Catalog`] handle reads single entries and writes them back;
//! [`traverse`] walks the Main and OSS trees page by page. Remote resources
//! are mapped onto typed [`model::OssEntry`] values by [`codec`], and Service
//! entries fan out into per-domain variants through [`projector`].

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod catalog;
pub mod codec;
pub mod commands;
pub mod config;
pub mod context;
pub mod crn;
pub mod error;
pub mod include;
pub mod model;
pub mod parent_map;
pub mod projector;
pub mod resource;
pub mod token;
pub mod transport;
pub mod traverse;

pub use error::{Error, Result};

/// Prelude for common imports
pub mod prelude {
    pub use crate::catalog::Catalog;
    pub use crate::context::{Authentication, CancelFlag, Context, Environment};
    pub use crate::error::{Error, Result};
    pub use crate::include::IncludeOptions;
    pub use crate::model::{EntryKind, Extension, OssEntry, OssRecord};
    pub use crate::resource::Restriction;
}
