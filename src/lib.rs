//! Core library for the iam-audit-tools command line application.
//!
//! The library exposes the two orchestration entry points that power the
//! command-line interface as well as the integration tests. The modules are
//! structured to keep responsibilities narrow and composable: the identity
//! service seam lives under [`iam`], workbook IO adapters under [`io`], the
//! row schema in [`model`], and the export/apply orchestration in [`export`]
//! and [`apply`].

pub mod apply;
pub mod error;
pub mod export;
pub mod iam;
pub mod io;
pub mod model;

pub use error::{Result, ToolError};
