//! Tool catalog
//!
//! One module per category; the module name is the category tag. The
//! registry is built from [`catalog`], so adding a tool means implementing
//! [`crate::tool::DxTool`] in the right category module and listing it in
//! that module's `tools()`.

pub mod assignments;
pub mod attachments;
pub mod casetypes;
pub mod cases;
pub mod dataviews;

use crate::tool::registry::CatalogEntry;

/// Every tool shipped with the server, grouped by category module.
#[must_use]
pub fn catalog() -> Vec<CatalogEntry> {
    let mut entries = Vec::new();
    entries.extend(cases::tools());
    entries.extend(assignments::tools());
    entries.extend(attachments::tools());
    entries.extend(dataviews::tools());
    entries.extend(casetypes::tools());
    entries
}
