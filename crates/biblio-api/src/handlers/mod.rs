//! Handler modules for biblio-api.
//!
//! Cross-cutting CRUD handlers live in main.rs; the share-link and export
//! surfaces are big enough to carry their own modules.

pub mod exports;
pub mod shares;
