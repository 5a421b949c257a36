//! Pipeline stages for documentation-to-PDF export.
//!
//! Each submodule implements one step; data flows strictly forward and every
//! stage is awaited to completion before the next one starts.
//!
//! ## Data Flow
//!
//! ```text
//! fetch ──▶ collect ──▶ markdown ──▶ assemble ──▶ pdf
//! (git)     (pages)     (fragments)  (one HTML)   (engine)
//!                        │  ▲
//!                 syntax ┘  └ links, assets
//! ```
//!
//! 1. [`fetch`]    sparse, shallow git checkout of the docs directory
//! 2. [`collect`]  walk the tree, order pages, parse front-matter, number sections
//! 3. [`markdown`] render each page; custom blocks come from [`syntax`],
//!    internal links are rewritten through [`links`], images resolved by
//!    [`assets`]
//! 4. [`assemble`] cover, table of contents and one section per page
//! 5. [`pdf`]      run the external engine and move the PDF into place

pub mod assemble;
pub mod assets;
pub mod collect;
pub mod fetch;
pub mod links;
pub mod markdown;
pub mod pdf;
pub mod syntax;
