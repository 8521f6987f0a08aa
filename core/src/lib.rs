//! Generic stylesheet rule tree, parser and serializer.
//!
//! This crate defines the structural CSS model that the media-query combiner
//! works on:
//!
//! - [`Stylesheet`]: a flat, ordered list of top-level [`Rule`]s.
//! - [`Rule`]: style rules, comments, `@import`, `@keyframes`, `@media`
//!   and any other at-rule.
//! - [`BlockItem`]: declarations, comments and nested rules inside a
//!   `{ ... }` block.
//!
//! [`parse`] tokenizes with `cssparser` and turns text into a [`Stylesheet`]
//! or fails with a positioned [`ParseError`]; [`serialize`] writes a tree back out in a stable layout
//! controlled by [`SerializeOptions`]. Neither validates property names or
//! values.
//!
//! # Example
//!
//! ```
//! use cmq_core::*;
//!
//! let sheet = parse(".a{color:red} @media (min-width: 500px){.b{color:blue}}").unwrap();
//! assert_eq!(sheet.media_count(), 1);
//!
//! let css = serialize(&sheet, &SerializeOptions::default());
//! assert_eq!(parse(&css).unwrap(), sheet);
//! ```

mod error;
mod parse;
mod serialize;
mod types;

pub use error::{ParseError, ParseErrorKind, Result};
pub use parse::{collapse_whitespace, parse};
pub use serialize::{LineEnding, SerializeOptions, serialize};
pub use types::*;
