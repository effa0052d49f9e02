// ABOUTME: Library entry point for converting WordPress post HTML into Payload Lexical documents.
// ABOUTME: Re-exports the document model, the Converter and MediaResolver seam, and text helpers.

//! wp2payload-richtext - converts rendered WordPress post HTML into a typed
//! document tree and serializes it as Lexical editor state.
//!
//! Conversion runs in two pure passes around one async step: the HTML is
//! planned into blocks and image requests, each image is handed to a
//! [`MediaResolver`], and the blocks are assembled with the resulting ids.
//!
//! # Example
//!
//! ```no_run
//! use wp2payload_richtext::{Converter, SkipMedia};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), wp2payload_richtext::ConvertError> {
//!     let root = Converter::new()
//!         .build("<p>Hello <b>world</b></p>", &mut SkipMedia)
//!         .await?;
//!     println!("{}", root.to_lexical());
//!     Ok(())
//! }
//! ```

pub mod builder;
pub mod error;
pub mod image;
pub mod inline;
pub mod lexical;
pub mod model;
pub mod text;

pub use crate::builder::{build_document, Converter, DocumentPlan, FlowKind, MediaResolver, SkipMedia};
pub use crate::error::ConvertError;
pub use crate::image::{guess_extension, pick_from_srcset, ImageRequest};
pub use crate::inline::{merge_adjacent_text, parse_inline};
pub use crate::model::{
    BlockNode, InlineNode, Link, ListItem, ListKind, MediaId, Root, TextFormat, TextRun,
};
pub use crate::text::{clamp_text, decode_entities, strip_html};
