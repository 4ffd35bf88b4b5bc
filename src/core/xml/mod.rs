//! Namespace-aware XML events.
//!
//! The pipeline parser and the engine never touch `quick-xml` types
//! directly. Everything flows through the owned [`XmlEvent`] model:
//! - `reader` - streams events out of a document string
//! - `writer` - serializes events back to markup
//! - `document` - an owned, replayable event sequence

pub mod document;
pub mod event;
pub mod reader;
pub mod writer;

pub use document::XmlDocument;
pub use event::{Attribute, ElementStart, NamespaceBinding, QualifiedName, XmlEvent};
pub use reader::EventReader;
pub use writer::XmlWriter;
