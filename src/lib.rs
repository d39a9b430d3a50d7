//! API doc generator - API documents compiled from annotated source comments.
//!
//! Handlers describe themselves in their doc comments with a small line-oriented annotation
//! language (`@url`, `@param`, `@resp`, ...). This library reads those comments, resolves the
//! types they reference across modules and crates, expands them into parameter tables and
//! example JSON bodies, and assembles one [`api_doc::ApiDoc`] per annotated operation.
//!
//! # Architecture
//!
//! 1. [`scanner`] - Recursively scans a directory for source files
//! 2. [`parser`] - Lowers Rust source into the neutral [`source`] model
//! 3. [`catalog`] - Indexes type declarations and loads imported modules on demand
//! 4. [`type_resolver`] - Resolves a type reference as written in a file to its declaration
//! 5. [`struct_walker`] - Expands a struct into a field tree and an example JSON object
//! 6. [`annotation`] - Applies annotation lines to the document being built
//! 7. [`assembler`] - Drives the whole pipeline over every scanned file
//! 8. [`serializer`] - Serializes the documents to JSON or YAML
//!
//! # Example Usage
//!
//! ```no_run
//! use apidoc_from_source::{
//!     assembler::{generate, ScanConfig},
//!     serializer::serialize_json,
//! };
//!
//! let config = ScanConfig::new("./my-api/src/handler").with_extern("common", "./common");
//! let docs = generate(&config).unwrap();
//!
//! for doc in &docs {
//!     println!("({}) {} {}", doc.order, doc.request.method, doc.name());
//! }
//! println!("{}", serialize_json(&docs).unwrap());
//! ```
//!
//! # Command-Line Interface
//!
//! For command-line usage, see the [`cli`] module which provides a complete CLI application.

pub mod annotation;
pub mod api_doc;
pub mod assembler;
pub mod catalog;
pub mod cli;
pub mod error;
pub mod parser;
pub mod scanner;
pub mod serializer;
pub mod source;
pub mod struct_walker;
pub mod type_resolver;

pub use api_doc::ApiDoc;
pub use assembler::{generate, DocumentAssembler, ScanConfig};
pub use error::{Error, Result};
