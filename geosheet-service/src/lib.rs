//! # geosheet-service
//!
//! The geosheet ingestion machinery: locate the data region of a
//! spreadsheet through pluggable bounds detection, convert each row into a
//! typed feature via configured attribute extraction, and reconcile every
//! feature against a feature store with minimal, transactional writes.
//!
//! Processing is strictly sequential within one sheet: the context is
//! mutated row by row, and each store mutation runs in its own
//! short-lived transaction, so a failure aborts the sheet while rows
//! committed earlier stay persisted.
//!
//! ## Quick start
//!
//! ```rust
//! use geosheet_core::attributes::{Attribute, AttributeKind, AttributeSet, KeyAttributeIdentity};
//! use geosheet_core::sheet::{CellValue, GridSheet};
//! use geosheet_service::SheetProcessor;
//! use geosheet_service::bounds::KeyColumnBounds;
//! use geosheet_service::store::MemoryStore;
//! use geosheet_service::update::NoopContextUpdater;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let attributes = AttributeSet::new(
//!         vec![
//!             Attribute::column("plot_no", AttributeKind::Integer, 0),
//!             Attribute::column("name", AttributeKind::String, 1),
//!         ],
//!         KeyAttributeIdentity::new("plot_no"),
//!     )?;
//!
//!     let processor = SheetProcessor::new(
//!         "plot",
//!         attributes,
//!         Box::new(KeyColumnBounds::new(0).skip_header_rows(1)),
//!         Box::new(NoopContextUpdater),
//!     );
//!
//!     let sheet = GridSheet::with_rows(
//!         "plots",
//!         vec![
//!             vec![CellValue::Text("plot".into()), CellValue::Text("name".into())],
//!             vec![CellValue::Int(1), CellValue::Text("Wet meadow".into())],
//!         ],
//!     );
//!     let store = MemoryStore::new();
//!
//!     processor.process(&sheet, &store).await?;
//!     assert_eq!(store.records("plot").len(), 1);
//!     Ok(())
//! }
//! ```

pub mod bounds;
pub mod builder;
pub mod error;
pub mod excel;
pub mod processor;
pub mod store;
pub mod update;

pub use error::{ProcessError, ProcessResult};
pub use processor::SheetProcessor;
