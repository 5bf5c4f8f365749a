//! SPICE library indexing for spicebox.
//!
//! Scans directories for library text files, parses `.MODEL` cards and
//! `.SUBCKT` blocks (including models nested inside subcircuit bodies) and
//! serves name / device-type searches over the result.
//!
//! ```no_run
//! use spicebox_library::{LibraryCatalog, SearchQuery};
//!
//! let mut catalog = LibraryCatalog::new();
//! let report = catalog.index(&["/usr/share/spice/lib"]);
//! println!("{} models", report.models_found);
//!
//! let diodes = catalog.search(&SearchQuery::new("1N").with_type("diode"));
//! for m in &diodes.models {
//!     println!("{} ({})", m.name, m.device_type);
//! }
//! ```

pub mod catalog;
pub mod device;
pub mod entry;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod reader;

pub use catalog::{IndexReport, LibraryCatalog, ModelMatch, SearchQuery, SearchResults, SubcircuitMatch};
pub use device::DeviceType;
pub use entry::{ModelEntry, ParsedLibrary, SubcircuitEntry};
pub use error::{Error, Result};
pub use parser::parse_library;
