#![forbid(unsafe_code)]

//! Declarative binary layout composition, decode and encode engine.
//!
//! Programs build an in-memory description of a byte layout by composing
//! primitive and composite [`Layout`] nodes, then use that description to
//! decode raw bytes into a [`Value`] and encode a `Value` back into raw
//! bytes. The target domain is packed C-style structures, tagged unions,
//! bit-packed words, and length-prefixed sequences found in on-the-wire and
//! on-disk formats.
//!
//! ```
//! use packed_layout::endian::Endian;
//! use packed_layout::factory::{self as f, Named};
//! use packed_layout::structure::StructureBuilder;
//!
//! let sensor = StructureBuilder::new(Some("sensor".into()))
//!     .field(f::u8().named("sensor_id"))
//!     .field(f::s16(Endian::Little).named("temperature_c"))
//!     .build()
//!     .unwrap();
//!
//! let bytes = [0x05, 0x17, 0x00];
//! let decoded = sensor.decode(&bytes, 0).unwrap();
//! assert_eq!(decoded.as_map().unwrap()["sensor_id"], 5u8.into());
//! ```

pub mod bind;
pub mod bitstruct;
pub mod bytes;
pub mod endian;
pub mod error;
pub mod external;
pub mod factory;
pub mod node;
pub mod numeric;
pub mod sequence;
pub mod structure;
pub mod union_;
pub mod value;

pub use bind::Bind;
pub use error::{LayoutError, Result};
pub use node::Layout;
pub use value::Value;
