//! Decode a file against a small fixed demonstration layout and print the
//! result as JSON. This is a smoke-test harness for the library, not a
//! schema-description format: it does not parse layouts from text.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use packed_layout::endian::Endian;
use packed_layout::factory::{self as f, Named};
use packed_layout::structure::StructureBuilder;

/// Decode a file against the packed sensor-reading demonstration layout.
#[derive(Clone, Debug, Parser)]
struct Args {
    /// input file to decode
    input: PathBuf,
    /// byte offset into the file to start decoding at
    #[arg(short, long, default_value_t = 0)]
    offset: usize,
}

fn sensor_reading_layout() -> packed_layout::Layout {
    let structure = StructureBuilder::new(Some("sensor_reading".into()))
        .field(f::u8().named("sensor_id"))
        .field(f::s16(Endian::Little).named("t_cel"))
        .field(f::u16(Endian::Little).named("rh_pph"))
        .field(f::u32(Endian::Little).named("timestamp_posix"))
        .build()
        .expect("demonstration layout is well-formed");
    packed_layout::Layout::Structure(std::rc::Rc::new(structure))
}

fn main() -> Result<()> {
    let args = Args::parse();

    let bytes = fs::read(&args.input)
        .with_context(|| format!("reading {}", args.input.display()))?;
    let layout = sensor_reading_layout();
    let decoded = layout
        .decode(&bytes, args.offset)
        .context("decoding sensor_reading layout")?;

    #[cfg(feature = "serde")]
    {
        println!("{}", serde_json::to_string_pretty(&decoded)?);
    }
    #[cfg(not(feature = "serde"))]
    {
        println!("{decoded:?}");
    }

    Ok(())
}
