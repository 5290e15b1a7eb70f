//! Decoding of Solid List model containers.
//!
//! A Solid List is a tree of tagged, sized chunks holding the 3-D objects of
//! one asset bundle. Each supported [`Title`] lays its records out
//! differently; pick the title once and the rest is shared.
//!
//! ```no_run
//! use solidlist::{read_solid_list_file, DecodeOptions, Title};
//!
//! let list = read_solid_list_file("GEOMETRY.BIN", Title::Carbon, &DecodeOptions::default())?;
//! for object in &list.objects {
//!     println!("{} ({} vertices)", object.name, object.vertex_count());
//! }
//! # Ok::<(), solidlist::Error>(())
//! ```

pub mod error;
pub mod format;
pub mod model;
pub mod options;
pub mod util;

use std::path::Path;

pub use error::{Error, ErrorKind, Result};
pub use format::titles::Title;
pub use model::{
    SolidList, SolidMeshVertex, SolidObject, SolidObjectMaterial, VertexBuffer, VertexRange,
};
pub use options::DecodeOptions;
pub use util::compression::{Decompressor, StandardDecompressor};

use crate::{
    format::solid::{decode_list, decode_object_container},
    util::file::map_file,
};

/// Decodes a complete solid list held in memory.
pub fn read_solid_list(data: &[u8], title: Title, options: &DecodeOptions) -> Result<SolidList> {
    read_solid_list_with(data, title, options, &StandardDecompressor)
}

/// Like [`read_solid_list`], with `decompressor` handling compressed objects.
pub fn read_solid_list_with(
    data: &[u8],
    title: Title,
    options: &DecodeOptions,
    decompressor: &dyn Decompressor,
) -> Result<SolidList> {
    options.check_input_len(data.len())?;
    log::debug!("Reading {title} solid list ({:#X} bytes)", data.len());
    decode_list(title.profile(), data, options, decompressor)
}

/// Decodes a single object container.
pub fn read_solid_object(data: &[u8], title: Title, options: &DecodeOptions) -> Result<SolidObject> {
    options.check_input_len(data.len())?;
    decode_object_container(title.profile(), data)
}

/// Memory-maps `path` and decodes it as a solid list.
pub fn read_solid_list_file<P: AsRef<Path>>(
    path: P,
    title: Title,
    options: &DecodeOptions,
) -> Result<SolidList> {
    let map = map_file(path)?;
    read_solid_list(&map, title, options)
}
