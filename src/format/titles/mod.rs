//! Per-title format profiles.
//!
//! Every title shares the chunk identifiers in [`crate::format`] and the
//! handlers below; a title plugs in its record layouts through
//! [`ObjectRecords`] and adds whatever tags only it understands.

pub mod carbon;
pub mod most_wanted;
pub mod prostreet;
pub mod undercover;
pub mod world;

use binrw::{binrw, BinRead, Endian};
use serde_derive::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::{
    format::{
        profile::{Context, FormatProfile, LeafChunk, StreamMapping},
        solid::{ListBuilder, ObjectBuilder},
        K_CHUNK_HASH_TABLE, K_CHUNK_INDEX_BUFFER, K_CHUNK_LIST_INFO, K_CHUNK_MATERIAL_NAME,
        K_CHUNK_MESH_DESCRIPTOR, K_CHUNK_MESH_ENTRIES, K_CHUNK_OBJECT_HEADER, K_CHUNK_SHADER_REFS,
        K_CHUNK_TEXTURE_REFS, K_CHUNK_VERTEX_BUFFER,
    },
    model::{SolidList, SolidObject, SolidObjectMaterial},
    util::read::{fixed_string, read_cstring},
    Result,
};

#[derive(
    Copy, Clone, Debug, Eq, PartialEq, Hash, EnumString, Display, EnumIter, Serialize, Deserialize,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum Title {
    MostWanted,
    Carbon,
    ProStreet,
    Undercover,
    World,
}

impl Title {
    pub fn profile(self) -> &'static dyn FormatProfile {
        match self {
            Title::MostWanted => &most_wanted::MostWantedProfile,
            Title::Carbon => &carbon::CarbonProfile,
            Title::ProStreet => &prostreet::ProStreetProfile,
            Title::Undercover => &undercover::UndercoverProfile,
            Title::World => &world::WorldProfile,
        }
    }
}

/// `{hash, pad}` entry of the object hash and texture reference tables.
#[binrw]
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct HashEntry {
    pub hash: u32,
    pub pad: u32,
}

impl HashEntry {
    pub const RECORD_SIZE: usize = 8;
}

/// List info record (path, class label and declared object count).
#[binrw]
#[derive(Clone, Debug, PartialEq)]
pub struct ListInfo {
    pub version: u32,
    pub object_count: u32,
    pub path: [u8; 56],
    pub class_name: [u8; 32],
}

impl ListInfo {
    pub fn apply(&self, list: &mut SolidList) {
        list.path = fixed_string(&self.path);
        list.class_name = fixed_string(&self.class_name);
        list.declared_object_count = self.object_count;
    }
}

/// Object header record; the object's name follows it as a C string.
pub trait ObjectHeaderRecord {
    fn apply(&self, object: &mut SolidObject);
}

pub trait MeshDescriptorRecord {
    fn apply(&self, builder: &mut ObjectBuilder);
}

/// One material-table entry.
pub trait MaterialRecord {
    const RECORD_SIZE: usize;

    /// Builds the material and the key its stream mapping is derived from.
    fn to_material(&self, builder: &ObjectBuilder) -> Result<(SolidObjectMaterial, u32)>;
}

/// The record layouts a title uses for the shared object chunks.
pub trait ObjectRecords {
    type Header: ObjectHeaderRecord + for<'b> BinRead<Args<'b> = ()>;
    type Descriptor: MeshDescriptorRecord + for<'b> BinRead<Args<'b> = ()>;
    type Material: MaterialRecord + for<'b> BinRead<Args<'b> = ()>;

    const MAPPING: StreamMapping;
}

/// Handles the list chunks every title shares.
pub fn dispatch_list_common(list: &mut ListBuilder, chunk: &LeafChunk) -> Result<bool> {
    match chunk.id {
        K_CHUNK_LIST_INFO => {
            let info: ListInfo = chunk.read()?;
            info.apply(&mut list.list);
        }
        K_CHUNK_HASH_TABLE => {
            let entries: Vec<HashEntry> = chunk.read_records(HashEntry::RECORD_SIZE)?;
            list.list.object_hashes = entries.into_iter().map(|e| e.hash).collect();
        }
        _ => return Ok(false),
    }
    Ok(true)
}

/// Handles the object chunks every title shares, using `R`'s layouts.
pub fn dispatch_object_common<R: ObjectRecords>(
    object: &mut ObjectBuilder,
    context: Context,
    chunk: &LeafChunk,
) -> Result<bool> {
    match (context, chunk.id) {
        (Context::Object, K_CHUNK_OBJECT_HEADER) => {
            let mut reader = chunk.reader();
            let header = R::Header::read_options(&mut reader, Endian::Little, ())?;
            header.apply(&mut object.object);
            object.object.name = read_cstring(&mut reader)?;
            object.has_header = true;
        }
        (Context::Object, K_CHUNK_TEXTURE_REFS) => {
            let entries: Vec<HashEntry> = chunk.read_records(HashEntry::RECORD_SIZE)?;
            object.object.texture_hashes = entries.into_iter().map(|e| e.hash).collect();
        }
        // Shader references carry nothing the object model keeps.
        (Context::Object, K_CHUNK_SHADER_REFS) => {}
        (Context::ObjectResident, K_CHUNK_MESH_DESCRIPTOR) => {
            let descriptor: R::Descriptor = chunk.read()?;
            descriptor.apply(object);
        }
        (Context::ObjectResident, K_CHUNK_MESH_ENTRIES) => {
            let records: Vec<R::Material> = chunk.read_records(R::Material::RECORD_SIZE)?;
            let entries =
                records.iter().map(|r| r.to_material(object)).collect::<Result<Vec<_>>>()?;
            object.push_materials(entries, R::MAPPING)?;
        }
        (Context::ObjectResident, K_CHUNK_VERTEX_BUFFER) => object.push_vertex_buffer(chunk),
        (Context::ObjectResident, K_CHUNK_INDEX_BUFFER) => object.push_indices(chunk)?,
        (_, K_CHUNK_MATERIAL_NAME) => object.name_next_material(chunk)?,
        _ => return Ok(false),
    }
    Ok(true)
}
