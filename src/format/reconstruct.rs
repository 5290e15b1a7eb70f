//! Vertex stream reconstruction.
//!
//! Turns an object's raw per-stream buffers into typed vertex sets. A single
//! stream may back several materials; each material consumes the next
//! `num_verts` vertices of its stream in declaration order, so materials
//! sharing a buffer never index into it directly.

use crate::{
    ensure_invariant,
    format::profile::FormatProfile,
    model::{SolidMeshVertex, SolidObject},
    Error, Result,
};

/// Per-stream vertex counts: the global hint for a single stream, otherwise
/// the sum of the counts declared by the stream's materials.
pub fn stream_vertex_counts(object: &SolidObject, vertex_count_hint: u32) -> Result<Vec<usize>> {
    let streams = object.vertex_buffers.len();
    let mut counts = vec![0usize; streams];
    for (i, material) in object.materials.iter().enumerate() {
        ensure_invariant!(
            (material.vertex_stream_index as usize) < streams,
            "material {i} draws from stream {} but only {streams} vertex buffers were read",
            material.vertex_stream_index
        );
    }
    if streams == 1 {
        counts[0] = vertex_count_hint as usize;
        return Ok(counts);
    }
    if !object.materials.iter().any(|m| m.num_verts != 0) {
        return Err(Error::Malformed(format!(
            "{streams} vertex streams but no material declares a vertex count"
        )));
    }
    for material in &object.materials {
        counts[material.vertex_stream_index as usize] += material.num_verts as usize;
    }
    Ok(counts)
}

/// Byte stride of every stream; zero for streams without vertices.
pub fn stream_strides(object: &SolidObject, counts: &[usize]) -> Result<Vec<usize>> {
    object
        .vertex_buffers
        .iter()
        .zip(counts)
        .enumerate()
        .map(|(i, (buffer, &count))| {
            if count == 0 {
                return Ok(0);
            }
            ensure_invariant!(
                buffer.len() % count == 0,
                "stream {i}: {} bytes do not divide into {count} vertices",
                buffer.len()
            );
            Ok(buffer.len() / count)
        })
        .collect()
}

/// Decodes every stream, binds each material to its slice, runs the
/// profile's post-process and drops the raw buffers.
pub fn reconstruct(
    profile: &dyn FormatProfile,
    object: &mut SolidObject,
    vertex_count_hint: u32,
) -> Result<()> {
    if object.vertex_buffers.is_empty() {
        ensure_invariant!(
            object.materials.is_empty(),
            "{} materials but no vertex buffers",
            object.materials.len()
        );
        object.vertex_sets.clear();
        return Ok(());
    }

    let counts = stream_vertex_counts(object, vertex_count_hint)?;
    let strides = stream_strides(object, &counts)?;
    let buffers = std::mem::take(&mut object.vertex_buffers);
    let mut consumed = vec![0usize; buffers.len()];
    let mut sets: Vec<Vec<SolidMeshVertex>> =
        counts.iter().map(|&count| Vec::with_capacity(count)).collect();

    for (i, material) in object.materials.iter_mut().enumerate() {
        let stream = material.vertex_stream_index as usize;
        let capacity = counts[stream];
        let start = consumed[stream];
        let take = match material.num_verts as usize {
            0 => capacity - start,
            n => n,
        };
        ensure_invariant!(
            start + take <= capacity,
            "material {i} needs {take} vertices at {start} but stream {stream} holds {capacity}"
        );

        let stride = strides[stream];
        let bytes = buffers[stream].as_bytes();
        for v in start..start + take {
            let window = &bytes[v * stride..(v + 1) * stride];
            sets[stream].push(profile.decode_vertex(window, material.effect_id, stride)?);
        }
        material.vertex_offset = start;
        material.vertex_len = take;
        consumed[stream] = start + take;
    }

    for (stream, (&used, &capacity)) in consumed.iter().zip(&counts).enumerate() {
        ensure_invariant!(
            used == capacity || used == 0,
            "stream {stream}: {} of {capacity} vertices left unconsumed",
            capacity - used
        );
    }

    for (stream, set) in sets.iter_mut().enumerate() {
        profile.post_process(object, stream, set)?;
    }
    log::debug!(
        "Rebuilt {} vertex sets ({} vertices) for {:?}",
        sets.len(),
        sets.iter().map(Vec::len).sum::<usize>(),
        object.name
    );
    object.vertex_sets = sets;
    Ok(())
}

/// Hands each material its slice of the object's index buffer, in order.
pub fn bind_indices(object: &mut SolidObject) -> Result<()> {
    if object.indices.is_empty() {
        return Ok(());
    }
    let mut cursor = 0usize;
    for (i, material) in object.materials.iter_mut().enumerate() {
        let count = material.num_indices as usize;
        ensure_invariant!(
            cursor + count <= object.indices.len(),
            "material {i} needs {count} indices at {cursor} but only {} exist",
            object.indices.len()
        );
        material.indices = object.indices[cursor..cursor + count].to_vec();
        cursor += count;
    }
    Ok(())
}
