//! Chunk tree traversal.
//!
//! Walks a byte range as a sequence of tagged, sized chunks. Containers push a
//! frame holding their interpretation context and end offset; the frame is
//! popped exactly when the cursor reaches that end. Leaves are handed to a
//! [`ChunkVisitor`] after the title's filler scan, and the cursor is always
//! repositioned to the leaf's declared end afterwards.

use crate::{
    format::{
        cursor::{ChunkCursor, ChunkSpan},
        profile::{Context, FormatProfile, LeafChunk},
    },
    Error, Result,
};

/// What the decoder does with a container after [`ChunkVisitor::enter`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Flow {
    /// Walk the container's children.
    Descend,
    /// The visitor consumed the container itself; continue after it.
    Skip,
}

pub trait ChunkVisitor {
    fn enter(&mut self, context: Context, span: &ChunkSpan, payload: &[u8]) -> Result<Flow>;

    /// Returns whether the leaf was recognized.
    fn leaf(&mut self, context: Context, chunk: &LeafChunk) -> Result<bool>;

    fn leave(&mut self, _context: Context) -> Result<()> { Ok(()) }
}

struct Frame {
    context: Context,
    end: usize,
}

pub struct ChunkTreeDecoder<'p> {
    profile: &'p dyn FormatProfile,
}

impl<'p> ChunkTreeDecoder<'p> {
    pub fn new(profile: &'p dyn FormatProfile) -> Self { Self { profile } }

    /// Decodes all of `data` under `context`. `base` is the absolute offset of
    /// `data[0]` for diagnostics.
    pub fn walk<V: ChunkVisitor>(
        &self,
        data: &[u8],
        base: u64,
        context: Context,
        visitor: &mut V,
    ) -> Result<()> {
        let mut cursor = ChunkCursor::new(data, base);
        let mut stack = vec![Frame { context, end: data.len() }];
        let padding = self.profile.padding();

        loop {
            while let Some(top) = stack.last() {
                if cursor.position() < top.end {
                    break;
                }
                let context = top.context;
                stack.pop();
                if !stack.is_empty() {
                    log::debug!("Leaving {context:?} at {:#X}", cursor.absolute(cursor.position()));
                    visitor.leave(context)?;
                }
            }
            let Some(top) = stack.last() else { break };
            let parent = top.context;

            let span = cursor.next_chunk(top.end)?;
            if span.id.is_container() {
                let context = self.profile.container_context(span.id, parent);
                match visitor.enter(context, &span, &data[span.start..span.end])? {
                    Flow::Descend => {
                        log::debug!(
                            "Entering {context:?} ({}) at {:#X}, size {:#X}",
                            span.id,
                            span.offset,
                            span.size()
                        );
                        stack.push(Frame { context, end: span.end });
                    }
                    Flow::Skip => cursor.seek(span.end),
                }
                continue;
            }
            if span.id.is_skip() {
                cursor.seek(span.end);
                continue;
            }

            let raw = &data[span.start..span.end];
            let padded = padding.scan(raw);
            let chunk = LeafChunk {
                id: span.id,
                offset: span.offset,
                payload: padded.slice(raw),
            };
            log::trace!(
                "Leaf {} at {:#X}: {:#X} bytes after {:#X} filler",
                span.id,
                span.offset,
                chunk.payload.len(),
                padded.skip
            );
            let handled = match visitor.leaf(parent, &chunk) {
                Ok(handled) => handled,
                Err(Error::BinRw(e)) if e.is_eof() => {
                    return Err(Error::Structural {
                        offset: span.offset,
                        tag: span.id,
                        reason: "handler overran declared size".to_string(),
                    });
                }
                Err(e) => return Err(e),
            };
            if !handled {
                if self.profile.requires_recognition(parent) {
                    return Err(Error::UnknownTag { offset: span.offset, tag: span.id });
                }
                log::warn!("Skipping unknown chunk {} in {parent:?} at {:#X}", span.id, span.offset);
            }
            cursor.seek(span.end);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Write};

    use pretty_assertions::assert_eq;
    use zerocopy::AsBytes;

    use super::*;
    use crate::{
        format::{
            chunk::ChunkHeader,
            padding::{OddLengthFix, PaddingRule},
            solid::{ListBuilder, ObjectBuilder},
            titles::Title,
            ChunkId, K_CHUNK_MESH_DESCRIPTOR, K_CHUNK_OBJECT, K_CHUNK_OBJECT_RESIDENT,
            K_CHUNK_VERTEX_BUFFER,
        },
        model::SolidMeshVertex,
        ErrorKind,
    };

    struct TestProfile;

    impl FormatProfile for TestProfile {
        fn title(&self) -> Title { Title::MostWanted }

        fn padding(&self) -> PaddingRule { PaddingRule::filler(0x11, OddLengthFix::None) }

        fn dispatch_list(&self, _: &mut ListBuilder, _: &LeafChunk) -> Result<bool> { Ok(false) }

        fn dispatch_object(&self, _: &mut ObjectBuilder, _: Context, _: &LeafChunk) -> Result<bool> {
            Ok(false)
        }

        fn decode_vertex(&self, _: &[u8], _: u32, _: usize) -> Result<SolidMeshVertex> {
            Ok(SolidMeshVertex::default())
        }
    }

    #[derive(Debug, PartialEq)]
    enum Event {
        Enter(Context, u64),
        Leaf(Context, ChunkId, u64, Vec<u8>),
        Leave(Context),
    }

    #[derive(Default)]
    struct Recorder {
        events: Vec<Event>,
        /// Leaf handlers read far past their payload.
        over_read: bool,
        known: Vec<ChunkId>,
    }

    impl ChunkVisitor for Recorder {
        fn enter(&mut self, context: Context, span: &ChunkSpan, _: &[u8]) -> Result<Flow> {
            self.events.push(Event::Enter(context, span.offset));
            Ok(Flow::Descend)
        }

        fn leaf(&mut self, context: Context, chunk: &LeafChunk) -> Result<bool> {
            self.events.push(Event::Leaf(context, chunk.id, chunk.offset, chunk.payload.to_vec()));
            if self.over_read {
                let _: [u32; 64] = chunk.read()?;
            }
            Ok(self.known.is_empty() || self.known.contains(&chunk.id))
        }

        fn leave(&mut self, context: Context) -> Result<()> {
            self.events.push(Event::Leave(context));
            Ok(())
        }
    }

    fn leaf(w: &mut Cursor<Vec<u8>>, id: ChunkId, payload: &[u8]) {
        ChunkHeader::write(w, id, |w| {
            w.write_all(payload)?;
            Ok(())
        })
        .unwrap();
    }

    fn walk(data: &[u8], context: Context, recorder: &mut Recorder) -> Result<()> {
        ChunkTreeDecoder::new(&TestProfile).walk(data, 0, context, recorder)
    }

    #[test]
    fn empty_container_advances_by_header() {
        let mut w = Cursor::new(Vec::new());
        ChunkHeader::write(&mut w, K_CHUNK_OBJECT_RESIDENT, |_| Ok(())).unwrap();
        leaf(&mut w, K_CHUNK_VERTEX_BUFFER, &[1, 2]);
        let mut recorder = Recorder::default();
        walk(w.get_ref(), Context::Object, &mut recorder).unwrap();
        assert_eq!(recorder.events, vec![
            Event::Enter(Context::ObjectResident, 0),
            Event::Leave(Context::ObjectResident),
            Event::Leaf(Context::Object, K_CHUNK_VERTEX_BUFFER, 8, vec![1, 2]),
        ]);
    }

    #[test]
    fn nested_contexts_pop_at_declared_end() {
        let mut w = Cursor::new(Vec::new());
        ChunkHeader::write(&mut w, K_CHUNK_OBJECT, |w| {
            leaf(w, K_CHUNK_MESH_DESCRIPTOR, &[5; 4]);
            ChunkHeader::write(w, K_CHUNK_OBJECT_RESIDENT, |w| {
                leaf(w, K_CHUNK_VERTEX_BUFFER, &[6; 4]);
                Ok(())
            })?;
            leaf(w, K_CHUNK_MESH_DESCRIPTOR, &[7; 4]);
            Ok(())
        })
        .unwrap();
        let mut recorder = Recorder::default();
        walk(w.get_ref(), Context::ListRoot, &mut recorder).unwrap();
        assert_eq!(recorder.events, vec![
            Event::Enter(Context::Object, 0),
            Event::Leaf(Context::Object, K_CHUNK_MESH_DESCRIPTOR, 8, vec![5; 4]),
            Event::Enter(Context::ObjectResident, 20),
            Event::Leaf(Context::ObjectResident, K_CHUNK_VERTEX_BUFFER, 28, vec![6; 4]),
            Event::Leave(Context::ObjectResident),
            Event::Leaf(Context::Object, K_CHUNK_MESH_DESCRIPTOR, 40, vec![7; 4]),
            Event::Leave(Context::Object),
        ]);
    }

    #[test]
    fn leaf_filler_is_stripped_and_cursor_repositioned() {
        let mut w = Cursor::new(Vec::new());
        let mut payload = vec![0x11; 4];
        payload.extend_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]);
        leaf(&mut w, K_CHUNK_VERTEX_BUFFER, &payload);
        leaf(&mut w, K_CHUNK_MESH_DESCRIPTOR, &[9]);
        let mut recorder = Recorder::default();
        walk(w.get_ref(), Context::Object, &mut recorder).unwrap();
        assert_eq!(recorder.events, vec![
            Event::Leaf(Context::Object, K_CHUNK_VERTEX_BUFFER, 0, vec![1, 2, 3, 4, 5, 6, 7, 8]),
            Event::Leaf(Context::Object, K_CHUNK_MESH_DESCRIPTOR, 20, vec![9]),
        ]);
    }

    #[test]
    fn zero_tag_is_skipped_without_handler() {
        let mut w = Cursor::new(Vec::new());
        leaf(&mut w, ChunkId(0), &[0xAA; 12]);
        leaf(&mut w, K_CHUNK_VERTEX_BUFFER, &[1]);
        let mut recorder = Recorder::default();
        walk(w.get_ref(), Context::ObjectResident, &mut recorder).unwrap();
        assert_eq!(recorder.events, vec![Event::Leaf(
            Context::ObjectResident,
            K_CHUNK_VERTEX_BUFFER,
            20,
            vec![1]
        )]);
    }

    #[test]
    fn unknown_tag_in_strict_context_is_fatal() {
        let mut w = Cursor::new(Vec::new());
        leaf(&mut w, K_CHUNK_VERTEX_BUFFER, &[1]);
        leaf(&mut w, ChunkId(0x0013_4BFF), &[2]);
        let mut recorder = Recorder { known: vec![K_CHUNK_VERTEX_BUFFER], ..Default::default() };
        let err = walk(w.get_ref(), Context::ObjectResident, &mut recorder).unwrap_err();
        match err {
            Error::UnknownTag { offset, tag } => {
                assert_eq!(offset, 9);
                assert_eq!(tag, ChunkId(0x0013_4BFF));
            }
            e => panic!("unexpected error {e:?}"),
        }
    }

    #[test]
    fn unknown_tag_in_tolerant_context_is_skipped() {
        let mut w = Cursor::new(Vec::new());
        leaf(&mut w, ChunkId(0x0013_4BFF), &[2]);
        leaf(&mut w, K_CHUNK_VERTEX_BUFFER, &[1]);
        let mut recorder = Recorder { known: vec![K_CHUNK_VERTEX_BUFFER], ..Default::default() };
        walk(w.get_ref(), Context::Object, &mut recorder).unwrap();
        assert_eq!(recorder.events.len(), 2);
    }

    #[test]
    fn child_past_container_end_is_structural() {
        let mut data = ChunkHeader::new(K_CHUNK_OBJECT_RESIDENT, 12).as_bytes().to_vec();
        data.extend_from_slice(ChunkHeader::new(K_CHUNK_VERTEX_BUFFER, 8).as_bytes());
        data.extend_from_slice(&[0; 8]);
        let mut recorder = Recorder::default();
        let err = walk(&data, Context::Object, &mut recorder).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Structural);
        assert!(matches!(err, Error::Structural { offset: 8, .. }));
    }

    #[test]
    fn handler_overrun_is_structural() {
        let mut w = Cursor::new(Vec::new());
        leaf(&mut w, K_CHUNK_VERTEX_BUFFER, &[1; 16]);
        let mut recorder = Recorder { over_read: true, ..Default::default() };
        let err = walk(w.get_ref(), Context::Object, &mut recorder).unwrap_err();
        match err {
            Error::Structural { offset, tag, .. } => {
                assert_eq!(offset, 0);
                assert_eq!(tag, K_CHUNK_VERTEX_BUFFER);
            }
            e => panic!("unexpected error {e:?}"),
        }
    }
}
