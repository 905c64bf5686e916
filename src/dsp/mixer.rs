//! Mixer: sums the output of every active source.

use super::source::{Source, Synthesizer, prepare_stereo};

/// Handle to a source registered with a [`Mixer`].
///
/// A handle goes stale once its source is removed, even if the slot is
/// later reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceId {
    index: u32,
    generation: u32,
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    source: Option<Source>,
}

/// A summing mixer over a slot list of sources.
///
/// Adding and removing are O(1); mixing is O(sources × samples). The sum is
/// left unclipped: callers apply [`soft_clip`] once all streams are combined.
#[derive(Debug, Clone, Default)]
pub struct Mixer {
    slots: Vec<Slot>,
    free: Vec<u32>,
    scratch: Vec<f32>,
}

impl Mixer {
    pub fn new() -> Self {
        Mixer::default()
    }

    pub fn add_source(&mut self, source: impl Into<Source>) -> SourceId {
        let source = Some(source.into());
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.source = source;
            SourceId {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot { generation: 0, source });
            SourceId { index, generation: 0 }
        }
    }

    /// Remove and return a source. Unknown or stale ids are ignored.
    pub fn remove_source(&mut self, id: SourceId) -> Option<Source> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let source = slot.source.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        Some(source)
    }

    pub fn source(&self, id: SourceId) -> Option<&Source> {
        self.slots
            .get(id.index as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.source.as_ref())
    }

    pub fn source_mut(&mut self, id: SourceId) -> Option<&mut Source> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.source.as_mut())
    }

    /// Number of registered sources.
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of sources currently producing sound.
    pub fn active_count(&self) -> usize {
        self.slots
            .iter()
            .filter_map(|s| s.source.as_ref())
            .filter(|s| s.is_active())
            .count()
    }

    /// Fill `out` with the sample-wise sum of every active source.
    pub fn mix_audio(&mut self, out: &mut Vec<f32>, num_samples: usize) {
        prepare_stereo(out, num_samples);
        for source in self.slots.iter_mut().filter_map(|s| s.source.as_mut()) {
            if !source.is_active() {
                continue;
            }
            source.generate_samples(&mut self.scratch, num_samples);
            for (o, s) in out.iter_mut().zip(self.scratch.iter()) {
                *o += *s;
            }
        }
    }
}

/// Soft clipper using tanh to prevent harsh digital clipping.
pub fn soft_clip(x: f32) -> f32 {
    x.tanh()
}
