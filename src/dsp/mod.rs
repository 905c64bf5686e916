//! Synthesis primitives: oscillators, envelopes, and the mixer.
//!
//! Every source renders interleaved stereo `f32` buffers through the
//! [`Synthesizer`](source::Synthesizer) trait. All arithmetic is done in
//! `f64` and converted at the buffer boundary.

pub mod envelope;
pub mod mixer;
pub mod oscillator;
pub mod source;
