pub mod config;
pub mod dsp;
pub mod engine;
pub mod error;
pub mod integration;
pub mod physics;
pub mod procedural;

use crate::config::SandboxConfig;
use crate::engine::{EngineStats, SandboxEngine};
use crate::error::SandboxError;
use wasm_bindgen::prelude::*;

/// The crate version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// WASM-exposed: return the sonic-sandbox-core version string.
#[wasm_bindgen]
pub fn core_version() -> String {
    VERSION.to_string()
}

/// Run the sandbox described by `config_json` for `seconds` of audio.
///
/// The world advances by exactly one buffer's worth of time per update, so
/// physics and audio stay in lockstep. Returns the engine for inspection along
/// with the interleaved stereo output.
pub fn render_sandbox(config_json: &str, seconds: f64) -> Result<(SandboxEngine, Vec<f32>), SandboxError> {
    let mut engine = SandboxEngine::from_json(config_json)?;
    let config = engine.config();
    let sample_rate = config.sample_rate;
    let frames_per_buffer = config.buffer_frames;

    let seconds = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
    let mut remaining = (seconds * sample_rate).round() as usize;
    let mut output = Vec::with_capacity(remaining * 2);
    let mut buffer = Vec::with_capacity(frames_per_buffer * 2);

    while remaining > 0 {
        let frames = remaining.min(frames_per_buffer);
        engine.update_frames(frames as f64 / sample_rate, &mut buffer, frames);
        output.extend_from_slice(&buffer);
        remaining -= frames;
    }
    Ok((engine, output))
}

/// WASM-exposed: render `seconds` of interleaved stereo f32 samples.
/// Returns the raw audio buffer for AudioWorklet playback.
#[wasm_bindgen]
pub fn render_sandbox_samples(config_json: &str, seconds: f64) -> Result<Vec<f32>, JsValue> {
    let (_, samples) = render_sandbox(config_json, seconds).map_err(|e| JsValue::from_str(&format!("{e}")))?;
    Ok(samples)
}

/// WASM-exposed: run the sandbox for `seconds` and return its [`EngineStats`].
#[wasm_bindgen]
pub fn sandbox_stats(config_json: &str, seconds: f64) -> Result<JsValue, JsValue> {
    let (engine, _) = render_sandbox(config_json, seconds).map_err(|e| JsValue::from_str(&format!("{e}")))?;
    let stats: EngineStats = engine.get_stats();
    serde_wasm_bindgen::to_value(&stats).map_err(|e| JsValue::from_str(&format!("{e}")))
}

/// WASM-exposed: the default configuration as pretty-printed JSON.
#[wasm_bindgen]
pub fn default_config_json() -> Result<String, JsValue> {
    SandboxConfig::default()
        .to_json()
        .map_err(|e| JsValue::from_str(&format!("{e}")))
}
