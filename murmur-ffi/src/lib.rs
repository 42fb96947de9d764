//! C ABI wrapper for the Murmur engine.
//!
//! Exposes a small set of functions to create/destroy an engine, drive
//! playback, and pull interleaved f32 samples. The host owns the audio device
//! and calls `murmur_render_interleaved_f32` from its callback.
//!
//! ABI notes
//! - All functions are `extern "C"` and `#[no_mangle]`.
//! - Opaque handle type: `MurmurEngine` (heap-allocated; you own/delete it).
//! - Strings are NUL-terminated UTF-8. Returned strings are static; do not free them.
//!
//! Threading
//! - The object is NOT thread-safe; serialize all calls on one handle.

use std::ffi::{c_char, CStr, CString};
use std::path::PathBuf;
use std::sync::OnceLock;

use murmur_engine::{catalog, EngineConfig, JsonFileStore, OfflineContext, SoundEngine};

/// Opaque engine wrapper we hand to C.
pub struct MurmurEngine {
    inner: SoundEngine,
}

fn cstr<'a>(p: *const c_char) -> Option<&'a str> {
    if p.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(p) }.to_str().ok()
}

/// One catalog entry as C strings.
struct CEntry {
    id: CString,
    name: CString,
    icon: CString,
}

/// The catalog as C strings, in catalog order.
fn c_catalog() -> &'static [CEntry] {
    static TABLE: OnceLock<Vec<CEntry>> = OnceLock::new();
    TABLE.get_or_init(|| {
        catalog()
            .iter()
            .filter_map(|d| {
                Some(CEntry {
                    id: CString::new(d.id.as_str()).ok()?,
                    name: CString::new(d.display_name).ok()?,
                    icon: CString::new(d.icon).ok()?,
                })
            })
            .collect()
    })
}

fn engine_mut<'a>(engine: *mut MurmurEngine) -> Option<&'a mut MurmurEngine> {
    if engine.is_null() { None } else { Some(unsafe { &mut *engine }) }
}

fn engine_ref<'a>(engine: *const MurmurEngine) -> Option<&'a MurmurEngine> {
    if engine.is_null() { None } else { Some(unsafe { &*engine }) }
}

// --- Creation / destruction -------------------------------------------------------

/// Create a new idle engine rendering `channels` interleaved channels at `sample_rate`.
///
/// `prefs_path` may be null (no persistence) or a path to a JSON preferences file.
/// Returns null if the parameters are invalid.
#[no_mangle]
pub extern "C" fn murmur_create(sample_rate: f32, channels: u32, prefs_path: *const c_char) -> *mut MurmurEngine {
    let config = EngineConfig { sample_rate, channels: channels as usize, ..EngineConfig::default() };
    let mut builder = SoundEngine::builder(config.clone())
        .context(OfflineContext::new(config.sample_rate, config.channels));
    if let Some(path) = cstr(prefs_path) {
        builder = builder.prefs(JsonFileStore::new(PathBuf::from(path)));
    }
    match builder.build() {
        Ok(inner) => Box::into_raw(Box::new(MurmurEngine { inner })),
        Err(_) => std::ptr::null_mut(),
    }
}

/// Destroy an engine previously returned by `murmur_create`.
#[no_mangle]
pub extern "C" fn murmur_destroy(engine: *mut MurmurEngine) {
    if !engine.is_null() {
        unsafe { drop(Box::from_raw(engine)); }
    }
}

// --- Playback control ------------------------------------------------------------

/// Start (or switch to) soundscape `id`. Returns 1 if it is playing afterwards.
#[no_mangle]
pub extern "C" fn murmur_play(engine: *mut MurmurEngine, id: *const c_char) -> i32 {
    match (engine_mut(engine), cstr(id)) {
        (Some(e), Some(id)) => i32::from(e.inner.play(id)),
        _ => 0,
    }
}

#[no_mangle]
pub extern "C" fn murmur_stop(engine: *mut MurmurEngine) {
    if let Some(e) = engine_mut(engine) {
        e.inner.stop();
    }
}

/// Returns 1 if `id` is playing afterwards.
#[no_mangle]
pub extern "C" fn murmur_toggle(engine: *mut MurmurEngine, id: *const c_char) -> i32 {
    match (engine_mut(engine), cstr(id)) {
        (Some(e), Some(id)) => i32::from(e.inner.toggle(id)),
        _ => 0,
    }
}

/// Set master volume; clamped to [0, 1] and ramped.
#[no_mangle]
pub extern "C" fn murmur_set_volume(engine: *mut MurmurEngine, volume: f32) {
    if let Some(e) = engine_mut(engine) {
        e.inner.set_volume(volume);
    }
}

// --- State queries ---------------------------------------------------------------

#[no_mangle]
pub extern "C" fn murmur_is_playing(engine: *const MurmurEngine) -> i32 {
    engine_ref(engine).map_or(0, |e| i32::from(e.inner.is_playing()))
}

/// Interleaved channel count expected by `murmur_render_interleaved_f32`.
#[no_mangle]
pub extern "C" fn murmur_channels(engine: *const MurmurEngine) -> u32 {
    engine_ref(engine).map_or(0, |e| e.inner.channels() as u32)
}

#[no_mangle]
pub extern "C" fn murmur_volume(engine: *const MurmurEngine) -> f32 {
    engine_ref(engine).map_or(0.0, |e| e.inner.volume())
}

/// Catalog index of the current soundscape, or -1 when idle.
#[no_mangle]
pub extern "C" fn murmur_current_soundscape(engine: *const MurmurEngine) -> i32 {
    engine_ref(engine)
        .and_then(|e| e.inner.current_soundscape())
        .map_or(-1, |id| id as i32)
}

// --- Catalog ---------------------------------------------------------------------

#[no_mangle]
pub extern "C" fn murmur_catalog_len() -> u32 {
    c_catalog().len() as u32
}

/// Id of catalog entry `index`, or null when out of range.
#[no_mangle]
pub extern "C" fn murmur_catalog_id(index: u32) -> *const c_char {
    c_catalog().get(index as usize).map_or(std::ptr::null(), |e| e.id.as_ptr())
}

/// Display name of catalog entry `index`, or null when out of range.
#[no_mangle]
pub extern "C" fn murmur_catalog_name(index: u32) -> *const c_char {
    c_catalog().get(index as usize).map_or(std::ptr::null(), |e| e.name.as_ptr())
}

/// Icon (an emoji) of catalog entry `index`, or null when out of range.
#[no_mangle]
pub extern "C" fn murmur_catalog_icon(index: u32) -> *const c_char {
    c_catalog().get(index as usize).map_or(std::ptr::null(), |e| e.icon.as_ptr())
}

// --- Rendering -------------------------------------------------------------------

/// Render `frames` of audio into an interleaved f32 buffer of the engine's
/// channel count (as passed to `murmur_create`, see `murmur_channels`).
///
/// Returns the number of frames rendered (0 on error).
#[no_mangle]
pub extern "C" fn murmur_render_interleaved_f32(
    engine: *mut MurmurEngine,
    out_interleaved: *mut f32,
    frames: u32,
) -> u32 {
    let Some(e) = engine_mut(engine) else { return 0 };
    if out_interleaved.is_null() || frames == 0 {
        return 0;
    }
    let out = unsafe { std::slice::from_raw_parts_mut(out_interleaved, frames as usize * e.inner.channels()) };
    e.inner.render(out);
    frames
}
