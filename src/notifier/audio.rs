//! Sound playback: decoding via `rodio`, output-device selection via
//! `cpal`, and the scoped lifecycle that keeps the process alive exactly
//! long enough for in-flight sounds to finish.
//!
//! `rodio`/`cpal` cover MP3/WAV/FLAC/OGG well via the `symphonia-all`
//! decoder feature; AIFF support is best-effort and a decode failure is
//! logged at `warn!` and treated as a skip, never a hard error — a missed
//! chime must never fail the hook invocation.

use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait};

const DRAIN_PAD: Duration = Duration::from_millis(200);
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

struct SoundScopeState {
    closing: bool,
    in_flight: u32,
}

/// "The notifier owns the player exclusively": once [`SoundScope::begin_shutdown`]
/// is called no new sound task is admitted, and shutdown blocks (up to
/// [`SHUTDOWN_TIMEOUT`]) until every admitted task has called
/// [`SoundScope::task_finished`].
#[derive(Clone)]
pub struct SoundScope {
    inner: Arc<(Mutex<SoundScopeState>, Condvar)>,
}

impl SoundScope {
    pub fn new() -> Self {
        Self { inner: Arc::new((Mutex::new(SoundScopeState { closing: false, in_flight: 0 }), Condvar::new())) }
    }

    /// Attempt to admit a new sound task. Returns `false` once shutdown
    /// has begun — the caller must not start playback.
    pub fn try_begin_task(&self) -> bool {
        let (lock, _) = &*self.inner;
        let mut state = lock.lock().unwrap();
        if state.closing {
            return false;
        }
        state.in_flight += 1;
        true
    }

    pub fn task_finished(&self) {
        let (lock, cvar) = &*self.inner;
        let mut state = lock.lock().unwrap();
        state.in_flight = state.in_flight.saturating_sub(1);
        if state.in_flight == 0 {
            cvar.notify_all();
        }
    }

    /// Mark the scope as closing and block until all in-flight tasks
    /// finish (or `SHUTDOWN_TIMEOUT` elapses), then sleep `DRAIN_PAD` to
    /// allow the audio backend itself to flush its buffer.
    pub fn begin_shutdown(&self) {
        let (lock, cvar) = &*self.inner;
        let mut state = lock.lock().unwrap();
        state.closing = true;
        let (state, timeout_result) = cvar
            .wait_timeout_while(state, SHUTDOWN_TIMEOUT, |s| s.in_flight > 0)
            .unwrap();
        if timeout_result.timed_out() {
            tracing::warn!(in_flight = state.in_flight, "sound scope shutdown timed out");
        }
        drop(state);
        std::thread::sleep(DRAIN_PAD);
    }
}

impl Default for SoundScope {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve a configured output device name against the available `cpal`
/// output devices via case-insensitive substring match, falling back to
/// the host's default device when no name is configured or nothing
/// matches.
pub fn resolve_output_device(name: Option<&str>) -> Option<cpal::Device> {
    let host = cpal::default_host();
    let Some(name) = name else {
        return host.default_output_device();
    };
    let wanted = name.to_ascii_lowercase();

    if let Ok(devices) = host.output_devices() {
        for device in devices {
            if let Ok(device_name) = device.name() {
                if device_name.to_ascii_lowercase().contains(&wanted) {
                    return Some(device);
                }
            }
        }
    }
    tracing::warn!(device = name, "configured output device not found, using default");
    host.default_output_device()
}

/// Play a sound file to completion on the given scope. Runs synchronously
/// on the calling thread — callers spawn this on a `std::thread` to get
/// parallelism with other sounds/webhooks.
pub fn play_sound(scope: &SoundScope, path: &str, volume: f64, device_name: Option<&str>) {
    if !scope.try_begin_task() {
        return;
    }
    let result = play_sound_inner(path, volume, device_name);
    if let Err(e) = result {
        tracing::warn!(path, error = %e, "failed to play sound");
    }
    scope.task_finished();
}

fn play_sound_inner(path: &str, volume: f64, device_name: Option<&str>) -> Result<(), String> {
    let device = resolve_output_device(device_name).ok_or("no output device available")?;
    let (_stream, handle) = rodio::OutputStream::try_from_device(&device).map_err(|e| e.to_string())?;
    let sink = rodio::Sink::try_new(&handle).map_err(|e| e.to_string())?;
    sink.set_volume(volume.clamp(0.0, 1.0) as f32);

    let file = std::fs::File::open(path).map_err(|e| e.to_string())?;
    let source = rodio::Decoder::new(std::io::BufReader::new(file)).map_err(|e| e.to_string())?;
    sink.append(source);
    sink.sleep_until_end();
    Ok(())
}
