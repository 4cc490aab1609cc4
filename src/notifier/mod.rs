//! Notifier: desktop notification + sound + terminal bell delivery,
//! coordinated through a [`SoundScope`] so a short-lived process can wait
//! for in-flight audio before exiting.

pub mod audio;
pub mod desktop;

use std::sync::Arc;

use crate::config::Config;
use crate::transcript::Classification;

pub use audio::SoundScope;
pub use desktop::{NotificationRequest, NotificationTransport};

/// Everything [`deliver`] needs that isn't already on [`Config`].
pub struct DeliveryInput<'a> {
    pub classification: &'a Classification,
    pub title: &'a str,
    pub body: &'a str,
}

/// Sends the desktop notification synchronously (notify-rust's `show()`
/// call is itself near-instant — it hands off to the session bus and
/// returns) and, if sound is enabled, spawns a `std::thread` to play the
/// configured sound without blocking the caller. Returns the spawned
/// sound thread's handle, if any, so the caller can decide whether to
/// wait for it before exiting.
pub fn deliver(
    config: &Config,
    scope: &SoundScope,
    transport: &dyn NotificationTransport,
    input: &DeliveryInput,
) -> Option<std::thread::JoinHandle<()>> {
    let status = config.status_for(input.classification.status_key());
    if !status.is_enabled() {
        return None;
    }

    if config.desktop.is_terminal_bell_enabled() {
        desktop::ring_terminal_bell();
    }

    if config.desktop.is_enabled() {
        let title = status.title.clone().unwrap_or_else(|| input.title.to_string());
        let request = NotificationRequest::for_classification(
            input.classification,
            &title,
            input.body,
            config.desktop.app_icon.clone(),
        );
        if let Err(e) = transport.notify(&request) {
            tracing::warn!(error = %e, "desktop notification failed");
        }
    }

    if !config.desktop.is_sound_enabled() {
        return None;
    }
    let Some(sound_path) = status.sound_path.clone() else {
        return None;
    };

    let scope = scope.clone();
    let volume = config.desktop.volume();
    let device = config.desktop.output_device.clone();
    Some(std::thread::spawn(move || {
        audio::play_sound(&scope, &sound_path, volume, device.as_deref());
    }))
}

/// Wraps [`desktop::DesktopTransport`] behind `Arc<dyn NotificationTransport>`
/// for call sites that need a cheaply clonable handle (the webhook and
/// daemon modules share one transport instance across threads).
pub fn default_transport() -> Arc<dyn NotificationTransport> {
    Arc::new(desktop::DesktopTransport)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StatusEntry;
    use std::sync::Mutex;

    struct RecordingTransport {
        calls: Mutex<u32>,
    }
    impl NotificationTransport for RecordingTransport {
        fn notify(&self, _request: &NotificationRequest) -> Result<(), String> {
            *self.calls.lock().unwrap() += 1;
            Ok(())
        }
    }

    #[test]
    fn test_disabled_status_skips_delivery() {
        let mut config = Config::default();
        config.status.insert("task_complete".into(), StatusEntry { enabled: Some(false), ..Default::default() });
        let scope = SoundScope::new();
        let transport = RecordingTransport { calls: Mutex::new(0) };
        let input = DeliveryInput { classification: &Classification::TaskComplete, title: "Done", body: "body" };
        let handle = deliver(&config, &scope, &transport, &input);
        assert!(handle.is_none());
        assert_eq!(*transport.calls.lock().unwrap(), 0);
    }

    #[test]
    fn test_desktop_disabled_skips_notification_but_not_sound() {
        let mut config = Config::default();
        config.desktop.enabled = Some(false);
        config.desktop.sound_enabled = Some(true);
        config.status.insert(
            "task_complete".into(),
            StatusEntry { enabled: Some(true), sound_path: Some("/nonexistent/sound.wav".into()), ..Default::default() },
        );
        let scope = SoundScope::new();
        let transport = RecordingTransport { calls: Mutex::new(0) };
        let input = DeliveryInput { classification: &Classification::TaskComplete, title: "Done", body: "body" };
        let handle = deliver(&config, &scope, &transport, &input);
        assert_eq!(*transport.calls.lock().unwrap(), 0);
        if let Some(h) = handle {
            h.join().unwrap();
        }
    }

    #[test]
    fn test_no_sound_path_configured_returns_no_handle() {
        let config = Config::default();
        let scope = SoundScope::new();
        let transport = RecordingTransport { calls: Mutex::new(0) };
        let input = DeliveryInput { classification: &Classification::TaskComplete, title: "Done", body: "body" };
        let handle = deliver(&config, &scope, &transport, &input);
        assert!(handle.is_none());
        assert_eq!(*transport.calls.lock().unwrap(), 1);
    }
}
