//! Desktop notification transport.
//!
//! Platform notification dispatch lives behind one trait so a test double
//! can stand in without touching the display server.

use crate::transcript::Classification;

/// A destination for a rendered desktop notification. The default
/// production implementation is [`DesktopTransport`]; tests substitute a
/// recording double.
pub trait NotificationTransport: Send + Sync {
    fn notify(&self, request: &NotificationRequest) -> Result<(), String>;
}

#[derive(Debug, Clone)]
pub struct NotificationRequest {
    pub title: String,
    pub body: String,
    pub subtitle: Option<String>,
    pub time_sensitive: bool,
    pub icon: Option<String>,
}

impl NotificationRequest {
    pub fn for_classification(classification: &Classification, title: &str, body: &str, icon: Option<String>) -> Self {
        let time_sensitive =
            matches!(classification, Classification::SessionLimitReached | Classification::ApiError(_));
        Self { title: title.to_string(), body: body.to_string(), subtitle: None, time_sensitive, icon }
    }
}

/// `notify-rust`-backed transport. `notify-rust` itself folds unsupported
/// fields (subtitle, urgency on platforms without one) into the closest
/// available primitive, so this stays a thin mapping layer.
pub struct DesktopTransport;

impl NotificationTransport for DesktopTransport {
    fn notify(&self, request: &NotificationRequest) -> Result<(), String> {
        let mut notification = notify_rust::Notification::new();
        notification.summary(&request.title);

        let body = match &request.subtitle {
            Some(subtitle) => format!("{subtitle}\n{}", request.body),
            None => request.body.clone(),
        };
        notification.body(&body);

        if let Some(icon) = &request.icon {
            notification.icon(icon);
        }

        notification.urgency(if request.time_sensitive {
            notify_rust::Urgency::Critical
        } else {
            notify_rust::Urgency::Normal
        });

        notification.show().map_err(|e| e.to_string())?;
        Ok(())
    }
}

/// Emits the ASCII BEL character to stderr, used for the `terminal_bell`
/// config option independent of the desktop transport.
pub fn ring_terminal_bell() {
    eprint!("\u{7}");
}
