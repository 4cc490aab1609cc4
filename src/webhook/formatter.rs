//! Per-preset webhook payload formatting.
//!
//! Each preset knows only how to turn a notification event into the JSON
//! (or form-encoded text, for `custom`+`PayloadEncoding::Text`) body its
//! receiving service expects. None of them know about retries, rate
//! limits, or circuits — those are the engine's job.

use serde_json::json;

use crate::config::{PayloadEncoding, WebhookConfig, WebhookPreset};

#[derive(Debug, Clone, Default)]
pub struct WebhookMessage {
    pub title: String,
    pub body: String,
    pub status: String,
    pub session_id: String,
    pub timestamp: i64,
}

/// Render `message` into an HTTP request body for the given config's
/// preset, returning `(body_bytes, content_type)`.
pub fn format(config: &WebhookConfig, message: &WebhookMessage) -> (Vec<u8>, &'static str) {
    match config.preset() {
        WebhookPreset::Slack => {
            let payload = json!({
                "attachments": [{
                    "color": slack_color(&message.status),
                    "title": message.title,
                    "text": message.body,
                }],
            });
            (payload.to_string().into_bytes(), "application/json")
        }
        WebhookPreset::Discord => {
            let payload = json!({
                "embeds": [{
                    "title": message.title,
                    "description": message.body,
                    "color": discord_color(&message.status),
                }],
            });
            (payload.to_string().into_bytes(), "application/json")
        }
        WebhookPreset::Telegram => {
            let chat_id = config.chat_id.clone().unwrap_or_default();
            let payload = json!({
                "chat_id": chat_id,
                "text": format!("<b>{}</b>\n{}", escape_html(&message.title), escape_html(&message.body)),
                "parse_mode": "HTML",
            });
            (payload.to_string().into_bytes(), "application/json")
        }
        WebhookPreset::Lark => {
            let payload = json!({
                "msg_type": "interactive",
                "card": {
                    "header": { "title": { "tag": "plain_text", "content": message.title } },
                    "elements": [{ "tag": "div", "text": { "tag": "plain_text", "content": message.body } }],
                },
            });
            (payload.to_string().into_bytes(), "application/json")
        }
        WebhookPreset::Custom => format_custom(config, message),
    }
}

fn slack_color(status: &str) -> &'static str {
    match status {
        "api_error" | "session_limit_reached" => "danger",
        "question" => "warning",
        _ => "good",
    }
}

fn discord_color(status: &str) -> u32 {
    match status {
        "api_error" | "session_limit_reached" => 0xE74C3C,
        "question" => 0xF1C40F,
        _ => 0x2ECC71,
    }
}

fn escape_html(input: &str) -> String {
    input.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn format_custom(config: &WebhookConfig, message: &WebhookMessage) -> (Vec<u8>, &'static str) {
    match config.payload_encoding {
        Some(PayloadEncoding::Text) => {
            let text = format!("{}\n{}", message.title, message.body);
            (text.into_bytes(), "text/plain")
        }
        _ => {
            let payload = json!({
                "status": message.status,
                "message": format!("{}: {}", message.title, message.body),
                "session_id": message.session_id,
                "timestamp": message.timestamp,
            });
            (payload.to_string().into_bytes(), "application/json")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(preset: WebhookPreset) -> WebhookConfig {
        WebhookConfig { preset: Some(preset), ..Default::default() }
    }

    fn message() -> WebhookMessage {
        WebhookMessage {
            title: "Done".into(),
            body: "All good".into(),
            status: "task_complete".into(),
            session_id: "S1".into(),
            timestamp: 1_700_000_000,
        }
    }

    #[test]
    fn test_slack_wraps_in_attachment_with_color() {
        let (body, ct) = format(&config(WebhookPreset::Slack), &message());
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        let attachment = &value["attachments"][0];
        assert!(attachment["text"].as_str().unwrap().contains("All good"));
        assert_eq!(attachment["color"], "good");
        assert_eq!(ct, "application/json");
    }

    #[test]
    fn test_discord_uses_embeds_with_decimal_color() {
        let (body, _) = format(&config(WebhookPreset::Discord), &message());
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        let embed = &value["embeds"][0];
        assert!(embed["description"].as_str().unwrap().contains("All good"));
        assert_eq!(embed["title"], "Done");
        assert!(embed["color"].as_u64().unwrap() > 0);
    }

    #[test]
    fn test_telegram_includes_chat_id_and_html_parse_mode() {
        let mut cfg = config(WebhookPreset::Telegram);
        cfg.chat_id = Some("12345".into());
        let (body, _) = format(&cfg, &message());
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["chat_id"], "12345");
        assert_eq!(value["parse_mode"], "HTML");
    }

    #[test]
    fn test_lark_uses_interactive_card() {
        let (body, _) = format(&config(WebhookPreset::Lark), &message());
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["msg_type"], "interactive");
        assert!(value["card"]["header"]["title"]["content"].as_str().unwrap().contains("Done"));
    }

    #[test]
    fn test_custom_text_encoding() {
        let mut cfg = config(WebhookPreset::Custom);
        cfg.payload_encoding = Some(PayloadEncoding::Text);
        let (body, ct) = format(&cfg, &message());
        assert_eq!(ct, "text/plain");
        assert_eq!(String::from_utf8(body).unwrap(), "Done\nAll good");
    }

    #[test]
    fn test_custom_json_default_shape() {
        let (body, ct) = format(&config(WebhookPreset::Custom), &message());
        assert_eq!(ct, "application/json");
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["status"], "task_complete");
        assert_eq!(value["session_id"], "S1");
        assert_eq!(value["timestamp"], 1_700_000_000);
        assert!(value["message"].as_str().unwrap().contains("All good"));
    }
}
