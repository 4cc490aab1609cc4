//! Optional UDS sidecar: a long-lived helper process that owns the
//! desktop/audio transports so repeated hook invocations within a single
//! Claude Code session don't each pay notify-rust/rodio startup cost.
//! Entirely optional — `handle-hook` works standalone without it.
//!
//! Wire protocol: length-delimited JSON. Each request/response is a
//! 4-byte big-endian length prefix followed by that many bytes of UTF-8
//! JSON. One thread per accepted connection, no tokio — mirrors the rest
//! of the crate's synchronous style.

use std::io::{Read, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::PathBuf;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::notifier::{self, DeliveryInput, NotificationTransport, SoundScope};
use crate::transcript::Classification;

const IDLE_TIMEOUT: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Request {
    Ping,
    Notify { classification: String, title: String, body: String },
    Stop,
}

#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Response {
    Pong,
    Delivered,
    Rejected { reason: String },
    Stopped,
}

pub fn socket_path() -> PathBuf {
    let uid = unsafe { libc_getuid() };
    if let Ok(runtime_dir) = std::env::var("XDG_RUNTIME_DIR") {
        return PathBuf::from(runtime_dir).join("clnotify.sock");
    }
    std::env::temp_dir().join(format!("clnotify-{uid}.sock"))
}

// Avoids pulling in the `libc` crate for a single getuid() call.
unsafe fn libc_getuid() -> u32 {
    unsafe extern "C" {
        fn getuid() -> u32;
    }
    unsafe { getuid() }
}

pub fn run() -> std::io::Result<()> {
    let path = socket_path();
    if path.exists() {
        std::fs::remove_file(&path)?;
    }
    let listener = UnixListener::bind(&path)?;
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))?;

    let config = Arc::new(Config::load());
    let transport = notifier::default_transport();
    let scope = SoundScope::new();
    let last_activity = Arc::new(AtomicI64::new(now_epoch()));

    let idle_watcher = {
        let last_activity = Arc::clone(&last_activity);
        let path = path.clone();
        std::thread::spawn(move || loop {
            std::thread::sleep(Duration::from_secs(15));
            let idle = now_epoch() - last_activity.load(Ordering::SeqCst);
            if idle as u64 >= IDLE_TIMEOUT.as_secs() {
                let _ = std::fs::remove_file(&path);
                std::process::exit(0);
            }
        })
    };

    for stream in listener.incoming() {
        let Ok(stream) = stream else { continue };
        last_activity.store(now_epoch(), Ordering::SeqCst);
        let config = Arc::clone(&config);
        let transport = Arc::clone(&transport);
        let scope = scope.clone();
        std::thread::spawn(move || {
            if let Err(e) = handle_connection(stream, &config, transport.as_ref(), &scope) {
                tracing::warn!(error = %e, "daemon connection error");
            }
        });
    }

    idle_watcher.join().ok();
    Ok(())
}

fn handle_connection(
    mut stream: UnixStream,
    config: &Config,
    transport: &dyn NotificationTransport,
    scope: &SoundScope,
) -> std::io::Result<()> {
    loop {
        let request = match read_message(&mut stream) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return Ok(()),
            Err(e) => return Err(e),
        };

        let request: Request = match serde_json::from_slice(&request) {
            Ok(r) => r,
            Err(_) => {
                write_message(&mut stream, &Response::Rejected { reason: "invalid request".into() })?;
                continue;
            }
        };

        let response = match request {
            Request::Ping => Response::Pong,
            Request::Stop => {
                write_message(&mut stream, &Response::Stopped)?;
                std::process::exit(0);
            }
            Request::Notify { classification, title, body } => {
                let classification = classification_from_key(&classification);
                let input = DeliveryInput { classification: &classification, title: &title, body: &body };
                notifier::deliver(config, scope, transport, &input);
                Response::Delivered
            }
        };
        write_message(&mut stream, &response)?;
    }
}

fn classification_from_key(key: &str) -> Classification {
    match key {
        "task_complete" => Classification::TaskComplete,
        "review_complete" => Classification::ReviewComplete,
        "question" => Classification::Question,
        "plan_ready" => Classification::PlanReady,
        "session_limit_reached" => Classification::SessionLimitReached,
        _ => Classification::Unknown,
    }
}

fn read_message(stream: &mut UnixStream) -> std::io::Result<Option<Vec<u8>>> {
    let mut len_buf = [0u8; 4];
    match stream.read_exact(&mut len_buf) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    }
    let len = u32::from_be_bytes(len_buf) as usize;
    let mut buf = vec![0u8; len];
    stream.read_exact(&mut buf)?;
    Ok(Some(buf))
}

fn write_message<T: Serialize>(stream: &mut UnixStream, message: &T) -> std::io::Result<()> {
    let bytes = serde_json::to_vec(message)?;
    stream.write_all(&(bytes.len() as u32).to_be_bytes())?;
    stream.write_all(&bytes)?;
    Ok(())
}

fn now_epoch() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs() as i64).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_from_key_known() {
        assert_eq!(classification_from_key("task_complete"), Classification::TaskComplete);
    }

    #[test]
    fn test_classification_from_key_unknown_falls_back() {
        assert_eq!(classification_from_key("garbage"), Classification::Unknown);
    }

    #[test]
    fn test_socket_path_uses_xdg_runtime_dir() {
        unsafe { std::env::set_var("XDG_RUNTIME_DIR", "/tmp/xdgtest") };
        assert_eq!(socket_path(), PathBuf::from("/tmp/xdgtest/clnotify.sock"));
        unsafe { std::env::remove_var("XDG_RUNTIME_DIR") };
    }
}
