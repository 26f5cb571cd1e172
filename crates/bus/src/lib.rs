// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! triage-bus: the filesystem message bus (Component I, §4.I). Each agent
//! gets `<root>/<agent>/inbox` and `<root>/<agent>/outbox` directories; a
//! message is one JSON file, written atomically and deleted on successful
//! receipt. Delivery is at-least-once — a crash between read and delete
//! replays the message, so recipients must be idempotent on `id`.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::warn;
use triage_core::{Message, MessageId};

#[derive(Debug, Error)]
pub enum BusError {
    #[error("io error at {path}: {source}")]
    Io { path: PathBuf, #[source] source: std::io::Error },
}

/// Root directory holding one `<agent>/{inbox,outbox}` pair per agent.
pub struct MessageBus {
    root: PathBuf,
}

impl MessageBus {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn inbox_dir(&self, agent: &str) -> PathBuf {
        self.root.join(agent).join("inbox")
    }

    fn outbox_dir(&self, agent: &str) -> PathBuf {
        self.root.join(agent).join("outbox")
    }

    /// Write `msg` to `msg.to`'s inbox, assigning an `id` if absent is the
    /// caller's job (`Message::new` always sets one). Atomic write-to-temp
    /// then rename, so a half-written file is never visible to a poller.
    #[allow(clippy::expect_used)]
    pub fn send(&self, msg: &Message) -> Result<(), BusError> {
        let dir = self.inbox_dir(&msg.to);
        fs::create_dir_all(&dir).map_err(|e| BusError::Io { path: dir.clone(), source: e })?;

        let path = dir.join(msg.file_name());
        let tmp = dir.join(format!("{}.tmp", msg.id));
        let json = serde_json::to_vec_pretty(msg).expect("Message always serializes");
        fs::write(&tmp, &json).map_err(|e| BusError::Io { path: tmp.clone(), source: e })?;
        fs::rename(&tmp, &path).map_err(|e| BusError::Io { path: path.clone(), source: e })?;
        Ok(())
    }

    /// Copy of `send` targeting `agent`'s outbox, used when an agent process
    /// reports results back through its own outbox rather than directly into
    /// another inbox.
    #[allow(clippy::expect_used)]
    pub fn send_to_outbox(&self, agent: &str, msg: &Message) -> Result<(), BusError> {
        let dir = self.outbox_dir(agent);
        fs::create_dir_all(&dir).map_err(|e| BusError::Io { path: dir.clone(), source: e })?;
        let path = dir.join(msg.file_name());
        let tmp = dir.join(format!("{}.tmp", msg.id));
        let json = serde_json::to_vec_pretty(msg).expect("Message always serializes");
        fs::write(&tmp, &json).map_err(|e| BusError::Io { path: tmp.clone(), source: e })?;
        fs::rename(&tmp, &path).map_err(|e| BusError::Io { path: path.clone(), source: e })?;
        Ok(())
    }

    /// Drain `agent`'s inbox in filename order (timestamp-prefixed, so
    /// monotone enough in practice). Each file is deleted once parsed; a
    /// parse failure leaves the file in place as a dead letter.
    pub fn poll_inbox(&self, agent: &str) -> Result<Vec<Message>, BusError> {
        self.drain(&self.inbox_dir(agent))
    }

    /// Drain `agent`'s outbox the same way, for the coordinator side reading
    /// results an agent process left behind.
    pub fn poll_outbox(&self, agent: &str) -> Result<Vec<Message>, BusError> {
        self.drain(&self.outbox_dir(agent))
    }

    fn drain(&self, dir: &Path) -> Result<Vec<Message>, BusError> {
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut names: Vec<PathBuf> = fs::read_dir(dir)
            .map_err(|e| BusError::Io { path: dir.to_path_buf(), source: e })?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("json"))
            .collect();
        names.sort();

        let mut messages = Vec::with_capacity(names.len());
        for path in names {
            let bytes = match fs::read(&path) {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to read bus message");
                    continue;
                }
            };
            match serde_json::from_slice::<Message>(&bytes) {
                Ok(msg) => {
                    if let Err(e) = fs::remove_file(&path) {
                        warn!(path = %path.display(), error = %e, "failed to delete delivered bus message");
                    }
                    messages.push(msg);
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "dead-lettering unparseable bus message");
                }
            }
        }
        Ok(messages)
    }
}

/// Convenience for generating a fresh [`MessageId`] when assembling a
/// [`Message`] to send.
pub fn new_message_id() -> MessageId {
    MessageId::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use triage_core::MessageType;

    fn msg(to: &str, ts: u64) -> Message {
        Message::new(MessageId::new(), MessageType::Heartbeat, "worker-1", to, ts, json!({"ok": true}))
    }

    #[test]
    fn send_then_poll_round_trips_and_deletes() {
        let dir = tempfile::tempdir().unwrap();
        let bus = MessageBus::new(dir.path());
        bus.send(&msg("coordinator", 100)).unwrap();

        let delivered = bus.poll_inbox("coordinator").unwrap();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].from, "worker-1");

        let second_poll = bus.poll_inbox("coordinator").unwrap();
        assert!(second_poll.is_empty(), "delivered messages must be deleted");
    }

    #[test]
    fn messages_are_polled_in_filename_timestamp_order() {
        let dir = tempfile::tempdir().unwrap();
        let bus = MessageBus::new(dir.path());
        bus.send(&msg("coordinator", 200)).unwrap();
        bus.send(&msg("coordinator", 100)).unwrap();

        let delivered = bus.poll_inbox("coordinator").unwrap();
        assert_eq!(delivered.len(), 2);
        assert_eq!(delivered[0].timestamp, 100);
        assert_eq!(delivered[1].timestamp, 200);
    }

    #[test]
    fn unparseable_message_is_dead_lettered_not_deleted() {
        let dir = tempfile::tempdir().unwrap();
        let inbox = dir.path().join("coordinator").join("inbox");
        fs::create_dir_all(&inbox).unwrap();
        fs::write(inbox.join("100_bad_HEARTBEAT.json"), b"not json").unwrap();

        let bus = MessageBus::new(dir.path());
        let delivered = bus.poll_inbox("coordinator").unwrap();
        assert!(delivered.is_empty());
        assert!(inbox.join("100_bad_HEARTBEAT.json").exists(), "dead letter must survive");
    }

    #[test]
    fn empty_inbox_polls_to_an_empty_vec() {
        let dir = tempfile::tempdir().unwrap();
        let bus = MessageBus::new(dir.path());
        assert!(bus.poll_inbox("nobody").unwrap().is_empty());
    }
}
