//! Grouping of flat message batches into conversation units.
//!
//! A conversation unit is the atom of triage: either one standalone
//! message or one full reply thread. Its identity key (thread root
//! timestamp, or the message's own timestamp) is the dedup and upsert
//! key for everything downstream.

use crate::message::RawMessage;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Whether a unit is a single message or a whole thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitKind {
    Standalone,
    Thread,
}

impl UnitKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitKind::Standalone => "standalone",
            UnitKind::Thread => "thread",
        }
    }
}

/// One standalone message or one full thread, serialized for analysis.
#[derive(Debug, Clone)]
pub struct ConversationUnit {
    pub kind: UnitKind,
    /// Thread root ts for threads, the message's own ts otherwise.
    /// Unique per run; `(identity_key, channel_id)` is the upsert key.
    pub identity_key: String,
    /// Messages in chronological order.
    pub messages: Vec<RawMessage>,
    /// `"sender: text"` lines, newline-joined, in message order.
    /// Deterministic for a given input batch.
    pub conversation_text: String,
    /// Sender of the first message in the unit.
    pub primary_sender: String,
}

/// Partition a flat batch into conversation units.
///
/// Messages carrying a thread root are grouped under that root (a
/// parent whose root equals its own timestamp lands in its own thread,
/// as the first entry); the rest become standalone units. Thread
/// messages are sorted by numeric timestamp ascending; the sort is
/// stable, so equal timestamps keep their input order. Standalone
/// units come first, then threads in first-seen order.
pub fn group_messages(messages: Vec<RawMessage>) -> Vec<ConversationUnit> {
    let mut thread_order: Vec<String> = Vec::new();
    let mut threads: HashMap<String, Vec<RawMessage>> = HashMap::new();
    let mut standalone: Vec<RawMessage> = Vec::new();

    for msg in messages {
        match msg.thread_root.clone() {
            Some(root) => {
                let group = threads.entry(root.clone()).or_insert_with(|| {
                    thread_order.push(root);
                    Vec::new()
                });
                group.push(msg);
            }
            None => standalone.push(msg),
        }
    }

    let mut units = Vec::with_capacity(standalone.len() + thread_order.len());

    for msg in standalone {
        units.push(ConversationUnit {
            kind: UnitKind::Standalone,
            identity_key: msg.timestamp.clone(),
            conversation_text: format!("{}: {}", msg.sender_name, msg.text),
            primary_sender: msg.sender_name.clone(),
            messages: vec![msg],
        });
    }

    for root in thread_order {
        let mut msgs = threads.remove(&root).unwrap_or_default();
        msgs.sort_by(|a, b| {
            let ta = a.timestamp.parse::<f64>().unwrap_or(0.0);
            let tb = b.timestamp.parse::<f64>().unwrap_or(0.0);
            ta.partial_cmp(&tb).unwrap_or(std::cmp::Ordering::Equal)
        });
        let conversation_text = msgs
            .iter()
            .map(|m| format!("{}: {}", m.sender_name, m.text))
            .collect::<Vec<_>>()
            .join("\n");
        let primary_sender = msgs
            .first()
            .map(|m| m.sender_name.clone())
            .unwrap_or_default();
        units.push(ConversationUnit {
            kind: UnitKind::Thread,
            identity_key: root,
            messages: msgs,
            conversation_text,
            primary_sender,
        });
    }

    units
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(sender: &str, text: &str, ts: &str, root: Option<&str>) -> RawMessage {
        RawMessage {
            sender_id: format!("U_{sender}"),
            sender_name: sender.to_string(),
            text: text.to_string(),
            timestamp: ts.to_string(),
            channel_id: "C01".to_string(),
            thread_root: root.map(|r| r.to_string()),
        }
    }

    #[test]
    fn test_standalone_units_come_first() {
        let units = group_messages(vec![
            msg("Ana", "reply", "5.0", Some("2.0")),
            msg("Bo", "hello", "1.0", None),
            msg("Ana", "root", "2.0", Some("2.0")),
        ]);
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].kind, UnitKind::Standalone);
        assert_eq!(units[0].identity_key, "1.0");
        assert_eq!(units[1].kind, UnitKind::Thread);
        assert_eq!(units[1].identity_key, "2.0");
    }

    #[test]
    fn test_thread_sorted_chronologically_regardless_of_input_order() {
        // Timestamps arrive as [3, 1, 2]; serialization must read 1, 2, 3.
        let units = group_messages(vec![
            msg("Cy", "third", "3.0", Some("1.0")),
            msg("Ana", "first", "1.0", Some("1.0")),
            msg("Bo", "second", "2.0", Some("1.0")),
        ]);
        assert_eq!(units.len(), 1);
        assert_eq!(
            units[0].conversation_text,
            "Ana: first\nBo: second\nCy: third"
        );
        assert_eq!(units[0].primary_sender, "Ana");
    }

    #[test]
    fn test_parent_rooted_at_own_timestamp_leads_its_thread() {
        let units = group_messages(vec![
            msg("Bo", "answer", "9.5", Some("9.0")),
            msg("Ana", "question", "9.0", Some("9.0")),
        ]);
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].identity_key, "9.0");
        assert!(units[0].conversation_text.starts_with("Ana: question"));
    }

    #[test]
    fn test_grouping_is_idempotent() {
        let batch = vec![
            msg("Ana", "a", "1.1", None),
            msg("Bo", "b", "2.2", Some("2.2")),
            msg("Cy", "c", "2.9", Some("2.2")),
        ];
        let first = group_messages(batch.clone());
        let second = group_messages(batch);
        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.identity_key, b.identity_key);
            assert_eq!(a.conversation_text, b.conversation_text);
        }
    }

    #[test]
    fn test_equal_timestamps_keep_input_order() {
        let units = group_messages(vec![
            msg("Ana", "one", "4.0", Some("4.0")),
            msg("Bo", "two", "4.0", Some("4.0")),
        ]);
        assert_eq!(units[0].conversation_text, "Ana: one\nBo: two");
    }
}
