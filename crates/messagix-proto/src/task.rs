// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Outgoing task protocol.
//!
//! A task is a client-initiated mutation, identified by a string label that
//! maps to a fixed numeric opcode. Tasks travel in batches as the inner
//! variables of a LightSpeed request of type [`LsRequestType::Task`].
//!
//! [`LsRequestType::Task`]: crate::graphql::LsRequestType::Task

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Serialize, Serializer};

/// Label to opcode table, sorted by label.
pub const TASK_LABELS: &[(&str, &str)] = &[
    ("AddParticipantsTask", "23"),
    ("CreateGroupTask", "130"),
    ("CreatePollTask", "163"),
    ("CreateThreadTask", "209"),
    ("DeleteMessageMeOnlyTask", "155"),
    ("DeleteMessageTask", "33"),
    ("DeleteThreadTask", "146"),
    ("EditMessageTask", "742"),
    ("FetchMessagesTask", "228"),
    ("FetchThreadsTask", "145"),
    ("GetContactsFullTask", "207"),
    ("GetContactsTask", "452"),
    ("MuteThreadTask", "144"),
    ("RemoveParticipantTask", "140"),
    ("RenameThreadTask", "32"),
    ("ReportAppStateTask", "123"),
    ("SearchUserSecondaryTask", "31"),
    ("SearchUserTask", "30"),
    ("SendMessageTask", "46"),
    ("SendReactionTask", "29"),
    ("SetThreadImageTask", "37"),
    ("ThreadMarkRead", "21"),
    ("UpdateAdminTask", "25"),
    ("UpdatePollTask", "164"),
];

/// Opcode string for `label`, if registered.
pub fn task_opcode(label: &str) -> Option<&'static str> {
    TASK_LABELS
        .binary_search_by(|(l, _)| (*l).cmp(label))
        .ok()
        .map(|i| TASK_LABELS[i].1)
}

/// Task creation errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskError {
    /// Label has no registered opcode.
    #[error("unknown task label: {0}")]
    UnknownTaskLabel(String),
    /// Payload or queue could not be serialized.
    #[error("task encoding failed: {0}")]
    Encode(String),
    /// The id counter has no ids left to hand out.
    #[error("task id space exhausted")]
    IdsExhausted,
}

/// Target queue of a task.
///
/// Structured queue names travel JSON-encoded, plain ones as-is.
#[derive(Debug, Clone, PartialEq)]
pub enum QueueName {
    /// Plain queue name, e.g. a thread key.
    Plain(String),
    /// Structured queue name.
    Structured(serde_json::Value),
}

impl QueueName {
    /// Wire string.
    pub fn to_wire(&self) -> String {
        match self {
            QueueName::Plain(name) => name.clone(),
            QueueName::Structured(value) => value.to_string(),
        }
    }
}

impl From<&str> for QueueName {
    fn from(name: &str) -> Self {
        QueueName::Plain(name.to_owned())
    }
}

impl From<String> for QueueName {
    fn from(name: String) -> Self {
        QueueName::Plain(name)
    }
}

impl Serialize for QueueName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            QueueName::Plain(name) => serializer.serialize_str(name),
            QueueName::Structured(value) => serializer.serialize_str(&value.to_string()),
        }
    }
}

/// One encoded task.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskRecord {
    /// Label the task was created from. Not sent.
    #[serde(skip)]
    pub name: String,
    /// Failure counter; `null` until the server reports one.
    pub failure_count: Option<u32>,
    /// Numeric opcode, as a string.
    pub label: String,
    /// JSON-encoded payload.
    pub payload: String,
    /// Target queue.
    pub queue_name: QueueName,
    /// Session-unique id.
    pub task_id: u64,
}

/// A typed task builder.
///
/// Each implementation owns the payload shape of its label; nothing checks
/// payloads across labels.
pub trait Task {
    /// Label from [`TASK_LABELS`].
    fn label(&self) -> &'static str;

    /// Payload and target queue.
    fn create(&self) -> Result<(serde_json::Value, QueueName), TaskError>;
}

/// Monotonic task-id source. Ids are never reused.
///
/// The counter refuses to wrap: `u64::MAX` is never issued, and once the
/// last id is taken every further request yields `None`.
#[derive(Debug, Default)]
pub struct TaskIdCounter {
    next: AtomicU64,
}

impl TaskIdCounter {
    /// Counter whose first id is `first`.
    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }

    /// Take the next id, or `None` once the id space is exhausted.
    pub fn next_id(&self) -> Option<u64> {
        self.next
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |id| id.checked_add(1))
            .ok()
    }

    /// Id the next call to [`Self::next_id`] returns.
    pub fn peek(&self) -> u64 {
        self.next.load(Ordering::Relaxed)
    }
}

/// Builds [`TaskRecord`]s against a shared id counter.
#[derive(Debug, Clone, Default)]
pub struct TaskEncoder {
    ids: Arc<TaskIdCounter>,
}

impl TaskEncoder {
    /// Encoder drawing ids from `ids`.
    pub fn new(ids: Arc<TaskIdCounter>) -> Self {
        Self { ids }
    }

    /// Shared counter.
    pub fn counter(&self) -> &Arc<TaskIdCounter> {
        &self.ids
    }

    /// Encode one task.
    ///
    /// The label is checked before an id is taken, so a rejected label burns
    /// no id.
    pub fn create_task<P: Serialize + ?Sized>(
        &self,
        label: &str,
        payload: &P,
        queue_name: QueueName,
    ) -> Result<TaskRecord, TaskError> {
        let opcode =
            task_opcode(label).ok_or_else(|| TaskError::UnknownTaskLabel(label.to_owned()))?;
        let payload =
            serde_json::to_string(payload).map_err(|e| TaskError::Encode(e.to_string()))?;
        Ok(TaskRecord {
            name: label.to_owned(),
            failure_count: None,
            label: opcode.to_owned(),
            payload,
            queue_name,
            task_id: self.ids.next_id().ok_or(TaskError::IdsExhausted)?,
        })
    }

    /// Encode a typed task.
    pub fn encode<T: Task + ?Sized>(&self, task: &T) -> Result<TaskRecord, TaskError> {
        let label = task.label();
        task_opcode(label).ok_or_else(|| TaskError::UnknownTaskLabel(label.to_owned()))?;
        let (payload, queue) = task.create()?;
        self.create_task(label, &payload, queue)
    }
}

/// Inner variables of a task request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskBatch {
    /// Epoch id, see [`generate_epoch_id`].
    pub epoch_id: i64,
    /// Tasks in send order.
    pub tasks: Vec<TaskRecord>,
    /// App-state version id.
    pub version_id: String,
    /// Optional trace id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_trace_id: Option<String>,
}

impl TaskBatch {
    /// Batch stamped with the current epoch.
    pub fn new(tasks: Vec<TaskRecord>, version_id: impl Into<String>) -> Self {
        Self {
            epoch_id: generate_epoch_id(),
            tasks,
            version_id: version_id.into(),
            data_trace_id: None,
        }
    }
}

/// Milliseconds since the Unix epoch, shifted left 22 bits.
pub fn generate_epoch_id() -> i64 {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX >> 22));
    millis << 22
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashSet;

    #[test]
    fn label_table_is_sorted_and_complete() {
        assert_eq!(TASK_LABELS.len(), 24);
        assert!(TASK_LABELS.windows(2).all(|w| w[0].0 < w[1].0));
        assert_eq!(task_opcode("SendMessageTask"), Some("46"));
        assert_eq!(task_opcode("ThreadMarkRead"), Some("21"));
        assert_eq!(task_opcode("EditMessageTask"), Some("742"));
        assert_eq!(task_opcode("sendmessagetask"), None);
    }

    #[test]
    fn five_sends_get_strictly_increasing_ids() {
        let encoder = TaskEncoder::default();
        let ids: Vec<u64> = (0..5)
            .map(|i| {
                let record = encoder
                    .create_task(
                        "SendMessageTask",
                        &json!({"text": format!("hi {i}"), "thread_id": 1}),
                        QueueName::from("1"),
                    )
                    .unwrap();
                let wire = serde_json::to_value(&record).unwrap();
                assert_eq!(wire["label"], "46");
                record.task_id
            })
            .collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]), "{ids:?}");
    }

    #[test]
    fn unknown_label_burns_no_id() {
        let encoder = TaskEncoder::new(Arc::new(TaskIdCounter::starting_at(10)));
        let err = encoder
            .create_task("LaunchRocketTask", &json!({}), "q".into())
            .unwrap_err();
        assert_eq!(err, TaskError::UnknownTaskLabel("LaunchRocketTask".into()));
        assert_eq!(encoder.counter().peek(), 10);
    }

    #[test]
    fn exhausted_counter_refuses_instead_of_wrapping() {
        let encoder = TaskEncoder::new(Arc::new(TaskIdCounter::starting_at(u64::MAX - 1)));
        let last = encoder
            .create_task("ThreadMarkRead", &json!({}), "q".into())
            .unwrap();
        assert_eq!(last.task_id, u64::MAX - 1);

        for _ in 0..2 {
            let err = encoder
                .create_task("ThreadMarkRead", &json!({}), "q".into())
                .unwrap_err();
            assert_eq!(err, TaskError::IdsExhausted);
        }
        assert_eq!(encoder.counter().peek(), u64::MAX);
        assert_eq!(encoder.counter().next_id(), None);
    }

    #[test]
    fn wire_form_of_a_record() {
        let encoder = TaskEncoder::default();
        let record = encoder
            .create_task(
                "ThreadMarkRead",
                &json!({"thread_id": 5, "last_read_watermark_ts": 1}),
                QueueName::Structured(json!(["mark_read", 5])),
            )
            .unwrap();
        let wire = serde_json::to_value(&record).unwrap();
        assert_eq!(
            wire,
            json!({
                "failure_count": null,
                "label": "21",
                "payload": "{\"last_read_watermark_ts\":1,\"thread_id\":5}",
                "queue_name": "[\"mark_read\",5]",
                "task_id": 0
            })
        );
    }

    struct MuteThread {
        thread: i64,
    }

    impl Task for MuteThread {
        fn label(&self) -> &'static str {
            "MuteThreadTask"
        }

        fn create(&self) -> Result<(serde_json::Value, QueueName), TaskError> {
            Ok((
                json!({"thread_key": self.thread, "mute_expire_time_ms": -1}),
                QueueName::Plain(self.thread.to_string()),
            ))
        }
    }

    #[test]
    fn typed_tasks_encode_through_the_table() {
        let record = TaskEncoder::default().encode(&MuteThread { thread: 9 }).unwrap();
        assert_eq!(record.label, "144");
        assert_eq!(record.name, "MuteThreadTask");
        assert_eq!(record.queue_name.to_wire(), "9");
    }

    #[test]
    fn concurrent_encoders_never_share_an_id() {
        let encoder = TaskEncoder::default();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let encoder = encoder.clone();
                std::thread::spawn(move || {
                    (0..100)
                        .map(|_| {
                            encoder
                                .create_task("SendMessageTask", &json!({}), "q".into())
                                .unwrap()
                                .task_id
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id), "id {id} reused");
            }
        }
        assert_eq!(seen.len(), 800);
    }

    #[test]
    fn batch_serialization() {
        let batch = TaskBatch {
            epoch_id: 42 << 22,
            tasks: Vec::new(),
            version_id: "v1".into(),
            data_trace_id: None,
        };
        let wire = serde_json::to_value(&batch).unwrap();
        assert!(wire.get("data_trace_id").is_none());
        assert_eq!(wire["epoch_id"], 42 << 22);
        assert!(generate_epoch_id() > 0);
    }
}
