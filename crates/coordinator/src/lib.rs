// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! triage-coordinator: supervises the fixed set of typed worker processes
//! (Component J, §4.J) — spawn/respawn, the inbox poll loop, task dispatch
//! by capability and capacity, heartbeat health-checking, and graceful
//! shutdown.

mod process;

use std::collections::{HashMap, VecDeque};

use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};
use triage_bus::{BusError, MessageBus};
use triage_core::{AgentName, AgentRecord, AgentRecordStatus, Clock, CoordinatorConfig, Message, MessageType, Task, TaskId, TaskStatus, TaskType};

pub use process::{WorkerProcess, WorkerSpec};

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("bus error: {0}")]
    Bus(#[from] BusError),
    #[error("failed to spawn worker {name}: {source}")]
    Spawn { name: String, #[source] source: std::io::Error },
}

fn task_id_from_payload(payload: &Value) -> Option<TaskId> {
    payload.get("taskId")?.as_str().map(TaskId::from)
}

/// Supervises worker processes and dispatches tasks. Generic over [`Clock`]
/// so heartbeat-timeout logic is deterministic under test.
pub struct Coordinator<C: Clock> {
    bus: MessageBus,
    order: Vec<AgentName>,
    agents: HashMap<AgentName, AgentRecord>,
    workers: HashMap<AgentName, WorkerProcess>,
    pending: VecDeque<Task>,
    config: CoordinatorConfig,
    clock: C,
}

impl<C: Clock> Coordinator<C> {
    pub fn new(bus_root: impl Into<std::path::PathBuf>, config: CoordinatorConfig, clock: C) -> Self {
        Self {
            bus: MessageBus::new(bus_root),
            order: Vec::new(),
            agents: HashMap::new(),
            workers: HashMap::new(),
            pending: VecDeque::new(),
            config,
            clock,
        }
    }

    /// Spawn each configured worker as a child process (§4.J step 1),
    /// registering its capability set for dispatch.
    pub fn spawn_workers(&mut self, specs: Vec<WorkerSpec>) -> Result<(), CoordinatorError> {
        for spec in specs {
            let name = spec.name.clone();
            let record = AgentRecord::new(name.clone(), spec.capabilities.clone(), spec.max_concurrent, self.clock.epoch_ms());
            let worker = WorkerProcess::spawn(spec).map_err(|source| CoordinatorError::Spawn { name: name.to_string(), source })?;
            self.order.push(name.clone());
            self.agents.insert(name.clone(), record);
            self.workers.insert(name, worker);
        }
        Ok(())
    }

    pub fn submit_task(&mut self, task: Task) {
        self.pending.push_back(task);
    }

    pub fn agent(&self, name: &AgentName) -> Option<&AgentRecord> {
        self.agents.get(name)
    }

    /// Registered agents in configuration order, for status reporting.
    pub fn agents(&self) -> impl Iterator<Item = &AgentRecord> {
        self.order.iter().filter_map(|name| self.agents.get(name))
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Count of pending tasks of a given type, for the wire protocol's
    /// `pending_repairs` status field.
    pub fn pending_of_type(&self, task_type: TaskType) -> usize {
        self.pending.iter().filter(|t| t.task_type == task_type).count()
    }

    /// `selectAgent(type)` (§4.J): first registered agent in configuration
    /// order whose capabilities contain `task_type`, is `running`, and has
    /// spare capacity.
    pub fn select_agent(&self, task_type: TaskType) -> Option<AgentName> {
        self.order.iter().find(|name| {
            self.agents.get(*name).is_some_and(|a| {
                a.status == AgentRecordStatus::Running && a.can_handle(task_type) && a.has_capacity()
            })
        }).cloned()
    }

    /// One iteration of the poll loop (§4.J step 2): drain `core`'s inbox
    /// and dispatch by message type, then assign pending tasks to capable
    /// agents, then run the heartbeat health check.
    pub fn poll_once(&mut self) -> Result<(), CoordinatorError> {
        let messages = self.bus.poll_inbox("core")?;
        for msg in messages {
            self.handle_message(msg);
        }
        self.dispatch_pending()?;
        self.health_check();
        Ok(())
    }

    fn handle_message(&mut self, msg: Message) {
        let now = self.clock.epoch_ms();
        let from = AgentName::new(msg.from.clone());
        match msg.message_type {
            MessageType::Heartbeat => {
                if let Some(agent) = self.agents.get_mut(&from) {
                    agent.last_heartbeat = now;
                    agent.metrics = msg.payload;
                    if agent.status == AgentRecordStatus::Initializing || agent.status == AgentRecordStatus::Unresponsive {
                        agent.status = AgentRecordStatus::Running;
                    }
                }
            }
            MessageType::TaskAccepted => {
                if let Some(task_id) = task_id_from_payload(&msg.payload) {
                    self.for_task(&task_id, |task| task.accept(from.clone(), now));
                }
            }
            MessageType::ProgressUpdate => {
                info!(agent = %msg.from, payload = %msg.payload, "progress update");
            }
            MessageType::TaskCompleted => {
                if let Some(task_id) = task_id_from_payload(&msg.payload) {
                    let result = msg.payload.get("result").cloned().unwrap_or(Value::Null);
                    self.complete_task(&task_id, result, now, &from);
                }
            }
            MessageType::ErrorNotification => {
                if let Some(task_id) = task_id_from_payload(&msg.payload) {
                    self.handle_error_notification(&task_id, &msg.payload, now, &from);
                }
            }
            MessageType::TaskAssignment | MessageType::AssistantRequest | MessageType::AssistantResponse => {
                warn!(agent = %msg.from, message_type = ?msg.message_type, "coordinator received a message type it does not dispatch, ignoring");
            }
        }
    }

    fn for_task(&mut self, task_id: &TaskId, f: impl FnOnce(&mut Task)) {
        if let Some(task) = self.pending.iter_mut().find(|t| &t.task_id == task_id) {
            f(task);
        }
    }

    #[allow(clippy::expect_used)]
    fn complete_task(&mut self, task_id: &TaskId, result: Value, now: u64, agent: &AgentName) {
        let Some(pos) = self.pending.iter().position(|t| &t.task_id == task_id) else { return };
        let mut task = self.pending.remove(pos).expect("position just found");
        task.complete(result, now);
        if let Some(a) = self.agents.get_mut(agent) {
            a.active_tasks = a.active_tasks.saturating_sub(1);
        }
        info!(task_id = %task_id, agent = %agent, "task completed");
    }

    fn handle_error_notification(&mut self, task_id: &TaskId, payload: &Value, now: u64, agent: &AgentName) {
        let retryable = payload.get("retryable").and_then(Value::as_bool).unwrap_or(false);
        let error = payload.get("error").and_then(Value::as_str).unwrap_or("unknown error").to_string();

        if let Some(a) = self.agents.get_mut(agent) {
            a.active_tasks = a.active_tasks.saturating_sub(1);
        }

        let Some(pos) = self.pending.iter().position(|t| &t.task_id == task_id) else { return };
        let task = &mut self.pending[pos];
        task.fail(error, now);

        if retryable && task.retries < self.config.max_error_retries {
            task.retry();
            warn!(task_id = %task_id, retries = task.retries, "retrying failed task");
        } else {
            warn!(task_id = %task_id, "task failed permanently, removing from active set");
            self.pending.remove(pos);
        }
    }

    fn dispatch_pending(&mut self) -> Result<(), CoordinatorError> {
        let now = self.clock.epoch_ms();
        let candidates: Vec<usize> = self.pending.iter().enumerate()
            .filter(|(_, t)| t.status == TaskStatus::Pending && t.assigned_to.is_none())
            .map(|(i, _)| i)
            .collect();

        for idx in candidates {
            let task_type = self.pending[idx].task_type;
            let Some(agent) = self.select_agent(task_type) else { continue };
            let task = &mut self.pending[idx];
            task.assign(agent.clone());
            let msg = Message::new(triage_bus::new_message_id(), MessageType::TaskAssignment, "core", agent.to_string(), now, serde_json::json!({"taskId": task.task_id.to_string(), "type": task.task_type, "context": task.context, "payload": task.payload}));
            self.bus.send(&msg)?;
            if let Some(a) = self.agents.get_mut(&agent) {
                a.active_tasks += 1;
            }
        }
        Ok(())
    }

    /// Health check (§4.J step 2): any agent whose last heartbeat predates
    /// `heartbeat_timeout_ms` is marked unresponsive and its process killed,
    /// which the next `spawn_workers`/respawn cycle restarts.
    fn health_check(&mut self) {
        let now = self.clock.epoch_ms();
        let timeout = self.config.heartbeat_timeout_ms;
        let unresponsive: Vec<AgentName> = self.agents.iter()
            .filter(|(_, a)| a.status == AgentRecordStatus::Running && a.is_unresponsive(now, timeout))
            .map(|(name, _)| name.clone())
            .collect();

        for name in unresponsive {
            warn!(agent = %name, "agent missed heartbeat window, marking unresponsive");
            if let Some(a) = self.agents.get_mut(&name) {
                a.status = AgentRecordStatus::Unresponsive;
            }
            if let Some(worker) = self.workers.get_mut(&name) {
                worker.kill();
            }
        }
    }

    /// Respawn any worker whose process has exited, if configured to
    /// auto-restart and the cool-off has elapsed.
    pub fn reap_and_respawn(&mut self) -> Result<(), CoordinatorError> {
        let names: Vec<AgentName> = self.order.clone();
        let now = self.clock.epoch_ms();
        for name in names {
            let exited = self.workers.get_mut(&name).is_some_and(|w| w.has_exited(now));
            if !exited {
                continue;
            }
            let Some(worker) = self.workers.get(&name) else { continue };
            if !worker.spec().auto_restart {
                continue;
            }
            let elapsed = worker.since_exit_ms(self.clock.epoch_ms());
            if elapsed < self.config.restart_cooloff_ms {
                continue;
            }
            let spec = worker.spec().clone();
            info!(agent = %name, "respawning worker after cool-off");
            let respawned = WorkerProcess::spawn(spec).map_err(|source| CoordinatorError::Spawn { name: name.to_string(), source })?;
            self.workers.insert(name.clone(), respawned);
            if let Some(a) = self.agents.get_mut(&name) {
                a.status = AgentRecordStatus::Initializing;
                a.active_tasks = 0;
            }
        }
        Ok(())
    }

    /// Graceful shutdown (§4.J): signal every child to terminate, wait up to
    /// `shutdown_grace_ms`, then kill anything still alive.
    pub async fn shutdown(&mut self) {
        let grace = std::time::Duration::from_millis(self.config.shutdown_grace_ms);
        for name in self.order.clone() {
            if let Some(worker) = self.workers.get_mut(&name) {
                worker.terminate(grace).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use triage_core::{FakeClock, TaskId};

    fn coordinator() -> Coordinator<FakeClock> {
        let dir = tempfile::tempdir().unwrap();
        let mut config = CoordinatorConfig::default();
        config.heartbeat_timeout_ms = 1_000;
        Coordinator::new(dir.path(), config, FakeClock::new())
    }

    fn register(coord: &mut Coordinator<FakeClock>, name: &str, caps: &[TaskType], max: u32) {
        let now = coord.clock.epoch_ms();
        let record = AgentRecord::new(AgentName::new(name), caps.iter().copied().collect::<BTreeSet<_>>(), max, now);
        coord.order.push(AgentName::new(name));
        coord.agents.insert(AgentName::new(name), record);
    }

    fn mark_running(coord: &mut Coordinator<FakeClock>, name: &str) {
        coord.agents.get_mut(&AgentName::new(name)).unwrap().status = AgentRecordStatus::Running;
    }

    #[test]
    fn select_agent_picks_first_capable_agent_with_capacity_in_order() {
        let mut coord = coordinator();
        register(&mut coord, "worker-a", &[TaskType::Repair], 1);
        register(&mut coord, "worker-b", &[TaskType::Repair], 1);
        mark_running(&mut coord, "worker-a");
        mark_running(&mut coord, "worker-b");

        assert_eq!(coord.select_agent(TaskType::Repair), Some(AgentName::new("worker-a")));
    }

    #[test]
    fn select_agent_skips_agents_at_capacity() {
        let mut coord = coordinator();
        register(&mut coord, "worker-a", &[TaskType::Repair], 1);
        register(&mut coord, "worker-b", &[TaskType::Repair], 1);
        mark_running(&mut coord, "worker-a");
        mark_running(&mut coord, "worker-b");
        coord.agents.get_mut(&AgentName::new("worker-a")).unwrap().active_tasks = 1;

        assert_eq!(coord.select_agent(TaskType::Repair), Some(AgentName::new("worker-b")));
    }

    #[test]
    fn select_agent_ignores_agents_without_the_capability() {
        let mut coord = coordinator();
        register(&mut coord, "worker-a", &[TaskType::Analysis], 1);
        mark_running(&mut coord, "worker-a");

        assert_eq!(coord.select_agent(TaskType::Repair), None);
    }

    #[test]
    fn task_accepted_message_moves_task_to_accepted() {
        let mut coord = coordinator();
        let task_id = TaskId::new();
        let mut task = Task::new(task_id.clone(), TaskType::Repair, serde_json::json!({}), serde_json::json!({}), 0);
        task.assign(AgentName::new("worker-a"));
        coord.pending.push_back(task);

        let msg = Message::new(triage_bus::new_message_id(), MessageType::TaskAccepted, "worker-a", "core", 10, serde_json::json!({"taskId": task_id.to_string()}));
        coord.handle_message(msg);

        assert_eq!(coord.pending[0].status, TaskStatus::Accepted);
    }

    #[test]
    fn unretryable_error_notification_removes_the_task() {
        let mut coord = coordinator();
        register(&mut coord, "worker-a", &[TaskType::Repair], 1);
        let task_id = TaskId::new();
        let mut task = Task::new(task_id.clone(), TaskType::Repair, serde_json::json!({}), serde_json::json!({}), 0);
        task.assign(AgentName::new("worker-a"));
        coord.pending.push_back(task);
        coord.agents.get_mut(&AgentName::new("worker-a")).unwrap().active_tasks = 1;

        let msg = Message::new(triage_bus::new_message_id(), MessageType::ErrorNotification, "worker-a", "core", 10, serde_json::json!({"taskId": task_id.to_string(), "error": "boom", "retryable": false}));
        coord.handle_message(msg);

        assert!(coord.pending.is_empty());
        assert_eq!(coord.agents.get(&AgentName::new("worker-a")).unwrap().active_tasks, 0);
    }

    #[test]
    fn retryable_error_notification_requeues_the_task() {
        let mut coord = coordinator();
        let task_id = TaskId::new();
        let mut task = Task::new(task_id.clone(), TaskType::Repair, serde_json::json!({}), serde_json::json!({}), 0);
        task.assign(AgentName::new("worker-a"));
        coord.pending.push_back(task);

        let msg = Message::new(triage_bus::new_message_id(), MessageType::ErrorNotification, "worker-a", "core", 10, serde_json::json!({"taskId": task_id.to_string(), "error": "boom", "retryable": true}));
        coord.handle_message(msg);

        assert_eq!(coord.pending[0].status, TaskStatus::Pending);
        assert_eq!(coord.pending[0].retries, 1);
        assert!(coord.pending[0].assigned_to.is_none());
    }

    #[test]
    fn health_check_marks_stale_agent_unresponsive() {
        let mut coord = coordinator();
        register(&mut coord, "worker-a", &[TaskType::Repair], 1);
        mark_running(&mut coord, "worker-a");
        coord.clock.advance(std::time::Duration::from_millis(2_000));

        coord.health_check();

        assert_eq!(coord.agents.get(&AgentName::new("worker-a")).unwrap().status, AgentRecordStatus::Unresponsive);
    }
}
