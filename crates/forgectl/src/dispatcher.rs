//! Command dispatcher.
//!
//! Runs one command's full lifecycle: send, await the reply, classify,
//! retry with backoff or return. Keeps a bounded execution history and the
//! set of in-flight request ids. One dispatcher per connection; commands
//! run strictly one at a time.

use chrono::{DateTime, Utc};
use forge_common::perf::{AnalysisResult, PerfReport, PerformanceAnalyzer};
use forge_common::protocol::{Command, Response, Status};
use forge_common::retry::{RetryEngine, RetryInfo};
use forge_common::Config;
use std::collections::{HashMap, VecDeque};
use tokio::time::sleep;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Remote error categories worth another attempt; everything else is
/// terminal on first sight.
const RETRYABLE_ERROR_TYPES: [&str; 2] = ["compile", "runtime"];

/// Terminal outcomes retained, oldest evicted first.
const COMMAND_HISTORY_CAP: usize = 1000;

/// Seam between the dispatcher and the wire.
///
/// The protocol is strictly serialized: implementations hand back whatever
/// reply arrives next, so at most one command may be in flight at a time.
/// `&mut self` keeps that invariant enforced by the borrow checker.
#[allow(async_fn_in_trait)]
pub trait Transport {
    async fn send_command(&mut self, command: &Command) -> Option<Response>;
}

/// One terminal command outcome.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub command: Command,
    pub response: Response,
    pub attempts: u32,
    pub timestamp: DateTime<Utc>,
}

/// Dispatches commands to the editor and handles their responses.
pub struct CommandDispatcher<T: Transport> {
    client: T,
    retry_engine: RetryEngine,
    analyzer: PerformanceAnalyzer,
    pending_commands: HashMap<String, Command>,
    command_history: VecDeque<HistoryEntry>,
}

impl<T: Transport> CommandDispatcher<T> {
    pub fn new(client: T, config: &Config) -> Self {
        Self {
            client,
            retry_engine: RetryEngine::new(config.retry_policy()),
            analyzer: PerformanceAnalyzer::new(),
            pending_commands: HashMap::new(),
            command_history: VecDeque::new(),
        }
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.client
    }

    /// Execute a command with the configured retry policy.
    pub async fn execute_command(&mut self, command: Command) -> Response {
        self.execute_with_limit(command, None).await
    }

    /// Execute a command, optionally overriding the retry cap for this
    /// call only.
    pub async fn execute_with_limit(
        &mut self,
        mut command: Command,
        max_retries: Option<u32>,
    ) -> Response {
        if command.request_id.is_empty() {
            command.request_id = generate_request_id();
        }
        let request_id = command.request_id.clone();
        self.pending_commands.insert(request_id.clone(), command.clone());

        let response = self.run_attempts(&command, max_retries).await;

        // every terminal path funnels through here, so no id lingers
        self.pending_commands.remove(&request_id);
        response
    }

    async fn run_attempts(&mut self, command: &Command, max_retries: Option<u32>) -> Response {
        let request_id = command.request_id.as_str();
        let mut attempts: u32 = 0;

        loop {
            attempts += 1;

            let Some(response) = self.client.send_command(command).await else {
                // communication failure: no reply to classify
                if self.can_retry(request_id, max_retries) {
                    let delay = self.retry_engine.retry_delay(request_id);
                    self.retry_engine
                        .record_attempt(request_id, command, &communication_failure());
                    warn!(
                        "No reply for '{}', retrying in {:?} (attempt {})",
                        command.action, delay, attempts
                    );
                    sleep(delay).await;
                    continue;
                }
                // terminal; deliberately kept out of retry and command history
                return communication_failure();
            };

            let permitted = self.can_retry(request_id, max_retries);
            let delay = self.retry_engine.retry_delay(request_id);
            self.retry_engine.record_attempt(request_id, command, &response);

            if response.is_success() {
                self.log_command(command, &response, attempts);
                self.retry_engine.reset(request_id);
                return response;
            }

            if response.is_error()
                && RETRYABLE_ERROR_TYPES.contains(&response.error_type.as_str())
                && permitted
            {
                info!(
                    "Retrying '{}' after {:?} (attempt {})",
                    command.action, delay, attempts
                );
                sleep(delay).await;
                continue;
            }

            // non-retryable error type, exhausted retries, or unknown status
            self.log_command(command, &response, attempts);
            return response;
        }
    }

    fn can_retry(&self, request_id: &str, max_retries: Option<u32>) -> bool {
        match max_retries {
            Some(limit) => self.retry_engine.attempts(request_id) < limit,
            None => self.retry_engine.should_retry(request_id),
        }
    }

    /// Execute commands one at a time, stopping after the first error.
    /// The remaining commands are never attempted.
    pub async fn execute_batch(&mut self, commands: Vec<Command>) -> Vec<Response> {
        let mut results = Vec::new();
        for command in commands {
            let response = self.execute_command(command).await;
            let failed = response.is_error();
            results.push(response);
            if failed {
                break;
            }
        }
        results
    }

    /// Classify a performance report. Stateless passthrough.
    pub fn analyze_performance(&self, report: &PerfReport) -> AnalysisResult {
        self.analyzer.analyze(report)
    }

    pub fn retry_info(&self, request_id: &str) -> RetryInfo {
        self.retry_engine.retry_info(request_id)
    }

    pub fn history(&self) -> &VecDeque<HistoryEntry> {
        &self.command_history
    }

    pub fn pending_count(&self) -> usize {
        self.pending_commands.len()
    }

    fn log_command(&mut self, command: &Command, response: &Response, attempts: u32) {
        self.command_history.push_back(HistoryEntry {
            command: command.clone(),
            response: response.clone(),
            attempts,
            timestamp: Utc::now(),
        });
        if self.command_history.len() > COMMAND_HISTORY_CAP {
            self.command_history.pop_front();
        }

        if response.is_success() {
            info!(
                "Command '{}' succeeded in {} attempt(s)",
                command.action, attempts
            );
        } else {
            error!("Command '{}' failed: {}", command.action, response.error);
        }
    }
}

fn communication_failure() -> Response {
    Response {
        status: Status::Error,
        error: "Failed to communicate with Godot Editor".to_string(),
        error_type: "communication".to_string(),
        ..Default::default()
    }
}

fn generate_request_id() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("req_{}", &id[..8])
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_common::protocol::CommandKind;
    use std::collections::VecDeque;

    /// Scripted transport: hands out the queued replies in order and
    /// records every send.
    struct FakeTransport {
        replies: VecDeque<Option<Response>>,
        sent: Vec<Command>,
    }

    impl FakeTransport {
        fn new(replies: Vec<Option<Response>>) -> Self {
            Self {
                replies: replies.into(),
                sent: Vec::new(),
            }
        }

        fn always(reply: Option<Response>, times: usize) -> Self {
            Self::new(vec![reply; times])
        }
    }

    impl Transport for FakeTransport {
        async fn send_command(&mut self, command: &Command) -> Option<Response> {
            self.sent.push(command.clone());
            self.replies
                .pop_front()
                .expect("transport script exhausted")
        }
    }

    fn success() -> Response {
        Response {
            status: Status::Success,
            ..Default::default()
        }
    }

    fn remote_error(error_type: &str) -> Response {
        Response {
            status: Status::Error,
            error: format!("{} failure", error_type),
            error_type: error_type.to_string(),
            ..Default::default()
        }
    }

    fn dispatcher(transport: FakeTransport) -> CommandDispatcher<FakeTransport> {
        CommandDispatcher::new(transport, &Config::default())
    }

    #[tokio::test(start_paused = true)]
    async fn success_on_first_attempt() {
        let mut dispatcher = dispatcher(FakeTransport::new(vec![Some(success())]));
        let response = dispatcher
            .execute_command(Command::new(CommandKind::GetStatus))
            .await;

        assert!(response.is_success());
        assert_eq!(dispatcher.transport_mut().sent.len(), 1);
        assert_eq!(dispatcher.history().len(), 1);
        assert_eq!(dispatcher.history()[0].attempts, 1);
        assert_eq!(dispatcher.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn request_id_assigned_once_and_stable_across_retries() {
        let mut dispatcher = dispatcher(FakeTransport::new(vec![
            Some(remote_error("compile")),
            Some(remote_error("compile")),
            Some(success()),
        ]));
        dispatcher
            .execute_command(Command::new(CommandKind::RunScene))
            .await;

        let sent = &dispatcher.transport_mut().sent;
        assert_eq!(sent.len(), 3);
        assert!(sent[0].request_id.starts_with("req_"));
        assert_eq!(sent[0].request_id, sent[1].request_id);
        assert_eq!(sent[1].request_id, sent[2].request_id);
    }

    #[tokio::test(start_paused = true)]
    async fn compile_errors_retry_to_exhaustion() {
        let mut dispatcher = dispatcher(FakeTransport::always(Some(remote_error("compile")), 6));
        let response = dispatcher
            .execute_command(Command::new(CommandKind::RunScene))
            .await;

        // 5 retries after the first attempt, last response returned unchanged
        assert_eq!(dispatcher.transport_mut().sent.len(), 6);
        assert!(response.is_error());
        assert_eq!(response.error_type, "compile");
        assert_eq!(dispatcher.history().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn runtime_errors_are_retryable() {
        let mut dispatcher = dispatcher(FakeTransport::new(vec![
            Some(remote_error("runtime")),
            Some(success()),
        ]));
        let response = dispatcher
            .execute_command(Command::new(CommandKind::RunScene))
            .await;

        assert!(response.is_success());
        assert_eq!(dispatcher.transport_mut().sent.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn non_retryable_error_is_terminal_immediately() {
        let mut dispatcher =
            dispatcher(FakeTransport::new(vec![Some(remote_error("invalid_syntax"))]));
        let response = dispatcher
            .execute_command(Command::new(CommandKind::AddNode))
            .await;

        assert!(response.is_error());
        assert_eq!(response.error_type, "invalid_syntax");
        assert_eq!(dispatcher.transport_mut().sent.len(), 1);
        assert_eq!(dispatcher.history().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn communication_failure_synthesizes_terminal_response() {
        let mut dispatcher = dispatcher(FakeTransport::always(None, 6));
        let response = dispatcher
            .execute_command(Command::new(CommandKind::GetSnapshot))
            .await;

        assert_eq!(dispatcher.transport_mut().sent.len(), 6);
        assert!(response.is_error());
        assert_eq!(response.error_type, "communication");
        assert_eq!(response.error, "Failed to communicate with Godot Editor");
        // terminal communication failures stay out of command history
        assert!(dispatcher.history().is_empty());
        assert_eq!(dispatcher.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn success_resets_retry_state() {
        let mut dispatcher = dispatcher(FakeTransport::new(vec![
            Some(remote_error("compile")),
            Some(success()),
        ]));
        let mut command = Command::new(CommandKind::RunScene);
        command.request_id = "req_fixed".to_string();
        dispatcher.execute_command(command).await;

        let info = dispatcher.retry_info("req_fixed");
        assert_eq!(info.current_attempt, 0);
        assert!(info.can_retry);
    }

    #[tokio::test(start_paused = true)]
    async fn per_call_retry_limit_overrides_policy() {
        let mut dispatcher = dispatcher(FakeTransport::always(Some(remote_error("compile")), 3));
        let response = dispatcher
            .execute_with_limit(Command::new(CommandKind::RunScene), Some(2))
            .await;

        assert_eq!(dispatcher.transport_mut().sent.len(), 3);
        assert!(response.is_error());
    }

    #[tokio::test(start_paused = true)]
    async fn batch_stops_after_first_error() {
        let mut dispatcher = dispatcher(FakeTransport::new(vec![
            Some(success()),
            Some(remote_error("invalid_syntax")),
        ]));
        let results = dispatcher
            .execute_batch(vec![
                Command::new(CommandKind::CreateScene),
                Command::new(CommandKind::AddNode),
                Command::new(CommandKind::RunScene),
            ])
            .await;

        assert_eq!(results.len(), 2);
        assert!(results[0].is_success());
        assert!(results[1].is_error());
        // the third command was never sent
        assert_eq!(dispatcher.transport_mut().sent.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn history_is_bounded() {
        let mut dispatcher = dispatcher(FakeTransport::always(
            Some(success()),
            COMMAND_HISTORY_CAP + 1,
        ));
        for i in 0..(COMMAND_HISTORY_CAP + 1) {
            let mut command = Command::new(CommandKind::GetStatus);
            command.request_id = format!("req_{}", i);
            dispatcher.execute_command(command).await;
        }

        assert_eq!(dispatcher.history().len(), COMMAND_HISTORY_CAP);
        // the oldest entry was evicted
        assert_eq!(dispatcher.history()[0].command.request_id, "req_1");
    }
}
