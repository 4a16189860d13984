// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Request orchestrator.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use messagix_lightspeed::TableStore;
use messagix_proto::graphql::ls_request_operation;
use messagix_proto::{
    Endpoints, LsRequestType, LsRequestVariables, LsSyncVariables, OperationRegistry, QueueName,
    RequestEnvelope, TaskBatch, TaskEncoder, TaskIdCounter, TaskRecord,
};
use serde::Serialize;
use tracing::debug;

use crate::decode::decode_response;
use crate::{CallState, ClientConfig, ClientError, HttpRequest, Session, Transport, TransportError};

/// Executes GraphQL operations and decodes their LightSpeed results.
///
/// Calls are independent and may run concurrently. The only shared mutable
/// state is the task-id counter and the LightSpeed request counter, both
/// atomic.
pub struct Client<T> {
    config: ClientConfig,
    endpoints: Endpoints,
    transport: T,
    registry: Arc<dyn OperationRegistry>,
    session: Arc<dyn Session>,
    tasks: TaskEncoder,
    ls_requests: AtomicU64,
}

impl<T: Transport> Client<T> {
    /// Client with a fresh task-id counter.
    pub fn new(
        config: ClientConfig,
        transport: T,
        registry: Arc<dyn OperationRegistry>,
        session: Arc<dyn Session>,
    ) -> Self {
        Self::with_task_counter(config, transport, registry, session, Arc::default())
    }

    /// Client drawing task ids from `counter`, e.g. one shared with the push
    /// socket of the same session.
    pub fn with_task_counter(
        config: ClientConfig,
        transport: T,
        registry: Arc<dyn OperationRegistry>,
        session: Arc<dyn Session>,
        counter: Arc<TaskIdCounter>,
    ) -> Self {
        Self {
            endpoints: config.endpoints(),
            config,
            transport,
            registry,
            session,
            tasks: TaskEncoder::new(counter),
            ls_requests: AtomicU64::new(0),
        }
    }

    /// Settings this client was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Task encoder bound to this session's id counter.
    pub fn task_encoder(&self) -> &TaskEncoder {
        &self.tasks
    }

    /// Run `operation` with `variables` and decode the result.
    pub async fn execute<V>(&self, operation: &str, variables: &V) -> Result<TableStore, ClientError>
    where
        V: Serialize + ?Sized + Sync,
    {
        let result = self.execute_inner(operation, variables).await;
        let state = match &result {
            Ok(_) => CallState::Decoded,
            Err(err) => err.terminal_state(),
        };
        debug!(operation, ?state, "graphql call finished");
        result
    }

    async fn execute_inner<V>(&self, operation: &str, variables: &V) -> Result<TableStore, ClientError>
    where
        V: Serialize + ?Sized + Sync,
    {
        let op = self
            .registry
            .operation(operation)
            .ok_or_else(|| ClientError::UnknownOperation(operation.to_owned()))?;
        let variables =
            serde_json::to_string(variables).map_err(|e| ClientError::Encode(e.to_string()))?;

        let envelope = RequestEnvelope::build(
            op,
            variables,
            &self.endpoints,
            self.session.form_fields(),
            self.session.headers(),
        );
        let body = envelope
            .encode_body()
            .map_err(|e| ClientError::Encode(e.to_string()))?;
        debug!(operation, state = ?CallState::Built, url = %envelope.url, "graphql call");

        let request = HttpRequest {
            url: envelope.url,
            headers: envelope.headers,
            body,
        };
        debug!(operation, state = ?CallState::Sent, "graphql call");
        let response = self.transport.post(request).await?;
        self.session.absorb_response_headers(&response.headers);
        if !response.is_success() {
            return Err(TransportError::Status(response.status).into());
        }
        debug!(
            operation,
            state = ?CallState::Received,
            len = response.body.len(),
            "graphql call"
        );

        decode_response(
            self.config.platform.envelope_shape(),
            &response.body,
            self.config.dump_limit,
        )
    }

    /// Wrap `variables` in a LightSpeed request of `request_type` and run it
    /// with the platform's LightSpeed operation.
    pub async fn ls_request<V>(
        &self,
        variables: &V,
        request_type: LsRequestType,
    ) -> Result<TableStore, ClientError>
    where
        V: Serialize + ?Sized + Sync,
    {
        let request_payload =
            serde_json::to_string(variables).map_err(|e| ClientError::Encode(e.to_string()))?;
        let wrapped = LsRequestVariables {
            device_id: self.config.device_id.clone(),
            include_chat_visibility: false,
            request_id: self.ls_requests.fetch_add(1, Ordering::Relaxed),
            request_payload,
            request_type,
        };
        self.execute(ls_request_operation(self.config.platform), &wrapped)
            .await
    }

    /// Database sync request.
    pub async fn sync(&self, variables: &LsSyncVariables) -> Result<TableStore, ClientError> {
        self.ls_request(variables, LsRequestType::Sync).await
    }

    /// Encode one task against this session's counter.
    pub fn create_task<P: Serialize + ?Sized>(
        &self,
        label: &str,
        payload: &P,
        queue_name: QueueName,
    ) -> Result<TaskRecord, ClientError> {
        Ok(self.tasks.create_task(label, payload, queue_name)?)
    }

    /// Send `tasks` as one batch and decode the server's answer.
    pub async fn execute_tasks(&self, tasks: Vec<TaskRecord>) -> Result<TableStore, ClientError> {
        let batch = TaskBatch::new(tasks, self.config.version_id.clone());
        self.ls_request(&batch, LsRequestType::Task).await
    }
}

impl<T> std::fmt::Debug for Client<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("platform", &self.config.platform)
            .field("endpoints", &self.endpoints)
            .field("next_task_id", &self.tasks.counter().peek())
            .field("ls_requests", &self.ls_requests.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}
