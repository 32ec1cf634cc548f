// SPDX-FileCopyrightText: Copyright © 2024-2026 Naptha Node Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Accepts run requests from any transport and hands them to a bounded
//! pool of workers, one [`Engine`] invocation per run. Generalizes
//! `moss/src/runtime.rs`'s process-wide-runtime-plus-`spawn_blocking`
//! idiom (built for a single CLI invocation) into a genuine multi-worker
//! pool, and replaces `original_source/node/worker/package_worker.py`'s
//! Celery task wrappers with plain `tokio` tasks.

use std::collections::HashMap;
use std::sync::Arc;

use node_engine::Engine;
use node_ledger::Ledger;
use node_types::{Deployment, Run, RunKind};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;

struct DispatchRequest {
    run: Run,
    default_config: Value,
    blanked_env_vars: Vec<String>,
    user_env_data: HashMap<String, String>,
}

/// A bounded FIFO pool of run workers.
pub struct Dispatcher {
    sender: mpsc::Sender<DispatchRequest>,
    ledger: Arc<Ledger>,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("ledger error creating run: {0}")]
    Ledger(#[from] node_ledger::Error),
    #[error("dispatcher queue is closed")]
    QueueClosed,
}

impl Dispatcher {
    /// Spawns `worker_count` worker tasks draining a channel of capacity
    /// `queue_capacity`; callers observe backpressure as `dispatch`
    /// resolving more slowly once the queue is full, not as an error.
    pub fn start(engine: Arc<Engine>, ledger: Arc<Ledger>, worker_count: usize, queue_capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(queue_capacity);
        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));

        for worker_id in 0..worker_count.max(1) {
            let engine = Arc::clone(&engine);
            let receiver = Arc::clone(&receiver);
            tokio::spawn(async move {
                loop {
                    let request = {
                        let mut receiver = receiver.lock().await;
                        receiver.recv().await
                    };
                    let Some(request) = request else {
                        log::debug!("worker {worker_id} shutting down: queue closed");
                        break;
                    };

                    let run = engine
                        .run(request.run, request.default_config, &request.blanked_env_vars, request.user_env_data)
                        .await;
                    log::info!("worker {worker_id} finished run {} with status {:?}", run.id, run.status);
                }
            });
        }

        Self { sender, ledger }
    }

    /// Creates a `pending` run row and enqueues it for a worker. Returns
    /// as soon as the row is persisted; callers observe subsequent
    /// lifecycle transitions by polling the ledger.
    pub async fn dispatch(
        &self,
        consumer_id: String,
        kind: RunKind,
        deployment: Deployment,
        inputs: Value,
        default_config: Value,
        blanked_env_vars: Vec<String>,
        user_env_data: HashMap<String, String>,
    ) -> Result<Run, Error> {
        let run = Run::new(consumer_id, kind, deployment, inputs);
        let created = self.ledger.runs.create(kind, &run).await?;

        self.sender
            .send(DispatchRequest {
                run: created.clone(),
                default_config,
                blanked_env_vars,
                user_env_data,
            })
            .await
            .map_err(|_| Error::QueueClosed)?;

        Ok(created)
    }
}
