// SPDX-FileCopyrightText: Copyright © 2024-2026 Naptha Node Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Exercises the ledger against a real Postgres instance. Requires
//! `TEST_DATABASE_URL`; skipped (not merely ignored) when it is unset so a
//! plain `cargo test` run doesn't fail in environments without a database.

use node_ledger::Ledger;
use node_types::{Consumer, Deployment, Module, ModuleKind, ModuleSource, Run, RunKind, RunStatus};
use serde_json::json;

fn sample_module() -> Module {
    Module {
        id: "hello".into(),
        name: "hello".to_owned().into(),
        description: "says hello".into(),
        author: "naptha".into(),
        source: ModuleSource::Git {
            url: "https://example.com/hello.git".parse().unwrap(),
        },
        version: "v0.1".into(),
        entrypoint: "run".into(),
        kind: ModuleKind::Agent,
    }
}

#[tokio::test]
async fn create_then_read_your_write_roundtrips() {
    let Ok(database_url) = std::env::var("TEST_DATABASE_URL") else {
        eprintln!("skipping: TEST_DATABASE_URL not set");
        return;
    };

    let ledger = Ledger::connect(&database_url).await.expect("connect");

    let consumer = ledger
        .consumers
        .create(&Consumer::new("test-pubkey".into()))
        .await
        .expect("create consumer");

    let deployment = Deployment::new(sample_module(), json!({"persona": null}));
    let mut run = Run::new(consumer.id.clone(), RunKind::Agent, deployment, json!({"name": "Ada"}));
    run.status = RunStatus::Pending;

    let created = ledger.runs.create(RunKind::Agent, &run).await.expect("create run");
    assert!(!created.id.is_empty());

    let fetched = ledger.runs.get(RunKind::Agent, &created.id).await.expect("read own write");
    assert_eq!(fetched.status, RunStatus::Pending);
    assert_eq!(fetched.consumer_id, consumer.id);

    let mut completed = fetched.clone();
    completed.status = RunStatus::Completed;
    completed.results = vec!["Hello, Ada!".to_owned()];
    let updated = ledger.runs.update(RunKind::Agent, &completed.id, &completed).await.expect("update");
    assert!(updated);

    let deleted = ledger.runs.delete(RunKind::Agent, &created.id).await.expect("delete");
    assert!(deleted);
}
