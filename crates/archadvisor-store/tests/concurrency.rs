use std::time::Duration;

use archadvisor_store::{RunStore, StoreConfig, StoreError};
use archadvisor_types::{Agent, AgentMessage, Run, RunId, RunPatch, RunRequest, RunStatus};

const REQUIREMENTS: &str =
    "A payment gateway that settles card transactions for small merchants across Europe.";

fn new_run(id: &str) -> Run {
    Run::new(RunId::from(id), RunRequest::new(REQUIREMENTS))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_patches_are_not_lost() {
    let store = RunStore::default();
    let id = RunId::from("arch_c0ncu44e");
    store.create(new_run(id.as_str())).await.unwrap();

    let mut tasks = Vec::new();
    for n in 0..64 {
        let store = store.clone();
        let id = id.clone();
        tasks.push(tokio::spawn(async move {
            let message = AgentMessage::new(Agent::Architect, format!("write {n}")).with_cost(0.01);
            store.append_message(&id, message).await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let run = store.get(&id).await.unwrap();
    assert_eq!(run.messages.len(), 64);
    assert!((run.total_cost_usd - 0.64).abs() < 1e-9);
}

#[tokio::test]
async fn test_runs_are_isolated() {
    let store = RunStore::default();
    let a = RunId::from("arch_aaaaaaaa");
    let b = RunId::from("arch_bbbbbbbb");
    store.create(new_run(a.as_str())).await.unwrap();
    store.create(new_run(b.as_str())).await.unwrap();

    store
        .update(&a, RunPatch::new().with_status(RunStatus::Cancelled))
        .await
        .unwrap();

    assert_eq!(store.get(&a).await.unwrap().status, RunStatus::Cancelled);
    assert_eq!(store.get(&b).await.unwrap().status, RunStatus::Initializing);
}

#[tokio::test]
async fn test_ttl_runs_from_last_write() {
    let store = RunStore::new(StoreConfig::new().with_ttl(Duration::from_millis(60)));
    let id = RunId::from("arch_77777777");
    store.create(new_run(id.as_str())).await.unwrap();

    tokio::time::sleep(Duration::from_millis(40)).await;
    store
        .update(&id, RunPatch::new().with_status(RunStatus::Designing))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(40)).await;
    assert!(store.get(&id).await.is_ok());

    tokio::time::sleep(Duration::from_millis(80)).await;
    assert!(matches!(store.get(&id).await, Err(StoreError::NotFound(_))));
}

#[tokio::test]
async fn test_sweeper_removes_expired_runs() {
    let store = RunStore::new(
        StoreConfig::new()
            .with_ttl(Duration::from_millis(10))
            .with_cleanup_interval(Duration::from_millis(20)),
    );
    store.create(new_run("arch_5eeee5e5")).await.unwrap();
    let sweeper = store.spawn_sweeper();

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(store.is_empty().await);
    sweeper.abort();
}
