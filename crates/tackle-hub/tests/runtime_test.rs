// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::sync::Arc;
use std::time::Duration;

use tackle_api::Codec;
use tackle_hub::cluster::MockCluster;
use tackle_hub::runtime::HubRuntime;
use tackle_hub::scheduler::TaskManagerConfig;
use tackle_hub::store::SqliteStore;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

#[tokio::test]
async fn test_runtime_serves_and_shuts_down() {
    let store = SqliteStore::in_memory(Codec::new("p1")).await.unwrap();
    let runtime = HubRuntime::builder()
        .store(Arc::new(store))
        .cluster(Arc::new(MockCluster::new()))
        .bind_addr("127.0.0.1:0".parse().unwrap())
        .task_manager(TaskManagerConfig {
            tick_interval: Duration::from_millis(20),
            ..Default::default()
        })
        .build()
        .unwrap()
        .start()
        .await
        .unwrap();

    assert!(runtime.is_running());
    assert_ne!(runtime.local_addr().port(), 0);

    let mut stream = TcpStream::connect(runtime.local_addr()).await.unwrap();
    stream
        .write_all(b"GET /tasks HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    assert!(response.starts_with("HTTP/1.1 200"));
    assert!(response.ends_with("[]"));

    runtime.shutdown().await.unwrap();
}

#[test]
fn test_builder_requires_store_and_cluster() {
    assert!(HubRuntime::builder().build().is_err());
    assert!(
        HubRuntime::builder()
            .cluster(Arc::new(MockCluster::new()))
            .build()
            .is_err()
    );
}
