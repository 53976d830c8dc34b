//! Disposal lifecycle tests.
//!
//! Covers the forward-only `Active -> Disposing -> Disposed` guard:
//! - Idempotent disposal (awaited, synchronous, and on drop)
//! - Fail-fast operations once disposal began, including retained
//!   `Methods` handles
//! - Teardown errors swallowed
//! - Teardown waiting for an in-flight connect

use std::{io, time::Duration};

use mtlink_client::{
    Client, ClientAppInfo, ClientError, ClientTransportState, LifecycleState,
    TransportConnectResult,
};
use mtlink_harness::{Call, Reply, ScriptedConnection};
use mtlink_proto::{Request, Response};

fn app_info() -> ClientAppInfo {
    ClientAppInfo::new(12345, "1.0", "TestDevice", "en", "1").expect("valid app info")
}

#[tokio::test]
async fn shutdown_twice_is_a_no_op() {
    let connection = ScriptedConnection::new();
    let calls = connection.calls();
    let client = Client::from_connection(connection, app_info());
    client.connect().await.unwrap();

    client.shutdown().await;
    assert_eq!(client.lifecycle_state(), LifecycleState::Disposed);

    client.shutdown().await;
    assert_eq!(client.lifecycle_state(), LifecycleState::Disposed);

    // Teardown ran exactly once
    assert_eq!(calls.disconnects(), 1);
    assert_eq!(calls.closes(), 1);
}

#[tokio::test]
async fn dispose_then_dispose_again_is_a_no_op() {
    let connection = ScriptedConnection::new();
    let calls = connection.calls();
    let client = Client::from_connection(connection, app_info());

    client.dispose();
    client.dispose();
    client.wait_disposed().await;
    client.dispose();

    assert_eq!(client.lifecycle_state(), LifecycleState::Disposed);
    assert_eq!(calls.disconnects(), 1);
    assert_eq!(calls.closes(), 1);
}

#[tokio::test]
async fn operations_fail_fast_after_disposal() {
    let connection = ScriptedConnection::new();
    let calls = connection.calls();
    let client = Client::from_connection(connection, app_info());
    client.shutdown().await;
    let calls_after_teardown = calls.len();

    assert!(matches!(client.connect().await, Err(ClientError::Disposed)));
    assert!(matches!(client.disconnect().await, Err(ClientError::Disposed)));
    assert!(matches!(client.initialize_connection().await, Err(ClientError::Disposed)));
    assert!(matches!(client.is_connected(), Err(ClientError::Disposed)));
    assert!(matches!(client.state(), Err(ClientError::Disposed)));
    assert!(matches!(client.state_changes(), Err(ClientError::Disposed)));
    assert!(matches!(client.config(), Err(ClientError::Disposed)));
    assert!(matches!(client.methods(), Err(ClientError::Disposed)));
    assert!(matches!(client.default_response_timeout(), Err(ClientError::Disposed)));
    assert!(matches!(
        client.set_default_response_timeout(Duration::from_secs(1)),
        Err(ClientError::Disposed)
    ));
    assert!(matches!(client.connect_timeout(), Err(ClientError::Disposed)));
    assert!(matches!(
        client.set_connect_timeout(Duration::from_secs(1)),
        Err(ClientError::Disposed)
    ));

    // No transport call made by any of the above
    assert_eq!(calls.len(), calls_after_teardown);
}

#[tokio::test]
async fn retained_methods_fail_after_shutdown() {
    let connection = ScriptedConnection::new();
    let calls = connection.calls();
    let client = Client::from_connection(connection, app_info());
    client.connect().await.unwrap();
    let methods = client.methods().unwrap();

    client.shutdown().await;
    let calls_after_teardown = calls.len();

    assert!(matches!(methods.get_config().await, Err(ClientError::Disposed)));
    assert!(matches!(methods.clone().invoke(Request::GetConfig).await, Err(ClientError::Disposed)));
    assert_eq!(calls.len(), calls_after_teardown);
}

#[tokio::test]
async fn disposed_error_has_fixed_message() {
    let client = Client::from_connection(ScriptedConnection::new(), app_info());
    client.shutdown().await;

    let err = client.connect().await.unwrap_err();
    assert!(err.is_disposed());
    assert_eq!(err.to_string(), "client was disposed");
}

#[tokio::test]
async fn operations_fail_while_disposing() {
    let connection = ScriptedConnection::new();
    let client = Client::from_connection(connection, app_info());

    client.dispose();

    // Teardown task has not run yet on this single-threaded runtime
    assert_eq!(client.lifecycle_state(), LifecycleState::Disposing);
    assert!(matches!(client.connect().await, Err(ClientError::Disposed)));

    client.wait_disposed().await;
    assert_eq!(client.lifecycle_state(), LifecycleState::Disposed);
}

#[tokio::test]
async fn shutdown_swallows_disconnect_failure() {
    let connection = ScriptedConnection::new().with_failing_disconnect();
    let calls = connection.calls();
    let client = Client::from_connection(connection, app_info());
    client.connect().await.unwrap();

    client.shutdown().await;

    assert_eq!(client.lifecycle_state(), LifecycleState::Disposed);
    assert_eq!(calls.disconnects(), 1);
    // Released even though the disconnect failed
    assert_eq!(calls.closes(), 1);
}

#[tokio::test]
async fn dispose_swallows_disconnect_failure() {
    let connection = ScriptedConnection::new().with_failing_disconnect();
    let calls = connection.calls();
    let client = Client::from_connection(connection, app_info());

    client.dispose();
    client.wait_disposed().await;

    assert_eq!(client.lifecycle_state(), LifecycleState::Disposed);
    assert_eq!(calls.closes(), 1);
}

#[tokio::test]
async fn teardown_disconnects_before_release() {
    let connection = ScriptedConnection::new();
    let calls = connection.calls();
    let client = Client::from_connection(connection, app_info());
    client.connect().await.unwrap();

    client.shutdown().await;

    let tail: Vec<Call> = calls.snapshot().into_iter().rev().take(2).rev().collect();
    assert_eq!(tail, vec![Call::Disconnect, Call::Close]);
}

#[tokio::test]
async fn shutdown_clears_cached_config() {
    let client = Client::from_connection(ScriptedConnection::new(), app_info());
    client.connect().await.unwrap();
    assert!(client.config().unwrap().is_some());

    client.shutdown().await;

    // Config is unreachable and the guard reports why
    assert!(matches!(client.config(), Err(ClientError::Disposed)));
}

#[tokio::test]
async fn drop_schedules_teardown() {
    let connection = ScriptedConnection::new();
    let calls = connection.calls();
    let client = Client::from_connection(connection, app_info());
    client.connect().await.unwrap();

    drop(client);

    // Let the detached teardown run
    for _ in 0..10 {
        if calls.closes() == 1 {
            break;
        }
        tokio::task::yield_now().await;
    }
    assert_eq!(calls.disconnects(), 1);
    assert_eq!(calls.closes(), 1);
}

#[test]
fn drop_without_runtime_still_releases() {
    let connection = ScriptedConnection::new();
    let calls = connection.calls();
    let client = Client::from_connection(connection, app_info());

    client.dispose();

    assert_eq!(client.lifecycle_state(), LifecycleState::Disposed);
    assert_eq!(calls.disconnects(), 0);
    assert_eq!(calls.closes(), 1);
}

#[tokio::test(start_paused = true)]
async fn teardown_waits_for_in_flight_connect() {
    let connection = ScriptedConnection::new()
        .with_reply(Reply::Delayed(Duration::from_secs(2), Response::Bool(true)));
    let calls = connection.calls();
    let client = std::sync::Arc::new(Client::from_connection(connection, app_info()));

    let connecting = {
        let client = client.clone();
        tokio::spawn(async move { client.connect().await })
    };
    // Let connect reach the handshake
    tokio::time::sleep(Duration::from_millis(10)).await;

    client.shutdown().await;

    // The in-flight connect finished (with its handshake error) before teardown
    let result = connecting.await.unwrap();
    assert!(matches!(result, Err(ClientError::HandshakeProtocol { got: "bool" })));
    let snapshot = calls.snapshot();
    let invoke_at = snapshot.iter().position(|c| matches!(c, Call::Invoke { .. })).unwrap();
    let disconnect_at = snapshot.iter().position(|c| *c == Call::Disconnect).unwrap();
    assert!(invoke_at < disconnect_at);
    assert_eq!(client.lifecycle_state(), LifecycleState::Disposed);
}

#[tokio::test(start_paused = true)]
async fn queued_connect_fails_once_disposal_began() {
    let connection = ScriptedConnection::new().with_connect_delay(Duration::from_secs(1));
    let calls = connection.calls();
    let client = std::sync::Arc::new(Client::from_connection(connection, app_info()));

    // First connect holds the transition lock for a second
    let first = {
        let client = client.clone();
        tokio::spawn(async move { client.connect().await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;

    // A disconnect queues behind it
    let second = {
        let client = client.clone();
        tokio::spawn(async move { client.disconnect().await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;

    client.dispose();

    assert!(matches!(first.await.unwrap(), Ok(TransportConnectResult::Success)));
    assert!(matches!(second.await.unwrap(), Err(ClientError::Disposed)));
    client.wait_disposed().await;

    // Only teardown disconnected
    assert_eq!(calls.disconnects(), 1);
}

#[tokio::test]
async fn connect_error_leaves_client_usable() {
    let connection = ScriptedConnection::new().with_connect_error(io::ErrorKind::ConnectionReset);
    let client = Client::from_connection(connection, app_info());

    let result = client.connect().await;

    assert!(matches!(result, Err(ClientError::Transport(_))));
    assert_eq!(client.lifecycle_state(), LifecycleState::Active);
    assert_eq!(client.state().unwrap(), ClientTransportState::Disconnected);
}
