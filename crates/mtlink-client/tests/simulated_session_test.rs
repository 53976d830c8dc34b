//! End-to-end session tests over the simulated network.
//!
//! Runs the real client against a turmoil-hosted server that rejects any
//! call made before the layer/init handshake.

use std::time::Duration;

use mtlink_client::{
    Client, ClientAppInfo, ClientError, ClientTransportState, ConnectionConfig, LifecycleState,
    Phase, TransportConfig, TransportConnectResult,
};
use mtlink_harness::{SimConnection, SimConnectionBuilder, SimServer};
use mtlink_proto::{LAYER, Request};

fn app_info() -> ClientAppInfo {
    ClientAppInfo::new(12345, "1.0", "TestDevice", "en", "1").expect("valid app info")
}

/// Helper to convert any error to Box<dyn Error>
fn to_box_err<E: std::error::Error + 'static>(e: E) -> Box<dyn std::error::Error> {
    Box::new(e)
}

fn host_server(sim: &mut turmoil::Sim<'_>, server: &SimServer) {
    let server = server.clone();
    sim.host("server", move || {
        let server = server.clone();
        async move { server.serve("0.0.0.0:443").await }
    });
}

#[test]
fn connect_declares_layer_first_and_caches_config() {
    let mut sim = turmoil::Builder::new().build();
    let server = SimServer::with_seed(42);
    host_server(&mut sim, &server);

    let observed = server.clone();
    sim.client("client", async move {
        let client = Client::new::<SimConnectionBuilder>(
            &TransportConfig::new("server", 443),
            &ConnectionConfig::default(),
            app_info(),
        )
        .map_err(to_box_err)?;

        let result = client.connect().await.map_err(to_box_err)?;
        assert_eq!(result, TransportConnectResult::Success);
        assert_eq!(client.state().map_err(to_box_err)?, ClientTransportState::Connected);
        assert_eq!(client.config().map_err(to_box_err)?.as_ref(), Some(observed.config()));

        // Already connected: no second handshake reaches the server
        client.connect().await.map_err(to_box_err)?;
        let received = observed.received();
        assert_eq!(received.len(), 1);
        assert!(matches!(received[0], Request::InvokeWithLayer { layer: LAYER, .. }));
        assert_eq!(received[0].innermost(), &Request::GetConfig);

        client.shutdown().await;
        assert_eq!(client.lifecycle_state(), LifecycleState::Disposed);
        Ok(())
    });

    sim.run().expect("session should complete");
}

#[test]
fn methods_work_after_handshake() {
    let mut sim = turmoil::Builder::new().build();
    let server = SimServer::default();
    host_server(&mut sim, &server);

    sim.client("client", async move {
        let client = Client::from_connection(SimConnection::new("server:443"), app_info());
        client.connect().await.map_err(to_box_err)?;

        // Server only answers plain calls once the connection was initialized
        let methods = client.methods().map_err(to_box_err)?;
        let config = methods.get_config().await.map_err(to_box_err)?;
        assert_eq!(Some(config), client.config().map_err(to_box_err)?);

        client.disconnect().await.map_err(to_box_err)?;
        Ok(())
    });

    sim.run().expect("calls after handshake should succeed");
}

#[test]
fn reconnect_repeats_handshake_on_new_connection() {
    let mut sim = turmoil::Builder::new().build();
    let server = SimServer::default();
    host_server(&mut sim, &server);

    let observed = server.clone();
    sim.client("client", async move {
        let client = Client::from_connection(SimConnection::new("server:443"), app_info());

        client.connect().await.map_err(to_box_err)?;
        client.disconnect().await.map_err(to_box_err)?;
        assert!(!client.is_connected().map_err(to_box_err)?);

        client.connect().await.map_err(to_box_err)?;
        assert!(client.is_connected().map_err(to_box_err)?);

        // Give the server a moment to register the second accept
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(observed.accepted(), 2);
        assert_eq!(observed.received().len(), 2);
        Ok(())
    });

    sim.run().expect("reconnect should complete");
}

#[test]
fn unreachable_server_returns_failed_without_handshake() {
    let mut sim = turmoil::Builder::new().build();
    // Host exists but nothing listens on the port
    sim.host("server", || async { std::future::pending::<turmoil::Result>().await });

    sim.client("client", async move {
        let client = Client::from_connection(SimConnection::new("server:443"), app_info());

        let result = client.connect().await.map_err(to_box_err)?;

        assert_eq!(result, TransportConnectResult::Failed);
        assert_eq!(client.config().map_err(to_box_err)?, None);
        assert!(matches!(client.methods(), Err(ClientError::HandshakeRequired)));
        Ok(())
    });

    sim.run().expect("refused connect should be reported, not raised");
}

#[test]
fn handshake_times_out_when_link_is_held() {
    let mut sim = turmoil::Builder::new().simulation_duration(Duration::from_secs(120)).build();
    let server = SimServer::default();
    host_server(&mut sim, &server);

    sim.client("client", async move {
        let client = Client::from_connection(SimConnection::new("server:443"), app_info());
        client.set_default_response_timeout(Duration::from_secs(5)).map_err(to_box_err)?;
        client.connect().await.map_err(to_box_err)?;
        assert!(client.config().map_err(to_box_err)?.is_some());

        // Nothing crosses the link while held, so the repeated handshake never hears back
        turmoil::hold("client", "server");
        let result = client.initialize_connection().await;
        turmoil::release("client", "server");

        assert!(
            matches!(
                result,
                Err(ClientError::Timeout { phase: Phase::Handshake, after })
                    if after == Duration::from_secs(5)
            ),
            "expected a handshake timeout, got {result:?}"
        );
        assert_eq!(client.config().map_err(to_box_err)?, None);
        assert_eq!(client.lifecycle_state(), LifecycleState::Active);
        Ok(())
    });

    sim.run().expect("held handshake should time out");
}
