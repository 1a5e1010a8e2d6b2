use std::env;
use std::net::ToSocketAddrs;
use std::sync::Arc;

use bytes::Bytes;
use cqlsession::transport::connection::LoopbackConnection;
use cqlsession::transport::connection_factory::ConnectionFactory;
use cqlsession::transport::load_balancing::RoundRobinPolicy;
use cqlsession::transport::reconnection_policy::ExponentialReconnectionPolicy;
use cqlsession::transport::retry_policy::AlwaysRetry;
use cqlsession::{HostId, QueryParams, SessionBuilder};
use futures::future::FutureExt;

/// Stands in for a real connection subsystem: every dispatch succeeds and
/// echoes its frame back. Wire this up to actual TCP/TLS connections and a
/// CQL codec to talk to a live cluster; this crate only owns what happens
/// once bytes are ready to write.
fn loopback_factory() -> ConnectionFactory {
    Arc::new(|_host| async move { Ok(Arc::new(LoopbackConnection::spawn_echoing())) }.boxed())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let uri = env::var("SCYLLA_URI").unwrap_or_else(|_| "127.0.0.1:9042".to_string());
    let host: HostId = uri
        .to_socket_addrs()?
        .next()
        .ok_or("could not resolve SCYLLA_URI")?
        .into();

    println!("connecting to {} ...", host);

    let session = SessionBuilder::new(loopback_factory())
        .known_node(host)
        .balancer(Arc::new(RoundRobinPolicy::new()))
        .retry_predicate(Arc::new(AlwaysRetry))
        .reconnection_policy(Arc::new(ExponentialReconnectionPolicy::default()))
        .build()
        .await?;

    session
        .execute(
            "CREATE KEYSPACE IF NOT EXISTS ks WITH REPLICATION = {'class': 'SimpleStrategy', 'replication_factor': 1}",
            QueryParams::new(),
        )
        .await?;

    session
        .execute(
            "CREATE TABLE IF NOT EXISTS ks.t (a int, b int, c text, primary key (a, b))",
            QueryParams::new(),
        )
        .await?;

    session
        .execute(
            "INSERT INTO ks.t (a, b, c) VALUES (1, 2, 'abc')",
            QueryParams::new(),
        )
        .await?;

    let prepared = session
        .prepare("INSERT INTO ks.t (a, b, c) VALUES (?, 7, ?)")
        .await?;

    for (a, note) in [(42, "I'm prepared!"), (43, "I'm prepared 2!"), (44, "I'm prepared 3!")] {
        let params = QueryParams::with_values(vec![
            Bytes::copy_from_slice(&(a as i32).to_be_bytes()),
            Bytes::copy_from_slice(note.as_bytes()),
        ])?;
        session.execute(prepared.clone(), params).await?;
    }

    println!("metrics: {:?}", session.metrics());

    session.shutdown().await;
    Ok(())
}
