mod common;

use common::{Event, RecordingTransport, options};
use sql_bridge::prelude::*;

#[tokio::test]
async fn leases_are_reused_without_reconnecting() -> Result<(), Box<dyn std::error::Error>> {
    let transport = RecordingTransport::new();
    let pool = ConnectionPool::with_transport(options(), transport.shared(), 4)?;

    {
        let mut conn = pool.get_connection().await?;
        assert!(!conn.is_closed());
        conn.query("SELECT 1", &[], Fetch::One).await?;
    }
    {
        let mut conn = pool.get_connection().await?;
        conn.query("SELECT 2", &[], Fetch::One).await?;
    }

    assert_eq!(transport.connects(), 1);
    assert_eq!(pool.status().size, 1);
    // nothing closes a pooled connection behind the caller's back
    assert_eq!(transport.count(&Event::Close), 0);
    Ok(())
}

#[tokio::test]
async fn connections_returned_mid_transaction_are_discarded()
-> Result<(), Box<dyn std::error::Error>> {
    let transport = RecordingTransport::new();
    let pool = ConnectionPool::with_transport(options(), transport.shared(), 4)?;

    {
        let mut conn = pool.get_connection().await?;
        conn.begin().await?;
    }

    let conn = pool.get_connection().await?;
    assert_eq!(conn.get_transaction_level(), 0);
    assert_eq!(transport.connects(), 2);
    Ok(())
}

#[tokio::test]
async fn connect_failures_surface_from_the_lease() {
    let transport = RecordingTransport::new();
    transport.refuse_connections("server unreachable");
    let pool = ConnectionPool::with_transport(options(), transport.shared(), 2).unwrap();

    let err = pool.get_connection().await.unwrap_err();
    assert!(matches!(err, SqlBridgeError::ConnectionError(_)));
}

#[tokio::test]
async fn closed_pool_hands_out_nothing() {
    let transport = RecordingTransport::new();
    let pool = ConnectionPool::with_transport(options(), transport.shared(), 2).unwrap();

    pool.close();
    assert!(pool.is_closed());
    let err = pool.get_connection().await.unwrap_err();
    assert!(matches!(err, SqlBridgeError::PoolError(_)));
}

#[tokio::test]
async fn dead_connections_are_replaced_on_the_next_lease() -> Result<(), Box<dyn std::error::Error>>
{
    let transport = RecordingTransport::new();
    let pool = ConnectionPool::with_transport(options(), transport.shared(), 4)?;

    {
        let mut conn = pool.get_connection().await?;
        conn.query("SELECT 1", &[], Fetch::One).await?;
    }
    assert_eq!(transport.connects(), 1);

    // the link dies while the connection sits idle
    transport.fail_on("", "connection reset by peer");
    {
        let conn = pool.get_connection().await?;
        assert!(!conn.is_closed());
    }
    assert_eq!(transport.connects(), 2);

    transport.clear_failures();
    let mut conn = pool.get_connection().await?;
    conn.query("SELECT 2", &[], Fetch::One).await?;
    assert_eq!(transport.connects(), 2);
    assert_eq!(pool.status().size, 1);
    Ok(())
}
