//! Enrollment example over a TCP serial bridge
//!
//! Expects the module's UART behind a ser2net-style bridge. Point
//! SENSOR_ADDR at the bridge and pick a free slot with SLOT.

use tokio::net::TcpStream;
use zfm::{Engine, Event};
use zfm_transport::{IoRx, IoTx};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let addr = std::env::var("SENSOR_ADDR").unwrap_or_else(|_| "192.168.4.1:3333".to_string());
    let location: u16 = std::env::var("SLOT")
        .unwrap_or_else(|_| "1".to_string())
        .parse()?;

    println!("Connecting to {}...", addr);
    let stream = TcpStream::connect(&addr).await?;
    let (read_half, write_half) = stream.into_split();

    let engine = Engine::new(IoTx::new(write_half), IoRx::new(read_half));
    engine.register_handler(|event: &Event| println!("  {}", event));

    // Sanity checks before touching the library
    engine.verify_password(zfm::DEFAULT_PASSWORD).await?;
    let params = engine.read_system_parameters().await?;
    println!(
        "✓ Module ready: {} slots, {} templates stored",
        params.library_size,
        engine.template_count().await?
    );

    println!("Place your finger on the sensor...");
    engine.enroll(location).await?;
    println!("✓ Enrolled at slot {}", location);

    match engine.verify().await {
        Ok(found) => println!("✓ Verified: slot {} (score {})", found.page_id, found.score),
        Err(e) => println!("Verification failed: {}", e),
    }

    Ok(())
}
