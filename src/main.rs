use serial_mux::config::{Encoding, WaitPolicy};
use serial_mux::{EngineBuilder, SendArgs};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(
            serial_mux::EngineConfig::log_filter(),
        ))
        .init();

    let engine = EngineBuilder::new()
        .with_serial("/dev/ttyUSB0")
        .baud(115_200)
        .build()?;

    let outcome = engine
        .send(SendArgs {
            payload: "AT\r\n".to_string(),
            encoding: Encoding::Utf8,
            wait_policy: WaitPolicy::AtCommand,
            stop_pattern: None,
            timeout_ms: Some(2_000),
        })
        .await?;
    println!("{:?}", outcome);

    let drained = engine.read_async_messages()?;
    for message in drained.messages {
        println!("urc: {}", message.text);
    }

    engine.disconnect().await?;
    Ok(())
}
