//! RGB LED daemon
//!
//! Listens for UDP commands and drives a PWM RGB LED fixture on the Pi's
//! GPIO pins. Exactly one behavior is on the LEDs at a time; every command
//! replaces the previous one.
//!
//! ## Usage
//! ```sh
//! sudo ./target/release/rgbled-daemon --red-pin 17 --green-pin 27 --blue-pin 22
//! echo -n "breathe,4,FF8800" | nc -u -w0 127.0.0.1 5807
//! ```

#[cfg(not(feature = "hardware"))]
fn main() {
    eprintln!("This binary requires the 'hardware' feature (rppal).");
    eprintln!("Build with: cargo build --release");
    eprintln!("Tests can run without it: cargo test --no-default-features");
    std::process::exit(1);
}

#[cfg(feature = "hardware")]
fn main() -> anyhow::Result<()> {
    hardware_main()
}

#[cfg(feature = "hardware")]
#[tokio::main(flavor = "current_thread")]
async fn hardware_main() -> anyhow::Result<()> {
    use anyhow::Context;
    use clap::Parser;
    use rgbled_daemon::{Config, GpioPwm, Supervisor, server};
    use tokio::net::UdpSocket;
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_ansi(false) // Disable ANSI color codes for systemd/journald
        .compact()
        .init();

    let config = Config::parse();
    let pins = config.pins()?;

    tracing::info!("RGB LED daemon v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Pins: {}", pins);
    tracing::info!("PWM frequency: {} Hz", config.pwm_frequency);

    let sink = GpioPwm::new(pins, config.pwm_frequency)
        .with_context(|| format!("failed to claim GPIO pins ({pins})"))?;

    let (address, port) = config.listen_addr();
    let socket = UdpSocket::bind((address, port))
        .await
        .with_context(|| format!("failed to bind {address}:{port}"))?;
    tracing::info!("Listening on udp://{}", socket.local_addr()?);

    server::serve(socket, Supervisor::new(sink), shutdown_signal())
        .await
        .inspect_err(|e| tracing::error!("Giving up: {}", e))?;

    tracing::info!("Stopped");
    Ok(())
}

/// Resolve on Ctrl-C or SIGTERM.
#[cfg(feature = "hardware")]
async fn shutdown_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    let ctrl_c = tokio::signal::ctrl_c();
    match signal(SignalKind::terminate()) {
        Ok(mut terminate) => {
            tokio::select! {
                _ = ctrl_c => {}
                _ = terminate.recv() => {}
            }
        }
        Err(e) => {
            tracing::warn!("Cannot listen for SIGTERM: {}", e);
            let _ = ctrl_c.await;
        }
    }
}
