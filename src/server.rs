//! UDP command listener: the dispatch path.
//!
//! One datagram is one command. Each is decoded and handed to the
//! [`Supervisor`] on this same task, so command N+1 is not looked at until
//! command N has fully taken over the outputs. Bad datagrams are logged and
//! dropped; whatever was running keeps running.
//!
//! ## Usage
//! ```sh
//! echo -n "fade,2.5,FF0000,00FF00,0000FF" | nc -u -w0 127.0.0.1 5807
//! ```

use crate::command;
use crate::pwm::PwmSink;
use crate::supervisor::{Supervisor, SupervisorError};
use std::future::Future;
use std::net::SocketAddr;
use tokio::net::UdpSocket;

/// Receive buffer size. Commands are far smaller; longer datagrams are
/// truncated by the OS.
pub const MAX_DATAGRAM: usize = 1024;

/// Receive and apply commands until `shutdown` resolves.
///
/// On shutdown the running pattern is stopped, the outputs are switched off
/// and the sink is returned. Errors only when the supervisor has lost the
/// sink, which leaves nothing useful to do.
pub async fn serve<S, F>(
    socket: UdpSocket,
    mut supervisor: Supervisor<S>,
    shutdown: F,
) -> Result<S, SupervisorError>
where
    S: PwmSink,
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let mut buf = [0u8; MAX_DATAGRAM];

    loop {
        let (len, peer) = tokio::select! {
            biased;
            _ = &mut shutdown => break,
            received = socket.recv_from(&mut buf) => match received {
                Ok(received) => received,
                Err(e) => {
                    tracing::warn!("UDP receive error: {}", e);
                    continue;
                }
            },
        };

        handle_datagram(&mut supervisor, &buf[..len], peer).await?;
    }

    tracing::info!("Shutting down, switching outputs off");
    supervisor.shutdown().await
}

async fn handle_datagram<S: PwmSink>(
    supervisor: &mut Supervisor<S>,
    payload: &[u8],
    peer: SocketAddr,
) -> Result<(), SupervisorError> {
    match command::decode(payload) {
        Ok(command) => {
            tracing::info!("{} from {}", command, peer);
            supervisor.dispatch(command).await
        }
        Err(e) => {
            tracing::warn!(
                "Rejected {:?} from {}: {}",
                String::from_utf8_lossy(payload),
                peer,
                e
            );
            Ok(())
        }
    }
}
