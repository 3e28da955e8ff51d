use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use async_trait::async_trait;
use tokio::{net::UdpSocket, time::sleep};

use super::{Command, Transport, TransportError};

/// Emits pulses as raw datagrams towards an IR/RF bridge on the network.
pub struct UdpBlaster {
    addr: SocketAddr,
    socket: UdpSocket,
}

impl UdpBlaster {
    pub async fn bind(ip: IpAddr, port: u16) -> Result<Self, TransportError> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await?;
        let addr = SocketAddr::new(ip, port);

        Ok(UdpBlaster { addr, socket })
    }
}

#[async_trait]
impl Transport for UdpBlaster {
    async fn dispatch(&self, commands: &[Command]) -> Result<(), TransportError> {
        tracing::debug!(target = %self.addr, count = commands.len(), "dispatching pulse commands");

        for (index, command) in commands.iter().enumerate() {
            for repeat in 0..command.repeat {
                if repeat > 0 {
                    sleep(command.interval).await;
                }

                self.socket.send_to(command.code.as_bytes(), self.addr).await?;
            }

            if index + 1 < commands.len() {
                sleep(command.pause).await;
            }
        }

        Ok(())
    }
}
