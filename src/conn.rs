// conn.rs - connection lifecycle: codec, reader, writer, liveness
//
// stonechat-ircd - single-server IRC daemon
// Copyright (C) 2024  The stonechat-ircd authors
//
// This library is free software; you can redistribute it and/or
// modify it under the terms of the GNU Lesser General Public
// License as published by the Free Software Foundation; either
// version 2.1 of the License, or (at your option) any later version.
//
// This library is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU
// Lesser General Public License for more details.
//
// You should have received a copy of the GNU Lesser General Public
// License along with this library; if not, write to the Free Software
// Foundation, Inc., 51 Franklin Street, Fifth Floor, Boston, MA  02110-1301  USA

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::{BufMut, BytesMut};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time;
use tokio_util::codec::{Decoder, Encoder, Framed, LinesCodec, LinesCodecError};
use tracing::*;

use crate::client::{Client, OUTBOUND_QUEUE_LEN};
use crate::reply::Reply::*;
use crate::server::Server;

// codec limit; the parser rejects anything over its own limit with 417,
// this only bounds buffering against hostile peers.
const MAX_WIRE_LINE_LEN: usize = 2048;

/// Lines codec which emits CR-LF as the line terminator and accepts
/// LF or CR-LF on input.
pub(crate) struct IrcLinesCodec(LinesCodec);

impl IrcLinesCodec {
    pub(crate) fn new() -> IrcLinesCodec {
        IrcLinesCodec(LinesCodec::new())
    }

    pub(crate) fn new_with_max_length(max_length: usize) -> IrcLinesCodec {
        IrcLinesCodec(LinesCodec::new_with_max_length(max_length))
    }
}

impl<T: AsRef<str>> Encoder<T> for IrcLinesCodec {
    type Error = LinesCodecError;

    fn encode(&mut self, line: T, buf: &mut BytesMut) -> Result<(), LinesCodecError> {
        let line = line.as_ref();
        buf.reserve(line.len() + 2);
        buf.put(line.as_bytes());
        buf.put_u8(b'\r');
        buf.put_u8(b'\n');
        Ok(())
    }
}

impl Decoder for IrcLinesCodec {
    type Item = String;
    type Error = LinesCodecError;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<String>, LinesCodecError> {
        self.0.decode(buf)
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<String>, LinesCodecError> {
        self.0.decode_eof(buf)
    }
}

type Sink = SplitSink<Framed<TcpStream, IrcLinesCodec>, String>;

/// Owns the socket's write half. Normal path forwards the outbound
/// queue; on cancellation it drains what is already queued, sends the
/// final ERROR line and closes the sink. Nothing else writes the socket.
async fn writer_loop(mut sink: Sink, mut receiver: mpsc::Receiver<String>, client: Arc<Client>) {
    loop {
        tokio::select! {
            _ = client.cancelled() => break,
            line = receiver.recv() => match line {
                Some(line) => {
                    if sink.send(line).await.is_err() {
                        client.kill("Write error");
                        break;
                    }
                }
                None => break,
            }
        }
    }
    while let Ok(line) = receiver.try_recv() {
        if sink.send(line).await.is_err() {
            return;
        }
    }
    let reason = client
        .quit_reason()
        .unwrap_or_else(|| "Connection closed".to_string());
    let _ = sink.send(format!("ERROR :Closing link: {}", reason)).await;
    let _ = sink.close().await;
}

/// Pings an idle client every ping_timeout seconds and kills it if no
/// PONG arrives within pong_timeout.
async fn liveness_loop(server: Arc<Server>, client: Arc<Client>) {
    let ping_period = Duration::from_secs(server.config.ping_timeout);
    let pong_timeout = Duration::from_secs(server.config.pong_timeout);
    loop {
        tokio::select! {
            _ = client.cancelled() => return,
            _ = time::sleep(ping_period) => {}
        }
        client.send_line(format!("PING :{}", server.config.name));
        tokio::select! {
            _ = client.cancelled() => return,
            _ = client.pong_notify.notified() => {}
            _ = time::sleep(pong_timeout) => {
                info!("Ping timeout for {}", client.addr);
                client.kill("Ping timeout");
                return;
            }
        }
    }
}

/// One accepted connection, driven until teardown. The calling task is
/// the reader worker; writer and liveness run as spawned siblings, all
/// three stop on the client's cancellation. Teardown runs here, once,
/// after both siblings joined.
pub(crate) async fn peer_session(server: Arc<Server>, stream: TcpStream, addr: SocketAddr) {
    if let Some(max_connections) = server.config.max_connections {
        if server.clients.len() >= max_connections {
            info!("Refusing connection from {}: server full", addr);
            let mut framed = Framed::new(stream, IrcLinesCodec::new());
            let _ = framed.send("ERROR :Too many connections".to_string()).await;
            return;
        }
    }

    let framed = Framed::new(stream, IrcLinesCodec::new_with_max_length(MAX_WIRE_LINE_LEN));
    let (sink, mut lines) = framed.split();
    let (sender, receiver) = mpsc::channel(OUTBOUND_QUEUE_LEN);
    let id = server.clients.alloc_id();
    let client = Arc::new(Client::new(id, addr, sender));
    server.clients.add(client.clone());
    debug!("New connection {} from {}", id, addr);

    let writer = tokio::spawn(writer_loop(sink, receiver, client.clone()));
    let liveness = tokio::spawn(liveness_loop(server.clone(), client.clone()));

    loop {
        tokio::select! {
            _ = client.cancelled() => break,
            item = lines.next() => match item {
                Some(Ok(line)) => server.handle_line(&client, &line).await,
                Some(Err(LinesCodecError::MaxLineLengthExceeded)) => {
                    client.send_msg(&server.config.name, ErrInputTooLong417 {
                        client: &client.display_name(),
                    });
                }
                Some(Err(e)) => {
                    debug!("Read error from {}: {}", addr, e);
                    client.kill("Read error");
                    break;
                }
                None => {
                    client.kill("Connection closed");
                    break;
                }
            }
        }
    }

    client.kill("Connection closed");
    let _ = liveness.await;
    let _ = writer.await;
    server.quit_cleanup(&client);
    debug!("Connection {} from {} closed", id, addr);
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::MainConfig;
    use crate::server::test::*;

    #[test]
    fn test_codec_encode_appends_crlf() {
        let mut codec = IrcLinesCodec::new();
        let mut buf = BytesMut::new();
        codec.encode("PING :abc", &mut buf).unwrap();
        assert_eq!(&b"PING :abc\r\n"[..], &buf[..]);
    }

    #[test]
    fn test_codec_decode_accepts_lf_and_crlf() {
        let mut codec = IrcLinesCodec::new();
        let mut buf = BytesMut::from(&b"NICK alice\r\nUSER a 0 * :A\nPART"[..]);
        assert_eq!(Some("NICK alice".to_string()), codec.decode(&mut buf).unwrap());
        assert_eq!(
            Some("USER a 0 * :A".to_string()),
            codec.decode(&mut buf).unwrap()
        );
        assert_eq!(None, codec.decode(&mut buf).unwrap());
        assert_eq!(Some("PART".to_string()), codec.decode_eof(&mut buf).unwrap());
    }

    #[tokio::test]
    async fn test_ping_timeout_closes_connection() {
        let mut config = MainConfig::default();
        config.ping_timeout = 1;
        config.pong_timeout = 1;
        let (server, handle, port) = run_test_server(config).await;
        let mut conn = TestConn::connect(port).await;
        conn.login("sleepy", "sleepy").await;

        assert_eq!("PING :irc.localhost", conn.recv().await);
        // no PONG sent
        assert_eq!("ERROR :Closing link: Ping timeout", conn.recv().await);
        quit_test_server(server, handle).await;
    }

    #[tokio::test]
    async fn test_pong_keeps_connection_alive() {
        let mut config = MainConfig::default();
        config.ping_timeout = 1;
        config.pong_timeout = 1;
        let (server, handle, port) = run_test_server(config).await;
        let mut conn = TestConn::connect(port).await;
        conn.login("wakeful", "wakeful").await;

        assert_eq!("PING :irc.localhost", conn.recv().await);
        conn.send("PONG :irc.localhost").await;
        // survives into the next ping period
        assert_eq!("PING :irc.localhost", conn.recv().await);
        quit_test_server(server, handle).await;
    }

    #[tokio::test]
    async fn test_max_connections_refused() {
        let mut config = MainConfig::default();
        config.max_connections = Some(1);
        let (server, handle, port) = run_test_server(config).await;
        let mut first = TestConn::connect(port).await;
        first.login("first", "first").await;

        let mut second = TestConn::connect(port).await;
        assert_eq!("ERROR :Too many connections", second.recv().await);
        quit_test_server(server, handle).await;
    }

    #[tokio::test]
    async fn test_quit_cleanup_removes_client() {
        let (server, handle, port) = run_test_server(MainConfig::default()).await;
        let mut conn = TestConn::connect(port).await;
        conn.login("gone", "gone").await;
        conn.send("QUIT :bye").await;
        assert_eq!("ERROR :Closing link: Quit: bye", conn.recv().await);

        // wait for teardown to take the client out of the store
        for _ in 0..50 {
            if server.clients.len() == 0 {
                break;
            }
            time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(0, server.clients.len());
        quit_test_server(server, handle).await;
    }
}
