use std::fmt;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::debug;

use crate::error::{ProtocolError, Result};
use crate::transport::Transport;

/// Opens a TCP connection to `addr`, honoring the optional connect timeout.
pub type SocketFactory =
    Box<dyn Fn(&SocketAddr, Option<Duration>) -> io::Result<TcpStream> + Send + Sync>;

/// Configuration for a [SocketTransport].
pub struct SocketTransportBuilder {
    host:            String,
    port:            u16,
    read_timeout:    Option<Duration>,
    connect_timeout: Option<Duration>,
    socket_factory:  Option<SocketFactory>,
}

impl SocketTransportBuilder {
    pub fn new(host: impl Into<String>, port: u16) -> SocketTransportBuilder {
        SocketTransportBuilder {
            host:            host.into(),
            port,
            read_timeout:    None,
            connect_timeout: None,
            socket_factory:  None,
        }
    }

    /// Reads that wait longer than this fail with [ProtocolError::Timeout].
    pub fn read_timeout(mut self, timeout: Duration) -> SocketTransportBuilder {
        self.read_timeout = Some(timeout);
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> SocketTransportBuilder {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Replaces the default `TcpStream::connect` with a custom opener.
    pub fn socket_factory(mut self, factory: SocketFactory) -> SocketTransportBuilder {
        self.socket_factory = Some(factory);
        self
    }

    /// Builds an unconnected transport; call [SocketTransport::connect] next.
    pub fn build(self) -> SocketTransport {
        SocketTransport {
            config: self,
            socket: None,
            input:  None,
            output: None,
        }
    }
}

impl fmt::Debug for SocketTransportBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SocketTransportBuilder")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("read_timeout", &self.read_timeout)
            .field("connect_timeout", &self.connect_timeout)
            .field("socket_factory", &self.socket_factory.is_some())
            .finish()
    }
}

/// A blocking TCP transport with buffered input and output halves.
#[derive(Debug)]
pub struct SocketTransport {
    config: SocketTransportBuilder,
    socket: Option<TcpStream>,
    input:  Option<BufReader<TcpStream>>,
    output: Option<BufWriter<TcpStream>>,
}

impl SocketTransport {
    pub fn builder(host: impl Into<String>, port: u16) -> SocketTransportBuilder {
        SocketTransportBuilder::new(host, port)
    }

    /// Wraps an already connected stream, e.g. one returned by
    /// `TcpListener::accept`.
    pub fn from_stream(stream: TcpStream) -> Result<SocketTransport> {
        let peer = stream.peer_addr()?;
        let mut transport = SocketTransportBuilder::new(peer.ip().to_string(), peer.port()).build();
        transport.attach(stream)?;
        Ok(transport)
    }

    pub fn is_open(&self) -> bool {
        self.socket.is_some()
    }

    /// Resolves the configured host and connects to the first address that
    /// accepts.
    pub fn connect(&mut self) -> Result<()> {
        if self.is_open() {
            return Ok(());
        }

        let addrs = (self.config.host.as_str(), self.config.port).to_socket_addrs()?;
        let mut last_err = None;
        for addr in addrs {
            let attempt = match &self.config.socket_factory {
                Some(factory) => factory(&addr, self.config.connect_timeout),
                None => match self.config.connect_timeout {
                    Some(timeout) => TcpStream::connect_timeout(&addr, timeout),
                    None => TcpStream::connect(addr),
                },
            };
            match attempt {
                Ok(stream) => {
                    debug!(%addr, "connected");
                    return self.attach(stream);
                }
                Err(err) => {
                    debug!(%addr, error = %err, "connect attempt failed");
                    last_err = Some(err);
                }
            }
        }

        Err(match last_err {
            Some(err) => err.into(),
            None => ProtocolError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{}:{} did not resolve to any address", self.config.host, self.config.port),
            )),
        })
    }

    fn attach(&mut self, stream: TcpStream) -> Result<()> {
        stream.set_read_timeout(self.config.read_timeout)?;
        stream.set_nodelay(true)?;
        self.input = Some(BufReader::new(stream.try_clone()?));
        self.output = Some(BufWriter::new(stream.try_clone()?));
        self.socket = Some(stream);
        Ok(())
    }
}

impl Transport for SocketTransport {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let input = self.input.as_mut().ok_or(ProtocolError::NotOpen)?;
        Ok(input.read(buf)?)
    }

    fn write(&mut self, buf: &[u8]) -> Result<()> {
        let output = self.output.as_mut().ok_or(ProtocolError::NotOpen)?;
        Ok(output.write_all(buf)?)
    }

    fn flush(&mut self) -> Result<()> {
        let output = self.output.as_mut().ok_or(ProtocolError::NotOpen)?;
        Ok(output.flush()?)
    }

    /// Shuts down the input half, the output half and the socket, each on its
    /// own. A failure on one is logged and does not stop the others.
    fn close(&mut self) -> Result<()> {
        if let Some(input) = self.input.take() {
            if let Err(err) = input.get_ref().shutdown(Shutdown::Read) {
                debug!(error = %err, "error closing socket input");
            }
        }
        if let Some(mut output) = self.output.take() {
            if let Err(err) = output.flush() {
                debug!(error = %err, "error flushing socket output");
            }
            if let Err(err) = output.get_ref().shutdown(Shutdown::Write) {
                debug!(error = %err, "error closing socket output");
            }
        }
        if let Some(socket) = self.socket.take() {
            if let Err(err) = socket.shutdown(Shutdown::Both) {
                debug!(error = %err, "error closing socket");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::thread;

    #[test]
    fn unconnected_transport_is_not_open() {
        let mut transport = SocketTransport::builder("127.0.0.1", 1).build();
        assert!(!transport.is_open());
        assert!(matches!(transport.read(&mut [0u8; 1]), Err(ProtocolError::NotOpen)));
        assert!(matches!(transport.write(&[1]), Err(ProtocolError::NotOpen)));
        transport.close().unwrap();
    }

    #[test]
    fn echo_over_loopback() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut transport = SocketTransport::from_stream(stream).unwrap();
            let mut buf = [0u8; 5];
            transport.read_exact(&mut buf).unwrap();
            transport.write(&buf).unwrap();
            transport.flush().unwrap();
            transport.close().unwrap();
        });

        let mut client = SocketTransport::builder("127.0.0.1", port)
            .connect_timeout(Duration::from_secs(5))
            .read_timeout(Duration::from_secs(5))
            .build();
        client.connect().unwrap();
        client.write(b"hello").unwrap();
        client.flush().unwrap();

        let mut buf = [0u8; 5];
        client.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"hello");

        server.join().unwrap();
        client.close().unwrap();
        client.close().unwrap();
        assert!(!client.is_open());
    }

    #[test]
    fn read_timeout_surfaces_as_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let mut client = SocketTransport::builder("127.0.0.1", port)
            .read_timeout(Duration::from_millis(50))
            .build();
        client.connect().unwrap();
        let (_held, _) = listener.accept().unwrap();

        let err = client.read(&mut [0u8; 1]).unwrap_err();
        assert!(matches!(err, ProtocolError::Timeout), "unexpected error {:?}", err);
        client.close().unwrap();
    }

    #[test]
    fn custom_socket_factory_is_used() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();

        let mut client = SocketTransport::builder("127.0.0.1", port)
            .socket_factory(Box::new(move |addr, _timeout| {
                seen.fetch_add(1, Ordering::SeqCst);
                TcpStream::connect(addr)
            }))
            .build();
        client.connect().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        client.close().unwrap();
    }
}
