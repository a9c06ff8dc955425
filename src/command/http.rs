//! Blocking HTTP/1.1 transport for control commands.
//!
//! One connection per command: `POST <path>` with `Content-Length: 0` and
//! `Connection: close`. Only the status line of the answer is read.

use std::io::{self, BufRead, BufReader, ErrorKind, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::debug;

use super::{Ack, Command, CommandTransport, CommandTransportError};

/// Sends commands to `host:port` over plain HTTP. The timeout bounds the
/// connect, the write and the status read; a zero timeout means none.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    target: String,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(target: impl Into<String>, timeout: Duration) -> Self {
        Self {
            target: target.into(),
            timeout,
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    fn limit(&self) -> Option<Duration> {
        (!self.timeout.is_zero()).then_some(self.timeout)
    }

    /// Try each resolved address in turn, keeping the last failure.
    fn connect(&self) -> Result<TcpStream, CommandTransportError> {
        let connect_err = |source: io::Error| CommandTransportError::Connect {
            target: self.target.clone(),
            source,
        };
        let addrs = self.target.to_socket_addrs().map_err(connect_err)?;

        let mut last = io::Error::new(ErrorKind::NotFound, "no addresses resolved");
        for addr in addrs {
            let attempt = match self.limit() {
                Some(timeout) => TcpStream::connect_timeout(&addr, timeout),
                None => TcpStream::connect(addr),
            };
            match attempt {
                Ok(stream) => return Ok(stream),
                Err(e) => last = e,
            }
        }
        Err(connect_err(last))
    }

    fn request(command: Command, host: &str) -> String {
        format!(
            "{} {} HTTP/1.1\r\nHost: {}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
            command.method(),
            command.path(),
            host
        )
    }
}

/// Parse the status code out of `HTTP/1.1 200 OK`.
fn parse_status(line: &str) -> Result<u16, CommandTransportError> {
    let mut parts = line.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some(version), Some(code)) if version.starts_with("HTTP/") => code
            .parse()
            .map_err(|_| CommandTransportError::MalformedResponse(line.trim_end().to_string())),
        _ => Err(CommandTransportError::MalformedResponse(line.trim_end().to_string())),
    }
}

impl CommandTransport for HttpTransport {
    fn send(&self, command: Command) -> Result<Ack, CommandTransportError> {
        let stream = self.connect()?;
        stream.set_read_timeout(self.limit())?;
        stream.set_write_timeout(self.limit())?;

        debug!(%command, target = %self.target, "sending command");
        let mut writer = &stream;
        writer.write_all(Self::request(command, &self.target).as_bytes())?;
        writer.flush()?;

        let mut status_line = String::new();
        BufReader::new(&stream).read_line(&mut status_line)?;
        let status = parse_status(&status_line)?;

        if (200..300).contains(&status) {
            Ok(Ack { status })
        } else {
            Err(CommandTransportError::Rejected { command, status })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::net::TcpListener;
    use std::thread;

    /// Accept `count` connections, capture each request head and answer
    /// each with `status` and a short body.
    fn stub_server(status: &'static str, count: usize) -> (String, thread::JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let handle = thread::spawn(move || {
            let mut requests = Vec::with_capacity(count);
            for _ in 0..count {
                let (mut conn, _) = listener.accept().unwrap();
                let mut request = Vec::new();
                let mut buf = [0u8; 512];
                while !request.ends_with(b"\r\n\r\n") {
                    let n = conn.read(&mut buf).unwrap();
                    if n == 0 {
                        break;
                    }
                    request.extend_from_slice(&buf[..n]);
                }
                let reply = format!("HTTP/1.1 {}\r\nContent-Length: 2\r\n\r\nok", status);
                conn.write_all(reply.as_bytes()).unwrap();
                requests.push(String::from_utf8(request).unwrap());
            }
            requests
        });
        (addr, handle)
    }

    #[test]
    fn test_post_without_body() {
        let (addr, server) = stub_server("200 OK", 1);
        let transport = HttpTransport::new(addr, Duration::from_secs(2));
        let ack = transport.send(Command::Step).unwrap();
        assert_eq!(ack.status, 200);

        let requests = server.join().unwrap();
        assert!(requests[0].starts_with("POST /step HTTP/1.1\r\n"));
        assert!(requests[0].contains("Content-Length: 0\r\n"));
        assert!(requests[0].ends_with("\r\n\r\n"));
    }

    #[test]
    fn test_command_sequence_each_bodiless() {
        let (addr, server) = stub_server("200 OK", 3);
        let transport = HttpTransport::new(addr, Duration::from_secs(2));
        for command in [Command::Step, Command::Reset, Command::Start] {
            assert_eq!(transport.send(command).unwrap().status, 200);
        }

        let requests = server.join().unwrap();
        let heads: Vec<&str> = requests.iter().map(|r| r.lines().next().unwrap()).collect();
        assert_eq!(
            heads,
            ["POST /step HTTP/1.1", "POST /reset HTTP/1.1", "POST /start HTTP/1.1"]
        );
        for request in &requests {
            assert!(request.contains("Content-Length: 0\r\n"));
            assert!(request.contains("Connection: close\r\n"));
            assert!(request.ends_with("\r\n\r\n"));
        }
    }

    #[test]
    fn test_zero_timeout_means_unbounded() {
        let (addr, server) = stub_server("204 No Content", 1);
        let transport = HttpTransport::new(addr, Duration::ZERO);
        assert_eq!(transport.send(Command::Stop).unwrap().status, 204);
        server.join().unwrap();
    }

    #[test]
    fn test_non_success_status() {
        let (addr, server) = stub_server("500 Internal Server Error", 1);
        let transport = HttpTransport::new(addr, Duration::from_secs(2));
        let err = transport.send(Command::Reset).unwrap_err();
        assert!(matches!(
            err,
            CommandTransportError::Rejected { command: Command::Reset, status: 500 }
        ));
        server.join().unwrap();
    }

    #[test]
    fn test_unreachable_target() {
        // Bind then drop to get a port nothing listens on.
        let addr = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().to_string();
        let transport = HttpTransport::new(addr, Duration::from_millis(200));
        assert!(matches!(
            transport.send(Command::Start),
            Err(CommandTransportError::Connect { .. })
        ));
    }

    #[test]
    fn test_unresolvable_target() {
        let transport = HttpTransport::new("no-port-here", Duration::from_millis(200));
        assert!(matches!(
            transport.send(Command::Step),
            Err(CommandTransportError::Connect { .. })
        ));
    }

    #[test]
    fn test_parse_status() {
        assert_eq!(parse_status("HTTP/1.1 204 No Content\r\n").unwrap(), 204);
        assert!(parse_status("garbage\r\n").is_err());
        assert!(parse_status("").is_err());
        assert!(parse_status("HTTP/1.1 abc\r\n").is_err());
    }
}
