#[cfg(feature = "secure")]
use openssl::ssl::SslStream;

use std::{
    io::{Read, Result, Write},
    net::{Shutdown, TcpStream},
    time::Duration,
};

/// Bound every blocking read and write. A zero duration means no limit.
pub fn set_socket_timeout(stream: &TcpStream, timeout: Duration) -> Result<()> {
    let timeout = if timeout == Duration::from_secs(0) {
        None
    } else {
        Some(timeout)
    };
    stream.set_read_timeout(timeout)?;
    stream.set_write_timeout(timeout)
}

/// Control or data connection, optionally protected by TLS.
#[derive(Debug)]
pub enum DataStream {
    Tcp(TcpStream),
    #[cfg(feature = "secure")]
    Ssl(Box<SslStream<TcpStream>>),
}

impl DataStream {
    /// Returns a reference to the underlying TcpStream.
    pub fn get_ref(&self) -> &TcpStream {
        match *self {
            DataStream::Tcp(ref stream) => stream,
            #[cfg(feature = "secure")]
            DataStream::Ssl(ref stream) => stream.get_ref(),
        }
    }

    /// Flush and close the write side so the peer sees end of file.
    pub fn finish(mut self) -> Result<()> {
        self.flush()?;
        match self {
            DataStream::Tcp(ref stream) => stream.shutdown(Shutdown::Write),
            #[cfg(feature = "secure")]
            DataStream::Ssl(ref mut stream) => {
                if let Err(e) = stream.shutdown() {
                    debug!("TLS close_notify on data stream failed: {}", e);
                }
                stream.get_ref().shutdown(Shutdown::Write)
            }
        }
    }
}

impl Read for DataStream {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        match *self {
            DataStream::Tcp(ref mut stream) => stream.read(buf),
            #[cfg(feature = "secure")]
            DataStream::Ssl(ref mut stream) => stream.read(buf),
        }
    }
}

impl Write for DataStream {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        match *self {
            DataStream::Tcp(ref mut stream) => stream.write(buf),
            #[cfg(feature = "secure")]
            DataStream::Ssl(ref mut stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> Result<()> {
        match *self {
            DataStream::Tcp(ref mut stream) => stream.flush(),
            #[cfg(feature = "secure")]
            DataStream::Ssl(ref mut stream) => stream.flush(),
        }
    }
}
