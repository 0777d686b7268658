//! Line framing over a raw byte stream
//!
//! Built for raw terminal clients such as telnet or netcat: `\r` is dropped
//! and backspace/delete erase the previous character before the line is
//! handed on.

use tokio::io::{AsyncRead, AsyncReadExt, BufReader};

use crate::error::Disconnected;

const BACKSPACE: u8 = 0x08;
const DELETE: u8 = 0x7F;

/// Reads logical lines from a byte stream
#[derive(Debug)]
pub struct LineReader<R> {
    inner: BufReader<R>,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            inner: BufReader::new(reader),
        }
    }

    /// Read the next line, without its `\n`
    ///
    /// A stream that ends mid-line yields the partial line; the following
    /// call reports [`Disconnected::Closed`]. An empty line (`"\n"`) is a
    /// valid, empty result and is distinct from a closed stream.
    pub async fn read_line(&mut self) -> Result<String, Disconnected> {
        let mut buf: Vec<u8> = Vec::new();
        let mut bytes_read = 0usize;

        loop {
            let byte = match self.inner.read_u8().await {
                Ok(byte) => byte,
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    if bytes_read == 0 {
                        return Err(Disconnected::Closed);
                    }
                    break;
                }
                Err(e) => return Err(Disconnected::Io(e)),
            };
            bytes_read += 1;

            match byte {
                b'\n' => break,
                b'\r' => {}
                BACKSPACE | DELETE => erase_last_char(&mut buf),
                other => buf.push(other),
            }
        }

        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

/// Remove the last UTF-8 character, not just its final byte
fn erase_last_char(buf: &mut Vec<u8>) {
    while let Some(byte) = buf.pop() {
        // Continuation bytes look like 0b10xx_xxxx
        if byte & 0xC0 != 0x80 {
            break;
        }
    }
}
