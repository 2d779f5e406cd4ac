//! Line-delimited NMEA feed reader
//!
//! Online AIS feeds and receivers emit one sentence per line, usually
//! `\r\n` terminated. We split at either `\r` or `\n`, so `\r\n` produces
//! an empty line, which is skipped — some feeds also send empty lines as
//! heartbeats.

use std::{
    pin::Pin,
    str::Utf8Error,
    task::{
        Context,
        Poll,
    },
};

use futures_util::Stream;
use pin_project_lite::pin_project;
use tokio::io::{
    AsyncRead,
    ReadBuf,
};

const RECEIVE_BUFFER_SIZE: usize = 1024;

#[derive(Debug, thiserror::Error)]
#[error("feed read error")]
pub enum Error {
    Io(#[from] std::io::Error),
    #[error("line exceeds {RECEIVE_BUFFER_SIZE} bytes")]
    MaxLineLengthExceeded,
    InvalidEncoding(#[from] Utf8Error),
}

pin_project! {
    /// Stream of sentence lines over any [`AsyncRead`].
    #[derive(Debug)]
    pub struct Reader<R> {
        #[pin]
        reader: R,
        receive_buffer: ReceiveBuffer,
    }
}

impl<R: AsyncRead> Reader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            receive_buffer: ReceiveBuffer::default(),
        }
    }
}

impl<R: AsyncRead> Stream for Reader<R> {
    type Item = Result<String, Error>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            let this = self.as_mut().project();

            if let Some(line) = this.receive_buffer.next_line() {
                if !line.is_empty() {
                    match str::from_utf8(line) {
                        Ok(line) => return Poll::Ready(Some(Ok(line.to_owned()))),
                        Err(error) => return Poll::Ready(Some(Err(error.into()))),
                    }
                }
            }
            else {
                this.receive_buffer.prepare_read();
                if this.receive_buffer.is_full() {
                    // a full buffer without a newline can never complete
                    this.receive_buffer.reset();
                    return Poll::Ready(Some(Err(Error::MaxLineLengthExceeded)));
                }

                let mut read_buf =
                    ReadBuf::new(&mut this.receive_buffer.buffer[this.receive_buffer.write_pos..]);
                match this.reader.poll_read(cx, &mut read_buf) {
                    Poll::Pending => return Poll::Pending,
                    Poll::Ready(Err(error)) => return Poll::Ready(Some(Err(error.into()))),
                    Poll::Ready(Ok(())) => {
                        let num_bytes_read = read_buf.filled().len();
                        if num_bytes_read == 0 {
                            return Poll::Ready(None);
                        }

                        this.receive_buffer.write_pos += num_bytes_read;
                    }
                }
            }
        }
    }
}

#[derive(Debug)]
struct ReceiveBuffer {
    buffer: [u8; RECEIVE_BUFFER_SIZE],
    read_pos: usize,
    write_pos: usize,
    no_newline_until: usize,
}

impl ReceiveBuffer {
    fn scan_for_newline(&mut self) -> Option<usize> {
        if let Some(index) = self.buffer[self.no_newline_until..self.write_pos]
            .iter()
            .position(|byte| *byte == b'\r' || *byte == b'\n')
        {
            let index = index + self.no_newline_until;
            self.no_newline_until = index;
            Some(index)
        }
        else {
            self.no_newline_until = self.write_pos;
            None
        }
    }

    fn next_line(&mut self) -> Option<&[u8]> {
        if let Some(newline) = self.scan_for_newline() {
            let start = self.read_pos;
            self.read_pos = newline + 1;
            self.no_newline_until = self.read_pos;
            Some(&self.buffer[start..newline])
        }
        else {
            None
        }
    }

    fn prepare_read(&mut self) {
        if self.read_pos < self.write_pos && self.read_pos > 0 {
            // move the partial line to the front
            self.buffer.copy_within(self.read_pos..self.write_pos, 0);
            self.write_pos -= self.read_pos;
            self.no_newline_until -= self.read_pos;
            self.read_pos = 0;
        }
        else if self.read_pos == self.write_pos {
            self.read_pos = 0;
            self.write_pos = 0;
            self.no_newline_until = 0;
        }
    }

    fn is_full(&self) -> bool {
        self.write_pos == RECEIVE_BUFFER_SIZE
    }

    fn reset(&mut self) {
        self.read_pos = 0;
        self.write_pos = 0;
        self.no_newline_until = 0;
    }
}

impl Default for ReceiveBuffer {
    fn default() -> Self {
        Self {
            buffer: [0; RECEIVE_BUFFER_SIZE],
            read_pos: 0,
            write_pos: 0,
            no_newline_until: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use futures_util::TryStreamExt;

    use crate::reader::{
        Error,
        Reader,
    };

    const EXAMPLE: &str = "!AIVDM,1,1,,A,13u?etPv2;0n:dDPwUM1U1Cb069D,0*24\r\n\
        \r\n\
        !AIVDM,1,1,,B,177KQJ5000G?tO`K>RA1wUbN0TKH,0*5C\n";

    #[tokio::test]
    async fn it_splits_lines_and_skips_heartbeats() {
        let mut reader = Reader::new(EXAMPLE.as_bytes());

        let mut lines = Vec::new();
        while let Some(line) = reader.try_next().await.unwrap() {
            lines.push(line);
        }
        assert_eq!(
            lines,
            [
                "!AIVDM,1,1,,A,13u?etPv2;0n:dDPwUM1U1Cb069D,0*24",
                "!AIVDM,1,1,,B,177KQJ5000G?tO`K>RA1wUbN0TKH,0*5C",
            ]
        );
    }

    #[tokio::test]
    async fn it_yields_a_trailing_unterminated_line_as_eof() {
        let mut reader = Reader::new(&b"!AIVDM,partial"[..]);
        // no newline ever arrives; the stream ends without the partial
        assert_eq!(reader.try_next().await.unwrap(), None);
    }

    #[tokio::test]
    async fn it_rejects_overlong_lines() {
        let long = vec![b'x'; 4096];
        let mut reader = Reader::new(&long[..]);
        assert!(matches!(
            reader.try_next().await,
            Err(Error::MaxLineLengthExceeded)
        ));
    }
}
