use std::io::ErrorKind;
use std::time::Instant;

use bytes::Bytes;
use cobslink_frame::{FrameCodec, FrameConfig, FrameError, DEFAULT_MAX_PAYLOAD, DELIMITER};
use cobslink_transport::Transport;
use tracing::{debug, error, warn};

use crate::attempt::Attempt;
use crate::config::ChannelConfig;
use crate::error::{ChannelError, Result};

const READ_CHUNK_SIZE: usize = 512;

/// One request/response exchange at a time over a caller-supplied transport.
///
/// Each exchange writes the whole request, then reads until the first `0x00`
/// delimiter or until the per-attempt read deadline passes, then decodes the
/// response frame. Any failure inside that cycle (write error, short write,
/// timeout, end of stream, corrupt response) consumes one attempt; after
/// `attempts` failures the error from the final attempt is returned.
///
/// # Deadline boundary
///
/// Reads race the deadline. Before each read the transport's read timeout is
/// set to the time remaining, and every chunk that arrives is scanned for the
/// delimiter *before* the deadline is checked again. A chunk that completes
/// the response therefore counts as success even if the deadline expired
/// while it was being delivered.
///
/// Bytes that follow the delimiter in the same read are discarded.
pub struct ReliableChannel<T> {
    transport: T,
    config: ChannelConfig,
    codec: FrameCodec,
    max_frame: usize,
    buf: Vec<u8>,
    last_attempts: u32,
}

impl<T: Transport> ReliableChannel<T> {
    /// Wrap `transport`, rejecting an invalid `config`.
    pub fn new(transport: T, config: ChannelConfig) -> Result<Self> {
        Self::with_codec(transport, config, FrameCodec::new())
    }

    /// Like [`new`](Self::new), with a caller-built codec (e.g. a fixed
    /// maximum payload). The codec's limit also bounds response size.
    pub fn with_codec(transport: T, config: ChannelConfig, codec: FrameCodec) -> Result<Self> {
        config.validate()?;
        let max_frame = FrameConfig {
            max_payload_size: codec.max_payload().unwrap_or(DEFAULT_MAX_PAYLOAD),
        }
        .max_frame_size();
        Ok(Self {
            transport,
            config,
            codec,
            max_frame,
            buf: Vec::with_capacity(READ_CHUNK_SIZE),
            last_attempts: 0,
        })
    }

    /// Frame `payload` and run one exchange with it.
    pub fn request(&mut self, payload: &[u8]) -> Result<Bytes> {
        let wire = self.codec.encode_wire(payload)?.to_vec();
        self.exchange(&wire)
    }

    /// Send an already-encoded wire message and return the decoded response
    /// payload.
    ///
    /// `request` must end with the delimiter; anything else fails with
    /// [`ChannelError::MalformedRequest`] before the transport is touched.
    pub fn exchange(&mut self, request: &[u8]) -> Result<Bytes> {
        self.last_attempts = 0;
        if request.last() != Some(&DELIMITER) {
            return Err(ChannelError::MalformedRequest);
        }

        let mut attempt = Attempt::first(&self.config);
        loop {
            self.last_attempts = attempt.number();
            debug!(
                attempt = attempt.number(),
                max_attempts = attempt.max_attempts(),
                size = request.len(),
                "sending request"
            );

            let err = match self.attempt_once(request) {
                Ok(payload) => return Ok(payload),
                Err(err) => err,
            };

            match attempt.next() {
                Some(next) => {
                    warn!(
                        attempt = attempt.number(),
                        max_attempts = attempt.max_attempts(),
                        error = %err,
                        "exchange attempt failed; retrying"
                    );
                    std::thread::sleep(attempt.delay());
                    attempt = next;
                }
                None => {
                    error!(
                        attempts = attempt.number(),
                        error = %err,
                        "exchange failed; attempts exhausted"
                    );
                    return Err(err);
                }
            }
        }
    }

    /// Attempts used by the most recent exchange (0 before the first one).
    pub fn last_exchange_attempts(&self) -> u32 {
        self.last_attempts
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    /// Borrow the underlying transport.
    pub fn get_ref(&self) -> &T {
        &self.transport
    }

    /// Mutably borrow the underlying transport.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Consume the channel and return the transport.
    pub fn into_inner(self) -> T {
        self.transport
    }

    fn attempt_once(&mut self, request: &[u8]) -> Result<Bytes> {
        let deadline = Instant::now() + self.config.read_timeout;
        self.write_request(request)?;
        let end = self.read_response(deadline)?;
        let payload = self.codec.decode_frame(&self.buf[..end])?;
        Ok(Bytes::copy_from_slice(payload))
    }

    fn write_request(&mut self, request: &[u8]) -> Result<()> {
        let written = loop {
            match self.transport.write(request) {
                Ok(n) => break n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(err.into()),
            }
        };
        if written != request.len() {
            return Err(ChannelError::ShortWrite {
                written,
                expected: request.len(),
            });
        }
        loop {
            match self.transport.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Fill `buf` until it holds a delimiter; returns the delimiter's offset.
    fn read_response(&mut self, deadline: Instant) -> Result<usize> {
        self.buf.clear();
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(ChannelError::Timeout(self.config.read_timeout));
            }
            self.transport.set_read_timeout(Some(remaining))?;

            let read = match self.transport.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    continue;
                }
                Err(err) => return Err(err.into()),
            };

            if read == 0 {
                if self.buf.is_empty() {
                    return Err(ChannelError::NoDataRead);
                }
                return Err(ChannelError::ConnectionClosed {
                    buffered: self.buf.len(),
                });
            }

            let scanned = self.buf.len();
            self.buf.extend_from_slice(&chunk[..read]);
            if let Some(idx) = chunk[..read].iter().position(|&b| b == DELIMITER) {
                return Ok(scanned + idx);
            }
            if self.buf.len() > self.max_frame {
                return Err(FrameError::FrameTooLarge {
                    max: self.max_frame,
                }
                .into());
            }
        }
    }
}

impl<T> std::fmt::Debug for ReliableChannel<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReliableChannel")
            .field("config", &self.config)
            .field("last_attempts", &self.last_attempts)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::io::{self, Read, Write};
    use std::time::Duration;

    use cobslink_frame::FrameError;

    use super::*;

    fn wire(payload: &[u8]) -> Vec<u8> {
        FrameCodec::new().encode_wire(payload).unwrap().to_vec()
    }

    fn config(attempts: u32) -> ChannelConfig {
        ChannelConfig {
            attempts,
            retry_delay: Duration::from_millis(1),
            read_timeout: Duration::from_millis(200),
        }
    }

    enum WriteMode {
        Accept,
        Fail,
        Short(usize),
    }

    /// Replays scripted read results and records every write.
    struct ScriptedTransport {
        reads: VecDeque<io::Result<Vec<u8>>>,
        writes: Vec<Vec<u8>>,
        write_mode: WriteMode,
        timeouts: Vec<Option<Duration>>,
    }

    impl ScriptedTransport {
        fn new(reads: Vec<io::Result<Vec<u8>>>) -> Self {
            Self {
                reads: reads.into(),
                writes: Vec::new(),
                write_mode: WriteMode::Accept,
                timeouts: Vec::new(),
            }
        }

        fn with_write_mode(mut self, mode: WriteMode) -> Self {
            self.write_mode = mode;
            self
        }
    }

    impl Read for ScriptedTransport {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.reads.pop_front() {
                None => Ok(0),
                Some(Err(err)) => Err(err),
                Some(Ok(mut data)) => {
                    let n = data.len().min(buf.len());
                    buf[..n].copy_from_slice(&data[..n]);
                    if n < data.len() {
                        self.reads.push_front(Ok(data.split_off(n)));
                    }
                    Ok(n)
                }
            }
        }
    }

    impl Write for ScriptedTransport {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.writes.push(buf.to_vec());
            match self.write_mode {
                WriteMode::Accept => Ok(buf.len()),
                WriteMode::Fail => Err(io::Error::from(io::ErrorKind::BrokenPipe)),
                WriteMode::Short(missing) => Ok(buf.len().saturating_sub(missing)),
            }
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Transport for ScriptedTransport {
        fn set_read_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()> {
            self.timeouts.push(timeout);
            Ok(())
        }
    }

    /// Trickles one non-delimiter byte per millisecond, forever.
    struct NeverDelimited;

    impl Read for NeverDelimited {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            std::thread::sleep(Duration::from_millis(1));
            buf[0] = 0x42;
            Ok(1)
        }
    }

    impl Write for NeverDelimited {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Transport for NeverDelimited {}

    /// Delivers a complete response, but only after `delay`.
    struct SlowResponder {
        delay: Duration,
        response: Option<Vec<u8>>,
    }

    impl Read for SlowResponder {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            std::thread::sleep(self.delay);
            let data = self.response.take().unwrap_or_default();
            buf[..data.len()].copy_from_slice(&data);
            Ok(data.len())
        }
    }

    impl Write for SlowResponder {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Transport for SlowResponder {}

    #[test]
    fn request_returns_response_payload() {
        let transport = ScriptedTransport::new(vec![Ok(wire(b"pong"))]);
        let mut channel = ReliableChannel::new(transport, config(3)).unwrap();

        let response = channel.request(b"ping").unwrap();
        assert_eq!(response.as_ref(), b"pong");
        assert_eq!(channel.last_exchange_attempts(), 1);
        assert_eq!(channel.get_ref().writes, vec![wire(b"ping")]);
    }

    #[test]
    fn response_split_across_reads() {
        let response = wire(b"fragmented response");
        let reads = response.iter().map(|&b| Ok(vec![b])).collect();
        let mut channel = ReliableChannel::new(ScriptedTransport::new(reads), config(1)).unwrap();

        let payload = channel.exchange(&wire(b"req")).unwrap();
        assert_eq!(payload.as_ref(), b"fragmented response");
    }

    #[test]
    fn bytes_after_delimiter_are_ignored() {
        let mut response = wire(b"payload");
        response.extend_from_slice(&[9, 9, 9, 0, 1, 2]);
        let mut channel =
            ReliableChannel::new(ScriptedTransport::new(vec![Ok(response)]), config(1)).unwrap();

        assert_eq!(channel.exchange(&wire(b"q")).unwrap().as_ref(), b"payload");
    }

    #[test]
    fn read_timeout_is_armed_with_remaining_time() {
        let transport = ScriptedTransport::new(vec![Ok(wire(b"ok"))]);
        let mut channel = ReliableChannel::new(transport, config(1)).unwrap();
        channel.request(b"x").unwrap();

        let timeouts = &channel.get_ref().timeouts;
        assert!(!timeouts.is_empty());
        for timeout in timeouts {
            let remaining = timeout.expect("read timeout armed");
            assert!(remaining > Duration::ZERO);
            assert!(remaining <= Duration::from_millis(200));
        }
    }

    #[test]
    fn malformed_request_never_touches_transport() {
        let transport = ScriptedTransport::new(vec![Ok(wire(b"unused"))]);
        let mut channel = ReliableChannel::new(transport, config(3)).unwrap();

        let err = channel.exchange(&[3, 1, 2]).unwrap_err();
        assert!(matches!(err, ChannelError::MalformedRequest));
        let err = channel.exchange(&[]).unwrap_err();
        assert!(matches!(err, ChannelError::MalformedRequest));

        assert!(channel.get_ref().writes.is_empty());
        assert_eq!(channel.last_exchange_attempts(), 0);
    }

    #[test]
    fn malformed_request_resets_attempt_count() {
        let transport = ScriptedTransport::new(vec![Ok(wire(b"pong"))]);
        let mut channel = ReliableChannel::new(transport, config(3)).unwrap();

        assert_eq!(channel.request(b"ping").unwrap().as_ref(), b"pong");
        assert_eq!(channel.last_exchange_attempts(), 1);

        let err = channel.exchange(&[1, 2]).unwrap_err();
        assert!(matches!(err, ChannelError::MalformedRequest));
        assert_eq!(channel.last_exchange_attempts(), 0);
        assert_eq!(channel.get_ref().writes.len(), 1);
    }

    #[test]
    fn failing_writes_use_every_attempt() {
        let transport = ScriptedTransport::new(Vec::new()).with_write_mode(WriteMode::Fail);
        let mut channel = ReliableChannel::new(transport, config(3)).unwrap();

        let err = channel.request(b"data").unwrap_err();
        match err {
            ChannelError::Io(io_err) => assert_eq!(io_err.kind(), io::ErrorKind::BrokenPipe),
            other => panic!("expected write error, got {other:?}"),
        }
        assert_eq!(channel.get_ref().writes.len(), 3);
        assert_eq!(channel.last_exchange_attempts(), 3);
    }

    #[test]
    fn short_write_fails_attempt() {
        let transport = ScriptedTransport::new(vec![Ok(wire(b"never read"))])
            .with_write_mode(WriteMode::Short(1));
        let mut channel = ReliableChannel::new(transport, config(2)).unwrap();

        let request = wire(b"data");
        let err = channel.exchange(&request).unwrap_err();
        match err {
            ChannelError::ShortWrite { written, expected } => {
                assert_eq!(expected, request.len());
                assert_eq!(written, request.len() - 1);
            }
            other => panic!("expected short write, got {other:?}"),
        }
        assert_eq!(channel.get_ref().writes.len(), 2);
        assert_eq!(channel.get_ref().reads.len(), 1);
    }

    #[test]
    fn corrupt_response_is_retried() {
        let mut corrupt = wire(b"data");
        corrupt[1] ^= 0x01;
        let transport = ScriptedTransport::new(vec![Ok(corrupt), Ok(wire(b"data"))]);
        let mut channel = ReliableChannel::new(transport, config(3)).unwrap();

        let payload = channel.request(b"get").unwrap();
        assert_eq!(payload.as_ref(), b"data");
        assert_eq!(channel.last_exchange_attempts(), 2);
        assert_eq!(channel.get_ref().writes.len(), 2);
    }

    #[test]
    fn corrupt_responses_exhaust_with_integrity_error() {
        let mut corrupt = wire(b"data");
        corrupt[1] ^= 0x01;
        let transport = ScriptedTransport::new(vec![Ok(corrupt.clone()), Ok(corrupt)]);
        let mut channel = ReliableChannel::new(transport, config(2)).unwrap();

        let err = channel.request(b"get").unwrap_err();
        assert!(matches!(
            err,
            ChannelError::Frame(FrameError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn empty_stream_is_no_data_read() {
        let transport = ScriptedTransport::new(Vec::new());
        let mut channel = ReliableChannel::new(transport, config(3)).unwrap();

        let err = channel.request(b"hello").unwrap_err();
        assert!(matches!(err, ChannelError::NoDataRead));
        assert_eq!(channel.get_ref().writes.len(), 3);
    }

    #[test]
    fn eof_mid_frame_is_connection_closed() {
        let transport = ScriptedTransport::new(vec![Ok(vec![5, 1, 2])]);
        let mut channel = ReliableChannel::new(transport, config(1)).unwrap();

        let err = channel.request(b"hello").unwrap_err();
        assert!(matches!(err, ChannelError::ConnectionClosed { buffered: 3 }));
    }

    #[test]
    fn last_error_wins() {
        // First attempt dies mid-frame, second sees an empty stream.
        let transport = ScriptedTransport::new(vec![Ok(vec![5, 1, 2])]);
        let mut channel = ReliableChannel::new(transport, config(2)).unwrap();

        let err = channel.request(b"hello").unwrap_err();
        assert!(matches!(err, ChannelError::NoDataRead));
    }

    #[test]
    fn interrupted_read_stays_in_attempt() {
        let transport = ScriptedTransport::new(vec![
            Err(io::Error::from(io::ErrorKind::Interrupted)),
            Err(io::Error::from(io::ErrorKind::WouldBlock)),
            Ok(wire(b"late")),
        ]);
        let mut channel = ReliableChannel::new(transport, config(1)).unwrap();

        assert_eq!(channel.request(b"x").unwrap().as_ref(), b"late");
        assert_eq!(channel.last_exchange_attempts(), 1);
    }

    #[test]
    fn read_error_fails_attempt() {
        let transport = ScriptedTransport::new(vec![
            Err(io::Error::from(io::ErrorKind::ConnectionReset)),
            Ok(wire(b"recovered")),
        ]);
        let mut channel = ReliableChannel::new(transport, config(2)).unwrap();

        assert_eq!(channel.request(b"x").unwrap().as_ref(), b"recovered");
        assert_eq!(channel.last_exchange_attempts(), 2);
    }

    #[test]
    fn never_delimited_stream_times_out_each_attempt() {
        let cfg = ChannelConfig {
            attempts: 2,
            retry_delay: Duration::from_millis(5),
            read_timeout: Duration::from_millis(30),
        };
        let mut channel = ReliableChannel::new(NeverDelimited, cfg).unwrap();

        let start = Instant::now();
        let err = channel.request(b"anyone?").unwrap_err();
        let elapsed = start.elapsed();

        assert!(matches!(err, ChannelError::Timeout(d) if d == Duration::from_millis(30)));
        assert!(elapsed >= Duration::from_millis(65), "elapsed {elapsed:?}");
        // Each attempt ends by read_timeout + retry_delay; allow 20 ms of scheduler slack.
        assert!(elapsed < Duration::from_millis(90), "elapsed {elapsed:?}");
    }

    #[test]
    fn response_completing_after_deadline_still_wins() {
        let transport = SlowResponder {
            delay: Duration::from_millis(40),
            response: Some(wire(b"just in time")),
        };
        let cfg = ChannelConfig {
            attempts: 1,
            read_timeout: Duration::from_millis(10),
            ..ChannelConfig::default()
        };
        let mut channel = ReliableChannel::new(transport, cfg).unwrap();

        assert_eq!(channel.request(b"?").unwrap().as_ref(), b"just in time");
    }

    #[test]
    fn oversized_response_is_rejected() {
        let transport = ScriptedTransport::new(vec![Ok(vec![0x11; 64])]);
        let codec = FrameCodec::with_max_payload(8);
        let mut channel = ReliableChannel::with_codec(transport, config(1), codec).unwrap();

        let err = channel.request(b"x").unwrap_err();
        assert!(matches!(
            err,
            ChannelError::Frame(FrameError::FrameTooLarge { .. })
        ));
    }

    #[test]
    fn invalid_config_rejected_up_front() {
        let cfg = ChannelConfig {
            attempts: 0,
            ..ChannelConfig::default()
        };
        let err = ReliableChannel::new(ScriptedTransport::new(Vec::new()), cfg).unwrap_err();
        assert!(matches!(err, ChannelError::InvalidConfig(_)));
    }

    #[test]
    fn request_respects_codec_payload_limit() {
        let codec = FrameCodec::with_max_payload(4);
        let mut channel =
            ReliableChannel::with_codec(ScriptedTransport::new(Vec::new()), config(3), codec)
                .unwrap();

        let err = channel.request(b"too long").unwrap_err();
        assert!(matches!(
            err,
            ChannelError::Frame(FrameError::PayloadTooLarge { .. })
        ));
        assert!(channel.get_ref().writes.is_empty());
    }
}
