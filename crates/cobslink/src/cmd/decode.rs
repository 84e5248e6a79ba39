use cobslink_frame::{CachedFrameCodec, DELIMITER};
use tracing::debug;

use crate::cmd::{parse_hex, DecodeArgs};
use crate::exit::{frame_error, CliResult, SUCCESS};
use crate::output::{print_reports, BytesReport, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let mut wire = Vec::new();
    for text in &args.frames {
        let mut bytes = parse_hex(text)?;
        if bytes.last() != Some(&DELIMITER) {
            bytes.push(DELIMITER);
        }
        wire.extend_from_slice(&bytes);
    }

    // Captures often repeat the same frame; decode each distinct one once.
    let mut codec = CachedFrameCodec::new();
    let mut payloads = Vec::new();
    for stuffed in split_frames(&wire) {
        let payload = codec
            .decode_frame(stuffed)
            .map_err(|err| frame_error("decode failed", err))?;
        payloads.push(payload);
    }
    debug!(
        frames = payloads.len(),
        distinct = codec.len(),
        "decoded capture"
    );

    let reports: Vec<_> = payloads
        .iter()
        .map(|payload| BytesReport::new("payload", payload))
        .collect();
    print_reports(&reports, format);
    Ok(SUCCESS)
}

/// Stuffed frames in a delimiter-terminated byte stream, without their
/// delimiters.
fn split_frames(wire: &[u8]) -> impl Iterator<Item = &[u8]> {
    wire.split_inclusive(|&b| b == DELIMITER)
        .map(|frame| &frame[..frame.len() - 1])
}
