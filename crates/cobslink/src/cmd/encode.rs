use cobslink_frame::FrameCodec;
use tracing::debug;

use crate::cmd::EncodeArgs;
use crate::exit::{frame_error, CliResult, SUCCESS};
use crate::output::{print_reports, BytesReport, OutputFormat};

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let payload = args.payload.resolve()?;
    let mut codec = FrameCodec::new();
    let wire = codec
        .encode_wire(&payload)
        .map_err(|err| frame_error("encode failed", err))?;
    debug!(payload = payload.len(), wire = wire.len(), "encoded frame");

    print_reports(&[BytesReport::new("wire", wire)], format);
    Ok(SUCCESS)
}
