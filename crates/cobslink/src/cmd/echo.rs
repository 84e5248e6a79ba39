use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use cobslink_channel::{ChannelError, Responder};
use cobslink_frame::FrameError;
use cobslink_transport::{LinkAddr, LinkListener};
use tracing::{info, warn};

use crate::cmd::EchoArgs;
use crate::exit::{channel_error, transport_error, CliError, CliResult, FAILURE, INTERNAL, SUCCESS};
use crate::output::OutputFormat;

pub fn run(args: EchoArgs, _format: OutputFormat) -> CliResult<i32> {
    let addr: LinkAddr = args
        .addr
        .parse()
        .map_err(|err| transport_error("invalid address", err))?;
    let listener = LinkListener::bind(&addr).map_err(|err| transport_error("bind failed", err))?;
    let bound = listener
        .local_addr()
        .map_err(|err| transport_error("bind failed", err))?;
    info!(addr = %bound, "echo responder ready");

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut served = 0u64;
    while running.load(Ordering::SeqCst) {
        let stream = listener
            .accept()
            .map_err(|err| transport_error("accept failed", err))?;
        let mut responder = Responder::new(stream);

        while running.load(Ordering::SeqCst) {
            let result = responder.serve_one(|request| {
                info!(size = request.len(), "echoing request");
                request.to_vec()
            });
            match result {
                Ok(()) => {
                    served += 1;
                    if args.count.is_some_and(|limit| served >= limit) {
                        info!(served, "request limit reached");
                        return Ok(SUCCESS);
                    }
                }
                Err(ChannelError::Frame(FrameError::ConnectionClosed)) => {
                    info!("peer disconnected");
                    break;
                }
                Err(ChannelError::Frame(err)) if err.is_integrity() => {
                    warn!(error = %err, "dropping corrupt request");
                }
                Err(err) => return Err(channel_error("echo failed", err)),
            }
        }
    }

    Ok(SUCCESS)
}

/// First Ctrl-C stops after the current exchange; a second one exits
/// immediately (the accept loop may be blocked).
fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        if !running.swap(false, Ordering::SeqCst) {
            std::process::exit(FAILURE);
        }
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
