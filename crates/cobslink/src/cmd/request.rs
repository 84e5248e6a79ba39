use std::time::Duration;

use cobslink_channel::{ChannelConfig, ReliableChannel};
use cobslink_transport::{LinkAddr, LinkStream};
use tracing::info;

use crate::cmd::RequestArgs;
use crate::exit::{channel_error, transport_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_reports, BytesReport, OutputFormat};

pub fn run(args: RequestArgs, format: OutputFormat) -> CliResult<i32> {
    let addr: LinkAddr = args
        .addr
        .parse()
        .map_err(|err| transport_error("invalid address", err))?;
    let config = resolve_config(&args)?;
    let payload = args.payload.resolve()?;

    let stream = LinkStream::connect(&addr).map_err(|err| transport_error("connect failed", err))?;
    stream
        .set_write_timeout(Some(config.read_timeout))
        .map_err(|err| transport_error("connect failed", err))?;

    let mut channel =
        ReliableChannel::new(stream, config).map_err(|err| channel_error("invalid config", err))?;
    let response = channel
        .request(&payload)
        .map_err(|err| channel_error("request failed", err))?;
    let attempts = channel.last_exchange_attempts();
    info!(%addr, attempts, size = response.len(), "response received");

    print_reports(
        &[BytesReport::new("response", &response).with_attempts(attempts)],
        format,
    );
    Ok(SUCCESS)
}

/// Config file values first, then explicit flags on top.
fn resolve_config(args: &RequestArgs) -> CliResult<ChannelConfig> {
    let mut config = match &args.config {
        Some(path) => {
            ChannelConfig::load(path).map_err(|err| channel_error("config load failed", err))?
        }
        None => ChannelConfig::default(),
    };
    if let Some(attempts) = args.attempts {
        config.attempts = attempts;
    }
    if let Some(delay) = &args.retry_delay {
        config.retry_delay = parse_duration(delay)?;
    }
    if let Some(timeout) = &args.read_timeout {
        config.read_timeout = parse_duration(timeout)?;
    }
    config
        .validate()
        .map_err(|err| channel_error("invalid config", err))?;
    Ok(config)
}

/// Parse `150ms`, `2s`, `1m`; a bare number is milliseconds.
fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    let (digits, scale_ms) = [("ms", 1), ("s", 1_000), ("m", 60_000)]
        .into_iter()
        .find_map(|(suffix, scale)| input.strip_suffix(suffix).map(|num| (num, scale)))
        .unwrap_or((input, 1));

    let value: u64 = digits
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration: {input:?}")))?;
    value
        .checked_mul(scale_ms)
        .map(Duration::from_millis)
        .ok_or_else(|| CliError::new(USAGE, format!("duration out of range: {input}")))
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::cmd::PayloadArgs;

    fn base_args() -> RequestArgs {
        RequestArgs {
            addr: "tcp:127.0.0.1:9".into(),
            payload: PayloadArgs {
                data: Some("x".into()),
                hex: None,
                file: None,
            },
            attempts: None,
            retry_delay: None,
            read_timeout: None,
            config: None,
        }
    }

    #[test]
    fn parse_duration_units() {
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("1m").unwrap(), Duration::from_secs(60));
        assert_eq!(parse_duration("40").unwrap(), Duration::from_millis(40));
        assert_eq!(parse_duration("0ms").unwrap(), Duration::ZERO);
    }

    #[test]
    fn parse_duration_rejects_garbage() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("fast").is_err());
        assert!(parse_duration("-1s").is_err());
        assert!(parse_duration("1h").is_err());
    }

    #[test]
    fn flags_override_defaults() {
        let mut args = base_args();
        args.attempts = Some(7);
        args.read_timeout = Some("250ms".into());

        let config = resolve_config(&args).unwrap();
        assert_eq!(config.attempts, 7);
        assert_eq!(config.read_timeout, Duration::from_millis(250));
        assert_eq!(config.retry_delay, ChannelConfig::default().retry_delay);
    }

    #[test]
    fn flags_override_config_file() {
        let path = std::env::temp_dir().join(format!("cobslink-cfg-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"attempts": 9, "retry_delay_ms": 30}"#).unwrap();

        let mut args = base_args();
        args.config = Some(path.clone());
        args.attempts = Some(2);
        let config = resolve_config(&args).unwrap();
        assert_eq!(config.attempts, 2);
        assert_eq!(config.retry_delay, Duration::from_millis(30));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn zero_timeout_is_usage_error() {
        let mut args = base_args();
        args.read_timeout = Some("0ms".into());
        assert_eq!(resolve_config(&args).unwrap_err().code, USAGE);

        let mut args = base_args();
        args.config = Some(PathBuf::from("/nonexistent/cobslink.json"));
        assert_eq!(resolve_config(&args).unwrap_err().code, USAGE);
    }
}
