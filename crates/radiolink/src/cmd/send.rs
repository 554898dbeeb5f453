use std::sync::Arc;

use bytes::Bytes;
use radiolink_link::{LinkAdaptor, SendOutcome, SubscriberId};

use crate::cmd::{parse_duration, SendArgs};
use crate::exit::{link_error, CliError, CliResult, DATA_INVALID, FAILURE, SUCCESS, TIMEOUT, USAGE};
use crate::output::{print_sent, OutputFormat, SendOutput};
use crate::sink::{LogSink, CLI_SUBSCRIBER};

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let payload = resolve_payload(&args)?;
    let timeout = parse_duration(&args.timeout)?;
    let link_config = args.link.link_config()?;
    let serial_config = args.link.serial_config();

    let adaptor = LinkAdaptor::new(Arc::new(LogSink));
    adaptor
        .configure_serial(link_config, &serial_config)
        .map_err(|err| link_error("configure failed", err))?;

    let subscriber = SubscriberId::from(CLI_SUBSCRIBER);
    let payload_size = payload.len();
    let receipt = adaptor
        .submit_outbound_payload(&subscriber, Some(payload))
        .map_err(|err| link_error("send failed", err))?;

    let outcome = receipt.wait(timeout);
    adaptor.stop();

    match outcome {
        None => Err(CliError::new(
            TIMEOUT,
            format!("send timed out after {}", args.timeout),
        )),
        Some(Err(err)) => Err(link_error("send failed", err)),
        Some(Ok(SendOutcome::Skipped)) => Err(CliError::new(
            FAILURE,
            "send failed: link stopped before the payload was written",
        )),
        Some(Ok(SendOutcome::Written)) => {
            print_sent(
                &SendOutput {
                    port: serial_config.port,
                    subscriber: subscriber.to_string(),
                    payload_size,
                    status: "written",
                },
                format,
            );
            Ok(SUCCESS)
        }
    }
}

fn resolve_payload(args: &SendArgs) -> CliResult<Bytes> {
    let bytes = if let Some(hex) = &args.hex {
        let compact: String = hex.chars().filter(|c| !c.is_whitespace()).collect();
        hex::decode(compact)
            .map_err(|err| CliError::new(USAGE, format!("--hex is not valid hex: {err}")))?
    } else if let Some(data) = &args.data {
        data.as_bytes().to_vec()
    } else {
        Vec::new()
    };

    if bytes.is_empty() {
        return Err(CliError::new(DATA_INVALID, "payload must not be empty"));
    }
    Ok(Bytes::from(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmd::LinkArgs;
    use radiolink_frame::{BandwidthPreset, RadioVariant};
    use radiolink_link::Role;

    fn args(data: Option<&str>, hex: Option<&str>) -> SendArgs {
        SendArgs {
            link: LinkArgs {
                port: "/dev/null".to_string(),
                baud: 19200,
                variant: RadioVariant::A,
                role: Role::Master,
                bandwidth: BandwidthPreset::Standard,
                settle: "2s".to_string(),
                interval: "2s".to_string(),
            },
            data: data.map(str::to_string),
            hex: hex.map(str::to_string),
            timeout: "5s".to_string(),
        }
    }

    #[test]
    fn text_payload_is_used_verbatim() {
        let payload = resolve_payload(&args(Some("hello"), None)).unwrap();
        assert_eq!(payload, Bytes::from_static(b"hello"));
    }

    #[test]
    fn hex_payload_ignores_whitespace() {
        let payload = resolve_payload(&args(None, Some("de ad be ef"))).unwrap();
        assert_eq!(payload, Bytes::from_static(&[0xde, 0xad, 0xbe, 0xef]));
    }

    #[test]
    fn invalid_hex_is_usage_error() {
        let err = resolve_payload(&args(None, Some("xyz"))).unwrap_err();
        assert_eq!(err.code, USAGE);
    }

    #[test]
    fn empty_payload_is_invalid_data() {
        let err = resolve_payload(&args(Some(""), None)).unwrap_err();
        assert_eq!(err.code, DATA_INVALID);
    }
}
