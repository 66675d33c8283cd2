use std::io::{BufRead, Write};

use anyhow::Context as _;
use masked_cmp::{Command, Context, Error, ProtocolVersion, check_protocol};
use rand::CryptoRng;
use tracing::{debug, info, warn};

/// Status byte returned for a command that failed
pub const FAILURE: u8 = 0x01;

/// Status byte returned for a command byte that names no command
pub const UNKNOWN_COMMAND: u8 = 0xff;

/// Answer every command byte on `input` with one status byte on `output`, until `input` ends.
///
/// Line breaks between commands are skipped. An unexpected "equal" comparison ends the loop with
/// an error, after its status byte has been written.
pub fn serve<R: CryptoRng>(
    ctx: &mut Context<R>,
    protocol: ProtocolVersion,
    input: impl BufRead,
    mut output: impl Write,
) -> anyhow::Result<usize> {
    check_protocol(protocol).context("refusing to serve")?;
    info!(%protocol, "serving");

    let mut served = 0;
    for byte in input.bytes() {
        let byte = byte.context("failed to read command")?;
        if byte == b'\n' || byte == b'\r' {
            continue;
        }

        let (status, fatal) = match Command::try_from(byte) {
            Ok(command) => {
                debug!(?command, "dispatch");
                match ctx.dispatch(command, &[]) {
                    Ok(status) => (status, None),
                    Err(err) => (FAILURE, Some(err)),
                }
            }
            Err(Error::UnknownCommand(code)) => {
                warn!(code, "unknown command");
                (UNKNOWN_COMMAND, None)
            }
            Err(err) => return Err(err.into()),
        };

        output.write_all(&[status])?;
        output.flush()?;
        served += 1;

        if let Some(err) = fatal {
            return Err(err).context("masking correctness violated");
        }
    }

    Ok(served)
}

#[cfg(test)]
mod tests {
    use super::*;
    use masked_cmp::{PROTOCOL_VERSION, SABER, Verification};
    use rand::{SeedableRng, rngs::StdRng};

    fn context() -> Context<StdRng> {
        let mut params = SABER.with_shares(2);
        params.b.ncoeffs = 32;
        params.c.ncoeffs = 32;
        Context::new(params, StdRng::seed_from_u64(2), Verification::Enabled).unwrap()
    }

    #[test]
    fn answers_each_command() {
        let mut ctx = context();
        let mut output = Vec::new();

        let served = serve(&mut ctx, PROTOCOL_VERSION, &b"xnc\nfc\n?"[..], &mut output).unwrap();
        assert_eq!(served, 6);
        assert_eq!(output, [0, 0, 0, 0, 0, UNKNOWN_COMMAND]);
    }

    #[test]
    fn unexpected_equal_is_fatal() {
        let mut ctx = context();
        let mut output = Vec::new();

        // comparing freshly reset buffers finds them equal
        let err = serve(&mut ctx, PROTOCOL_VERSION, &b"xcx"[..], &mut output).unwrap_err();
        assert_eq!(err.root_cause().to_string(), Error::UnexpectedEqual.to_string());
        assert_eq!(output, [0, FAILURE]);
    }

    #[test]
    fn wrong_protocol_is_refused() {
        let mut ctx = context();
        let old = ProtocolVersion { major: 1, minor: 1 };
        assert!(serve(&mut ctx, old, &b"x"[..], Vec::new()).is_err());
    }
}
