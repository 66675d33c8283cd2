//! Single-byte commands, as sent by a capture host.

use core::fmt;
use core::str::FromStr;
use rand_core::CryptoRng;
use zeroize::Zeroize;

use crate::compare::MaskedComparator;
use crate::context::{Context, Scenario};
use crate::error::{Error, Result};

/// Version of the command framing spoken by a host
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProtocolVersion {
    /// Major version
    pub major: u8,
    /// Minor version
    pub minor: u8,
}

/// The only framing version accepted
pub const PROTOCOL_VERSION: ProtocolVersion = ProtocolVersion { major: 2, minor: 1 };

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for ProtocolVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (major, minor) = s.split_once('.').ok_or(Error::MalformedVersion)?;
        Ok(Self {
            major: major.parse().map_err(|_| Error::MalformedVersion)?,
            minor: minor.parse().map_err(|_| Error::MalformedVersion)?,
        })
    }
}

/// Refuse to serve a host speaking anything but [`PROTOCOL_VERSION`].
///
/// # Errors
///
/// Returns [`Error::ProtocolVersion`] on mismatch.
pub fn check_protocol(found: ProtocolVersion) -> Result<()> {
    if found == PROTOCOL_VERSION {
        Ok(())
    } else {
        Err(Error::ProtocolVersion {
            expected: PROTOCOL_VERSION,
            found,
        })
    }
}

/// A command understood by [`Context::dispatch`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Command {
    /// `x`: zero every buffer
    Reset,
    /// `n`: prepare a trial without decryption failure
    PrepareNoDecryptionFailure,
    /// `f`: prepare a trial with decryption failure
    PrepareDecryptionFailure,
    /// `c`: run the masked comparison, which must report a difference
    Compare,
}

impl Command {
    /// Every command, in wire order
    pub const ALL: [Self; 4] = [
        Self::Reset,
        Self::PrepareNoDecryptionFailure,
        Self::PrepareDecryptionFailure,
        Self::Compare,
    ];

    /// The command byte
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Reset => b'x',
            Self::PrepareNoDecryptionFailure => b'n',
            Self::PrepareDecryptionFailure => b'f',
            Self::Compare => b'c',
        }
    }
}

impl TryFrom<u8> for Command {
    type Error = Error;

    fn try_from(code: u8) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|command| command.code() == code)
            .ok_or(Error::UnknownCommand(code))
    }
}

impl<R: CryptoRng, M: MaskedComparator + Zeroize> Context<R, M> {
    /// Execute one command and return its status byte, 0 on success.
    ///
    /// The payload is accepted for framing compatibility and ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnexpectedEqual`] if [`Command::Compare`] finds the ciphertexts equal.
    pub fn dispatch(&mut self, command: Command, _payload: &[u8]) -> Result<u8> {
        match command {
            Command::Reset => self.reset(),
            Command::PrepareNoDecryptionFailure => self.prepare(Scenario::NoDecryptionFailure),
            Command::PrepareDecryptionFailure => self.prepare(Scenario::DecryptionFailure),
            Command::Compare => self.run_comparison()?,
        }
        Ok(0)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::param::LIGHT_SABER;
    use crate::shares::Verification;
    use alloc::string::ToString;
    use rand::{SeedableRng, rngs::StdRng};

    #[test]
    fn command_codes() {
        for command in Command::ALL {
            assert_eq!(Command::try_from(command.code()), Ok(command));
        }
        assert_eq!(Command::try_from(b'c'), Ok(Command::Compare));
        assert_eq!(Command::try_from(b'z'), Err(Error::UnknownCommand(b'z')));
    }

    #[test]
    fn protocol_version() {
        assert_eq!("2.1".parse::<ProtocolVersion>(), Ok(PROTOCOL_VERSION));
        assert_eq!(PROTOCOL_VERSION.to_string(), "2.1");
        assert!(check_protocol(PROTOCOL_VERSION).is_ok());

        let old: ProtocolVersion = "1.1".parse().unwrap();
        assert_eq!(
            check_protocol(old),
            Err(Error::ProtocolVersion {
                expected: PROTOCOL_VERSION,
                found: old
            })
        );

        for bad in ["2", "2.x", "", "300.1"] {
            assert_eq!(bad.parse::<ProtocolVersion>(), Err(Error::MalformedVersion));
        }
    }

    #[test]
    fn dispatch_sequence() {
        let mut params = LIGHT_SABER.with_shares(2);
        params.b.ncoeffs = 32;
        params.c.ncoeffs = 32;
        let mut ctx =
            Context::new(params, StdRng::seed_from_u64(70), Verification::Enabled).unwrap();

        for code in *b"xncfc" {
            let command = Command::try_from(code).unwrap();
            assert_eq!(ctx.dispatch(command, &[]), Ok(0));
        }

        // after a reset both sides are zero and compare equal
        ctx.dispatch(Command::Reset, &[]).unwrap();
        assert_eq!(
            ctx.dispatch(Command::Compare, &[]),
            Err(Error::UnexpectedEqual)
        );
    }
}
