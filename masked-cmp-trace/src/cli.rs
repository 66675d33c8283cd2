use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use masked_cmp::{
    DEFAULT_SHARES, FIRE_SABER, KYBER_512, KYBER_768, KYBER_1024, LIGHT_SABER, PROTOCOL_VERSION,
    Params, ProtocolVersion, SABER, Verification,
};

#[derive(Parser)]
#[command(version, about, name = "masked-cmp-trace", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
    /// Parameter set.
    #[arg(long, default_value = "kyber768")]
    pub params: ParamSet,
    /// Number of arithmetic shares per coefficient.
    #[arg(long, default_value_t = DEFAULT_SHARES)]
    pub shares: usize,
    /// Re-check the masking invariants after every coefficient. Reconstructs secrets, so
    /// never use it while capturing traces.
    #[arg(long)]
    pub verify: bool,
    /// Seed for a reproducible run. Defaults to OS randomness.
    #[arg(long, env = "MASKED_CMP_SEED")]
    pub seed: Option<u64>,
}

impl Cli {
    pub fn params(&self) -> Params {
        self.params.params().with_shares(self.shares)
    }

    pub fn verification(&self) -> Verification {
        if self.verify {
            Verification::Enabled
        } else {
            Verification::Disabled
        }
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// writes the bitsliced comparator input of both scenarios for every trial.
    Dump {
        /// Output path.
        #[arg(short, long, default_value = "BC_Bitsliced-dump.bin")]
        output: PathBuf,
        /// Number of trials. Each trial writes two blocks.
        #[arg(short, long, default_value = "5000")]
        trials: usize,
    },
    /// answers single-byte commands read from stdin with status bytes on stdout.
    Serve {
        /// Command framing version spoken by the host.
        #[arg(long, default_value_t = PROTOCOL_VERSION)]
        protocol: ProtocolVersion,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ParamSet {
    Kyber512,
    Kyber768,
    Kyber1024,
    LightSaber,
    Saber,
    FireSaber,
}

impl ParamSet {
    pub fn params(self) -> Params {
        match self {
            Self::Kyber512 => KYBER_512,
            Self::Kyber768 => KYBER_768,
            Self::Kyber1024 => KYBER_1024,
            Self::LightSaber => LIGHT_SABER,
            Self::Saber => SABER,
            Self::FireSaber => FIRE_SABER,
        }
    }
}
