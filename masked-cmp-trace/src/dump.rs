use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::Path,
};

use anyhow::Context as _;
use masked_cmp::{Context, Scenario};
use rand::CryptoRng;
use tracing::{Level, debug, info};

/// Writer for the trace dump format: one native-endian `u32` header giving the size of a block
/// in bytes, followed by blocks of native-endian `u32` words with no separators.
pub struct TraceWriter<W: Write> {
    out: W,
    block_words: usize,
    blocks: usize,
}

impl<W: Write> TraceWriter<W> {
    pub fn new(mut out: W, block_words: usize) -> io::Result<Self> {
        let header = block_words
            .checked_mul(4)
            .and_then(|bytes| u32::try_from(bytes).ok())
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "block too large"))?;
        out.write_all(&header.to_ne_bytes())?;

        Ok(Self {
            out,
            block_words,
            blocks: 0,
        })
    }

    pub fn write_block(&mut self, words: &[u32]) -> io::Result<()> {
        if words.len() != self.block_words {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("expected {} words, got {}", self.block_words, words.len()),
            ));
        }

        for word in words {
            self.out.write_all(&word.to_ne_bytes())?;
        }
        self.blocks += 1;
        Ok(())
    }

    pub fn blocks(&self) -> usize {
        self.blocks
    }

    pub fn finish(mut self) -> io::Result<W> {
        self.out.flush()?;
        Ok(self.out)
    }
}

/// Run `trials` trials, each one scenario without and one with decryption failure, and write
/// the comparator's bitsliced input after every comparison.
pub fn record<R: CryptoRng, W: Write>(
    ctx: &mut Context<R>,
    writer: &mut TraceWriter<W>,
    trials: usize,
) -> anyhow::Result<()> {
    for trial in 0..trials {
        for scenario in [Scenario::NoDecryptionFailure, Scenario::DecryptionFailure] {
            ctx.prepare(scenario);

            if tracing::enabled!(Level::DEBUG) {
                let differing = ctx.unmasked_difference().iter().filter(|&&d| d != 0).count();
                debug!(trial, ?scenario, differing, "prepared");
            }

            ctx.run_comparison()
                .with_context(|| format!("trial {trial}, {scenario:?}"))?;
            writer
                .write_block(ctx.comparator().combined().as_slice())
                .context("failed to write trace block")?;
        }

        if (trial + 1) % 1000 == 0 {
            info!(trials = trial + 1, "progress");
        }
    }

    Ok(())
}

pub fn run<R: CryptoRng>(ctx: &mut Context<R>, output: &Path, trials: usize) -> anyhow::Result<()> {
    let file = File::create(output)
        .with_context(|| format!("failed to open file: {}", output.display()))?;

    let params = ctx.params();
    let block_words = params.combined_planes() * params.nshares;
    let mut writer = TraceWriter::new(BufWriter::new(file), block_words)
        .context("failed to write header")?;

    record(ctx, &mut writer, trials)?;

    let blocks = writer.blocks();
    writer.finish().context("failed to flush trace file")?;
    info!(path = %output.display(), blocks, block_words, "trace dump written");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use masked_cmp::{KYBER_512, Verification};
    use rand::{SeedableRng, rngs::StdRng};

    fn words(bytes: &[u8]) -> Vec<u32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| u32::from_ne_bytes(chunk.try_into().unwrap()))
            .collect()
    }

    #[test]
    fn header_and_blocks() {
        let mut writer = TraceWriter::new(Vec::new(), 3).unwrap();
        writer.write_block(&[1, 2, 3]).unwrap();
        writer.write_block(&[4, 5, 6]).unwrap();
        assert!(writer.write_block(&[7]).is_err());

        let bytes = writer.finish().unwrap();
        assert_eq!(words(&bytes), [12, 1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn records_two_blocks_per_trial() {
        let mut params = KYBER_512.with_shares(2);
        params.b.ncoeffs = 64;
        params.c.ncoeffs = 32;
        let mut ctx =
            Context::new(params, StdRng::seed_from_u64(1), Verification::Enabled).unwrap();

        let block_words = params.combined_planes() * params.nshares;
        let mut writer = TraceWriter::new(Vec::new(), block_words).unwrap();
        record(&mut ctx, &mut writer, 3).unwrap();
        assert_eq!(writer.blocks(), 6);

        let bytes = writer.finish().unwrap();
        let words = words(&bytes);
        assert_eq!(words[0] as usize, block_words * 4);
        assert_eq!(words.len(), 1 + 6 * block_words);
        // the last block is the comparator state left in the context
        assert_eq!(
            &words[1 + 5 * block_words..],
            ctx.comparator().combined().as_slice()
        );
    }
}
