use masked_cmp::*;

use rand::{CryptoRng, RngCore, SeedableRng, rngs::StdRng};
use std::{cell::RefCell, rc::Rc};

/// Which generator method was called, in call order
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Call {
    U32,
    U64,
    Bytes(usize),
}

/// Records every call made to the wrapped generator.
struct RecordingRng {
    inner: StdRng,
    calls: Rc<RefCell<Vec<Call>>>,
}

impl RngCore for RecordingRng {
    fn next_u32(&mut self) -> u32 {
        self.calls.borrow_mut().push(Call::U32);
        self.inner.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.calls.borrow_mut().push(Call::U64);
        self.inner.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.calls.borrow_mut().push(Call::Bytes(dest.len()));
        self.inner.fill_bytes(dest);
    }
}

impl CryptoRng for RecordingRng {}

fn toy(params: Params, nshares: usize) -> Params {
    let mut params = params.with_shares(nshares);
    params.b.ncoeffs = 64;
    params.c.ncoeffs = 32;
    params
}

fn never_equal(params: Params, trials: usize, seed: u64) {
    let mut ctx = Context::new(params, StdRng::seed_from_u64(seed), Verification::Disabled).unwrap();

    for trial in 0..trials {
        for scenario in [Scenario::NoDecryptionFailure, Scenario::DecryptionFailure] {
            ctx.prepare(scenario);
            assert_eq!(
                ctx.compare(),
                Comparison::NotEqual,
                "trial {trial}, {scenario:?}"
            );
        }
    }
}

#[test]
fn kyber_never_compares_equal() {
    for nshares in [1, 2, 4] {
        never_equal(toy(KYBER_768, nshares), 500, nshares as u64);
    }
}

#[test]
fn saber_never_compares_equal() {
    for nshares in [1, 2, 4] {
        never_equal(toy(SABER, nshares), 500, 10 + nshares as u64);
    }
}

#[test]
fn full_size_presets() {
    for (i, params) in [KYBER_512, KYBER_768, KYBER_1024, LIGHT_SABER, SABER, FIRE_SABER]
        .into_iter()
        .enumerate()
    {
        let mut ctx =
            Context::new(params, StdRng::seed_from_u64(20 + i as u64), Verification::Enabled)
                .unwrap();
        ctx.prepare_no_decryption_failure();
        ctx.run_comparison().unwrap();
        ctx.prepare_decryption_failure();
        ctx.run_comparison().unwrap();
    }
}

#[test]
fn scenarios_consume_identical_randomness() {
    for params in [toy(KYBER_768, 3), toy(FIRE_SABER, 3)] {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let rng = RecordingRng {
            inner: StdRng::seed_from_u64(30),
            calls: Rc::clone(&calls),
        };
        let mut ctx = Context::new(params, rng, Verification::Disabled).unwrap();

        let mut run = |scenario| {
            calls.borrow_mut().clear();
            ctx.prepare(scenario);
            ctx.run_comparison().unwrap();
            (ctx.op_counts(), calls.borrow().clone())
        };

        let (counts, trace) = run(Scenario::NoDecryptionFailure);
        let (failure_counts, failure_trace) = run(Scenario::DecryptionFailure);

        assert_eq!(counts, failure_counts);
        assert_eq!(trace, failure_trace);
        assert_eq!(trace.len() as u64, counts.prepare_draws + counts.compare_draws);
        assert!(counts.compare_draws > 0);
    }
}

#[test]
fn dispatch_drives_both_scenarios() {
    let mut ctx = Context::new(toy(LIGHT_SABER, 4), StdRng::seed_from_u64(40), Verification::Enabled)
        .unwrap();

    for code in b"xncfcnc".iter().copied() {
        let status = ctx.dispatch(Command::try_from(code).unwrap(), &[]).unwrap();
        assert_eq!(status, 0);
    }
    assert_eq!(Command::try_from(b'?'), Err(Error::UnknownCommand(b'?')));
}

#[test]
fn reset_clears_state() {
    let mut ctx = Context::new(toy(KYBER_512, 4), StdRng::seed_from_u64(50), Verification::Disabled)
        .unwrap();
    ctx.prepare_decryption_failure();
    ctx.compare();
    ctx.reset();

    assert!(ctx.b().as_slice().iter().all(|&x| x == 0));
    assert!(ctx.c().as_slice().iter().all(|&x| x == 0));
    assert!(ctx.public_b().iter().all(|&x| x == 0));
    assert!(ctx.public_c().iter().all(|&x| x == 0));
    assert!(ctx.comparator().combined().as_slice().iter().all(|&x| x == 0));
}
