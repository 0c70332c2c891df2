#![allow(unused)]

use bytes::Bytes;
use qbsdiff_async::{Config, DiffOutput, Host, HostError};
use rand::distributions::uniform::{SampleUniform, Uniform};
use rand::prelude::*;
use std::cell::RefCell;
use std::rc::Rc;

/// An in-memory sample: reference and current data.
pub struct Sample {
    pub name: String,
    pub reference: Vec<u8>,
    pub current: Vec<u8>,
}

/// Description of the reference of a random sample.
pub enum RandomReference {
    Bytes(&'static [u8]),
    Random(usize),
}

/// Description of a current version of a random sample.
pub enum RandomCurrent {
    Bytes(&'static [u8]),
    Distort(f64),
}

/// Default sample descriptions.
pub fn default_samples() -> Vec<(&'static str, RandomReference, Vec<RandomCurrent>)> {
    use RandomCurrent::{Bytes as CBytes, Distort};
    use RandomReference::{Bytes as RBytes, Random};

    vec![
        ("empty", RBytes(b""), vec![CBytes(b""), CBytes(b"extra")]),
        (
            "small",
            RBytes(
b"Lorem ipsum dolor sit amet, consectetur adipiscing elit, sed do eiusmod tempo\
r incididunt ut labore et dolore magna aliqua. Ut enim ad minim veniam, quis no\
strud exercitation ullamco laboris nisi ut aliquip ex ea commodo consequat. Dui\
s aute irure dolor in reprehenderit in voluptate velit esse cillum dolore eu fu\
giat nulla pariatur. Excepteur sint occaecat cupidatat non proident, sunt in cu\
lpa qui officia deserunt mollit anim id est laborum."
            ),
            vec![
                CBytes(b""),
                CBytes(
b"consectetur adip##cing elit, jed do eiusmod wir mussen wissen. wir werden wis\
sen/ laboris nisi ut al&^%ip ex ea coikodo consequat. "
                ),
                CBytes(b"the quick brown fox jumps over the lazy dog"),
                Distort(0.0),
                Distort(0.5),
                Distort(1.0),
            ],
        ),
        (
            "rand-4k",
            Random(4096),
            vec![CBytes(b""), Distort(0.0), Distort(0.5), Distort(1.0)],
        ),
        (
            "rand-64k",
            Random(64 * 1024),
            vec![Distort(0.0), Distort(0.5), Distort(1.0)],
        ),
    ]
}

/// Generate the samples described by `default_samples`.
pub fn samples() -> Vec<Sample> {
    let mut samples = Vec::new();
    for (name, reference, currents) in default_samples() {
        let reference = match reference {
            RandomReference::Bytes(b) => b.to_vec(),
            RandomReference::Random(n) => random_bytes(n),
        };
        for (i, current) in currents.into_iter().enumerate() {
            let current = match current {
                RandomCurrent::Bytes(b) => b.to_vec(),
                RandomCurrent::Distort(similar) => distort(&reference[..], similar),
            };
            samples.push(Sample {
                name: format!("{}/{}", name, i),
                reference: reference.clone(),
                current,
            });
        }
    }
    samples
}

/// A host with a small worker pool.
pub fn host() -> Host {
    Host::with_config(Config::new().workers(4)).unwrap()
}

/// Diff through `host` and wait for the callback.
pub fn diff_blocking(host: &Host, current: &[u8], reference: &[u8]) -> Result<DiffOutput, HostError> {
    let slot = Rc::new(RefCell::new(None));
    let sink = slot.clone();
    host.diff_with(
        Bytes::copy_from_slice(current),
        Bytes::copy_from_slice(reference),
        move |result| *sink.borrow_mut() = Some(result),
    );
    host.run();
    let result = slot.borrow_mut().take();
    result.expect("callback did not run")
}

/// Patch through `host` and wait for the callback.
pub fn patch_blocking(
    host: &Host,
    length: usize,
    reference: &[u8],
    delta: &DiffOutput,
) -> Result<Bytes, HostError> {
    let slot = Rc::new(RefCell::new(None));
    let sink = slot.clone();
    host.patch_with(
        length,
        Bytes::copy_from_slice(reference),
        delta.control.clone(),
        delta.diff.clone(),
        delta.extra.clone(),
        move |result| *sink.borrow_mut() = Some(result),
    );
    host.run();
    let result = slot.borrow_mut().take();
    result.expect("callback did not run")
}

pub fn random_bytes(n: usize) -> Vec<u8> {
    let mut rng = thread_rng();
    let mut bytes = vec![0; n];
    rng.fill_bytes(&mut bytes[..]);
    bytes
}

/// Produce data similar to `source` (`similar` in `[0, 1]`).
pub fn distort(source: &[u8], similar: f64) -> Vec<u8> {
    let similar = fraction(similar);
    let rate = convex_mapping(similar);

    let tsize = random_between(
        (source.len() as f64 * 0.75) as usize,
        (source.len() as f64 * 1.25) as usize,
    );
    let dmax = random_between(
        Ord::min(16, (source.len() as f64 * 0.02) as usize),
        Ord::max(32, (source.len() as f64 * 0.33) as usize),
    );
    let emax = random_between(0, (source.len() as f64 * 0.15 * (1.0 - similar)) as usize);

    let mut target = Vec::with_capacity(tsize);
    let mut rng = thread_rng();
    while target.len() < tsize {
        // delta
        let remain = tsize - target.len();
        let dsize = {
            let dhi = Ord::min(Ord::min(dmax, remain), source.len());
            let dlo = Ord::min(16, dhi);
            random_between(dlo, dhi)
        };
        let offset = random_between(0, source.len() - dsize);
        for &x in source[offset..offset + dsize].iter() {
            if random_decide(rate) {
                target.push(x);
            } else {
                target.push(rng.gen());
            }
        }

        // extra
        let remain = tsize - target.len();
        if !random_decide(rate) {
            let esize = random_between(0, Ord::min(emax, remain));
            for _ in 0..esize {
                target.push(rng.gen());
            }
        }
    }

    target
}

fn random_decide(rate: f64) -> bool {
    random_between(0.0, 1.0) <= fraction(rate)
}

fn random_between<X: SampleUniform>(lo: X, hi: X) -> X {
    let mut rng = thread_rng();
    Uniform::new_inclusive(lo, hi).sample(&mut rng)
}

fn fraction(x: f64) -> f64 {
    if x.is_nan() || x.is_sign_negative() {
        0.0
    } else if x.is_infinite() || x > 1.0 {
        1.0
    } else {
        x
    }
}

fn convex_mapping(frac: f64) -> f64 {
    (1.0 - (1.0 - frac) * (1.0 - frac)).sqrt()
}
