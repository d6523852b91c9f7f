//! Deterministic randomness: a master stream seeded from the scenario seed
//! derives one named substream per engine system, so reordering or adding
//! systems does not silently reshuffle every stochastic rule in the model.

use std::collections::BTreeMap;

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

pub struct RngManager {
    master: ChaCha8Rng,
    streams: BTreeMap<String, ChaCha8Rng>,
}

impl RngManager {
    pub fn new(seed: u64) -> Self {
        Self {
            master: ChaCha8Rng::seed_from_u64(seed),
            streams: BTreeMap::new(),
        }
    }

    /// Borrow the stream for the named system, creating it on first use.
    /// Stream identity is the name alone; the same name always yields the
    /// same sequence for a given master seed and creation order.
    pub fn stream(&mut self, name: &str) -> SystemRng<'_> {
        if !self.streams.contains_key(name) {
            let derived = self.master.next_u64() ^ fingerprint(name);
            self.streams
                .insert(name.to_string(), ChaCha8Rng::seed_from_u64(derived));
        }
        let inner = self
            .streams
            .get_mut(name)
            .unwrap_or_else(|| unreachable!("stream inserted above"));
        SystemRng { inner }
    }
}

// FNV-1a over the stream name, mixed into the master draw so that two systems
// registered in swapped order still get distinct seeds.
fn fingerprint(name: &str) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in name.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

pub struct SystemRng<'a> {
    inner: &'a mut ChaCha8Rng,
}

impl<'a> RngCore for SystemRng<'a> {
    fn next_u32(&mut self) -> u32 {
        self.inner.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.inner.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.inner.fill_bytes(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.inner.try_fill_bytes(dest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn same_seed_same_sequence() {
        let mut a = RngManager::new(42);
        let mut b = RngManager::new(42);
        let xs: Vec<u64> = (0..4).map(|_| a.stream("bees").next_u64()).collect();
        let ys: Vec<u64> = (0..4).map(|_| b.stream("bees").next_u64()).collect();
        assert_eq!(xs, ys);
    }

    #[test]
    fn named_streams_are_independent() {
        let mut mgr = RngManager::new(7);
        let x: f64 = mgr.stream("weather").gen();
        let y: f64 = mgr.stream("bees").gen();
        assert_ne!(x, y);
        // Interleaving another stream must not disturb an existing one.
        let mut reference = RngManager::new(7);
        let _: f64 = reference.stream("weather").gen();
        let expected: f64 = {
            let _ignored: f64 = reference.stream("bees").gen();
            reference.stream("weather").gen()
        };
        let _: f64 = mgr.stream("landscape").gen();
        let actual: f64 = mgr.stream("weather").gen();
        // Streams created later draw fresh master seeds, so "weather" keeps
        // its own sequence regardless.
        assert_eq!(actual, expected);
    }
}
