//! Game id generation. The original source loaded word-list files process-wide
//! as global state; here the corpus is owned by the generator and injected
//! into the server at construction (see design notes in SPEC_FULL.md §9).

use rand::seq::SliceRandom;
use std::sync::atomic::{AtomicU64, Ordering};

const ADJECTIVES: &[&str] = &[
    "amber", "brisk", "calm", "dapper", "eager", "fleet", "gentle", "hasty",
    "icy", "jolly", "keen", "lively", "mellow", "nimble", "orderly", "plucky",
    "quiet", "rowdy", "sly", "tidy", "upbeat", "vivid", "witty", "zesty",
];

const NOUNS: &[&str] = &[
    "badger", "condor", "dolphin", "egret", "falcon", "gopher", "heron",
    "ibex", "jackal", "kestrel", "lemur", "mantis", "newt", "otter",
    "panther", "quail", "raven", "sparrow", "tapir", "urchin", "viper",
    "walrus", "yak", "zebra",
];

/// Mints a fresh, opaque game id. The wire protocol never interprets the
/// token — callers must not assume a particular format.
pub trait GameIdGenerator: Send + Sync {
    fn next_id(&self) -> String;
}

/// Default generator: draws an `adjective_noun` token from a small embedded
/// corpus, standing in for the larger word lists a production deployment
/// might load from disk.
#[derive(Default)]
pub struct RandomIdGenerator;

impl GameIdGenerator for RandomIdGenerator {
    fn next_id(&self) -> String {
        let mut rng = rand::thread_rng();
        let adj = ADJECTIVES.choose(&mut rng).unwrap();
        let noun = NOUNS.choose(&mut rng).unwrap();
        format!("{adj}_{noun}")
    }
}

/// Deterministic, counter-backed generator for tests — ids are predictable
/// and collision-free across a single server's lifetime.
#[derive(Default)]
pub struct CountingIdGenerator {
    next: AtomicU64,
}

impl GameIdGenerator for CountingIdGenerator {
    fn next_id(&self) -> String {
        self.next.fetch_add(1, Ordering::Relaxed).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counting_generator_is_deterministic() {
        let id_gen = CountingIdGenerator::default();
        assert_eq!(id_gen.next_id(), "0");
        assert_eq!(id_gen.next_id(), "1");
        assert_eq!(id_gen.next_id(), "2");
    }

    #[test]
    fn random_generator_produces_adjective_noun_token() {
        let id_gen = RandomIdGenerator;
        let id = id_gen.next_id();
        assert_eq!(id.split('_').count(), 2);
    }
}
