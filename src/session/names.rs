//! Random identities for new sessions.

use rand::seq::SliceRandom;
use rand::Rng;

const ADJECTIVES: &[&str] = &[
    "swift", "clever", "brave", "calm", "eager", "bold", "bright", "cool", "daring", "fancy",
    "gentle", "happy", "jolly", "keen", "lively", "merry", "noble", "proud", "quick", "sharp",
    "witty", "zesty", "vivid", "steady", "silent",
];

const NOUNS: &[&str] = &[
    "fox", "owl", "hawk", "bear", "wolf", "deer", "hare", "lynx", "crow", "wren", "otter",
    "finch", "pike", "moth", "newt", "crane", "dove", "seal", "toad", "vole", "raven", "stoat",
    "shrew", "robin", "swift",
];

/// A display name like `brave-otter-42`.
pub fn random_username() -> String {
    username_from(&mut rand::thread_rng())
}

/// A fresh session identifier.
pub fn new_session_id() -> String {
    format!("s-{}", uuid::Uuid::new_v4())
}

fn username_from<R: Rng>(rng: &mut R) -> String {
    let adjective = ADJECTIVES.choose(rng).copied().unwrap_or("quiet");
    let noun = NOUNS.choose(rng).copied().unwrap_or("mouse");
    let n: u8 = rng.gen_range(0..100);
    format!("{adjective}-{noun}-{n}")
}
