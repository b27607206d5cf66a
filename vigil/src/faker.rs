//! Generated request content. Nothing depends on the exact text, it only has
//! to be varied and non-empty.
use rand::Rng;
use time::OffsetDateTime;

const NEEDS: &[&str] = &[
    "a new job",
    "a home",
    "peace of mind",
    "healing",
    "marriage",
    "breakthrough",
    "financial favor",
    "restoration",
    "direction",
    "faith",
    "wisdom",
];

const REASONS: &[&str] = &[
    "pays more than what I currently earn",
    "brings me joy and peace",
    "helps me grow spiritually",
    "keeps my family safe",
    "helps me impact others",
    "is aligned with my calling",
    "is better than my current one",
    "gives me balance and clarity",
    "secures my future",
    "strengthens my faith",
];

fn pick<R: Rng + ?Sized>(rng: &mut R, pool: &[&'static str]) -> &'static str {
    pool[rng.gen_range(0..pool.len())]
}

/// Title used by journeys: unique per millisecond.
pub fn unique_prayer_title() -> String {
    format!("Prayer Request {}", unix_millis())
}

pub fn prayer_description<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!("I want {} that {}.", pick(rng, NEEDS), pick(rng, REASONS))
}

pub fn testimony<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!(
        "I want to thank God for {} and {}.",
        pick(rng, NEEDS),
        pick(rng, REASONS)
    )
}

pub fn comment<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!("This really blessed me! I also need {}.", pick(rng, NEEDS))
}

/// Synthetic identity for the `index`-th user of a preparation run.
pub fn identity(index: usize) -> String {
    format!("user_loadtest_{}_{index}@example.com", unix_millis())
}

/// Device-binding token sent when preparing users.
pub fn fbm_token<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!("fbm_{}_{}", unix_millis(), rng.gen_range(0..1000))
}

pub fn unix_millis() -> i128 {
    OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000
}
