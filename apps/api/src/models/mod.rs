pub mod analysis;
pub mod candidate;
pub mod job;
pub mod matching;
pub mod skills;
