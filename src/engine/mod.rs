pub mod difficulty;
pub mod sampler;
pub mod scoring;
pub mod topic_stats;
