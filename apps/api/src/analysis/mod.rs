pub mod analyzer;
pub mod defaults;
pub mod handlers;
pub mod prompts;

pub use analyzer::{AnalysisBody, AnalysisReport, ResumeAnalyzer};
