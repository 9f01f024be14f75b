pub mod credibility;
pub mod json;
