pub mod descriptions;
pub mod gemini;
pub mod progress;
