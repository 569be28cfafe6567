pub mod content;
pub mod envelope;
pub mod language;
pub mod session;
pub mod status;
