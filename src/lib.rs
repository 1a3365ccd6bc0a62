pub mod capture;
pub mod cdp;
pub mod errors;
pub mod gemini;
pub mod har;
pub mod keystore;
pub mod panel;
pub mod prompt;
pub mod session;
