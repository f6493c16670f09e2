mod models;

pub use models::{AccessGrant, TokenGrant, TokenSource};
