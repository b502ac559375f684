//! Bloom chat server binary.
//! Run with: cargo run --bin bloom-server

use std::process::ExitCode;

use bloom_chat::start_bloom;

fn main() -> ExitCode {
    start_bloom::run()
}
