//! Fuzz target: `ConnectionContext::read_from`
//!
//! Feeds arbitrary client bytes through the request reader and checks the
//! kept request line stays within its cap and routes consistently.
//!
//! cargo fuzz run fuzz_request_line

#![no_main]

use std::io::Cursor;

use irthermo::app::handler::{ConnectionContext, MAX_LINE_LEN, Route};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut reader = Cursor::new(data);
    if let Ok(ctx) = ConnectionContext::read_from(&mut reader) {
        assert!(ctx.request_line.len() <= MAX_LINE_LEN);
        assert_eq!(ctx.route, Route::from_request_line(&ctx.request_line));
    }
});
