#![allow(dead_code)]

pub mod socket_guard;

use std::sync::{Arc, Mutex};

use albumdl_core::StatusHook;

/// Status hook that records every message.
pub fn recording_hook() -> (StatusHook, Arc<Mutex<Vec<String>>>) {
    let messages = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&messages);
    let hook: StatusHook = Arc::new(move |message: &str| {
        sink.lock().unwrap().push(message.to_string());
    });
    (hook, messages)
}

/// Deterministic body of `len` bytes.
pub fn body(len: usize) -> Vec<u8> {
    (0..len).map(|i| u8::try_from(i % 251).unwrap()).collect()
}
