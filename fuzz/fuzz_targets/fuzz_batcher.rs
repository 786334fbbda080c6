#![no_main]

use std::time::Duration;

use chat_bridge::batcher::MessageBatcher;
use chat_bridge::event::MessageOrigin;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    // Newlines delimit lines within a flushed unit, so only feed whole
    // non-empty lines.
    let lines: Vec<&str> = text.split('\n').filter(|l| !l.is_empty()).collect();

    let mut batcher = MessageBatcher::new(Duration::from_millis(1000));
    for line in &lines {
        batcher.offer(*line, MessageOrigin::Server);
    }

    // Every offered line comes back exactly once, in order, and the
    // batcher is fully drained afterwards.
    let units = batcher.flush();
    let flushed: Vec<&str> = units.iter().flat_map(|unit| unit.split('\n')).collect();
    assert_eq!(flushed, lines);
    assert!(batcher.is_empty());
    assert!(batcher.deadline().is_none());
});
