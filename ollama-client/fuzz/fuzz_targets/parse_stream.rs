#![no_main]

use libfuzzer_sys::fuzz_target;
use ollama_client::{ChatResponse, LineAssembler, StreamFrame, parse_line};

// First byte picks the split point, the rest is the body.
fuzz_target!(|data: &[u8]| {
    let Some((&split, body)) = data.split_first() else {
        return;
    };
    let split = usize::from(split).min(body.len());
    let (head, tail) = body.split_at(split);

    let mut assembler = LineAssembler::new();
    let mut chunked = assembler.push(head);
    chunked.extend(assembler.push(tail));

    let whole = LineAssembler::new().push(body);
    assert_eq!(chunked, whole);

    for line in &whole {
        assert!(!line.contains('\n'));
        if let Some(StreamFrame::Record(record)) = parse_line::<ChatResponse>(line) {
            let _ = record.done;
        }
        let _ = parse_line::<serde_json::Value>(line);
    }
});
