#![no_main]

use libfuzzer_sys::fuzz_target;
use wade_template::{compile_text, parts_to_template, split_mustaches};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let parts = split_mustaches(text);
    for part in &parts {
        if part.is_expression {
            assert_eq!(part.content, part.content.trim());
        } else if parts.len() > 1 {
            assert!(!part.content.is_empty());
        }
    }
    if parts.iter().all(|p| !p.is_expression) {
        assert_eq!(parts_to_template(&parts), text);
    }
    let _ = compile_text(text);
});
