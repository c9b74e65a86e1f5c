#![no_main]

use libfuzzer_sys::fuzz_target;
use wade_http::{CacheConfig, RequestCache, render_snapshot_block, snapshot_from_html};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(mut cache) = RequestCache::from_snapshot(text) {
        let before = cache.total_remaining();
        if cache.lookup("GET / -").is_some() {
            assert_eq!(cache.total_remaining(), before - 1);
        }
    }

    let block = render_snapshot_block(text, "text/wadehttp");
    let extracted = snapshot_from_html(&block, "text/wadehttp").unwrap();
    assert_eq!(
        extracted.map(|s| s.replace("<\\/", "</")),
        Some(text.replace("<\\/", "</"))
    );
    let _ = RequestCache::from_page(text, &CacheConfig::default());
});
