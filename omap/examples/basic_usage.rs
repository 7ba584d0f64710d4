//! Basic usage of the ordered multimap.

use omap::{OrderedMultiMap, Reverse};

fn main() {
    // Newest first: keys are timestamps, ordered descending.
    let events = OrderedMultiMap::new(Reverse);
    events.put(1_700_000_000u64, "login");
    events.put(1_700_000_030, "upload");
    events.put(1_700_000_030, "upload-retry");
    events.put(1_700_000_090, "logout");

    println!("all events: {}", events);
    println!("latest: {:?}", events.first_key());
    println!("oldest: {:?}", events.last_key());

    // With a descending order, `head` holds the keys that sort before the
    // bound, i.e. the newer timestamps.
    let recent = events.head(&1_700_000_030);
    println!("newer than 1700000030: {:?}", recent.elements());

    let window = events.sub(&1_700_000_060, &1_700_000_000);
    println!("window: {}", window);
}
