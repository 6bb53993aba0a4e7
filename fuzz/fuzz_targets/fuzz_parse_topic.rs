#![no_main]

use libfuzzer_sys::fuzz_target;
use solarhotwater::dbus::Topic;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data)
        && let Ok(topic) = Topic::parse(s)
    {
        let again = Topic::parse(&topic.to_string()).expect("display output reparses");
        assert_eq!(topic, again);
    }
});
