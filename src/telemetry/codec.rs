// DogStatsD datagram encoding

use crate::telemetry::{CheckOptions, CheckStatus, EventOptions};

/// Encode a gauge datagram
pub fn encode_gauge(name: &str, value: f64, tags: &[&str]) -> String {
    let mut datagram = format!("{}:{}|g", name, value);
    push_tags(&mut datagram, tags);
    datagram
}

/// Encode a timing datagram
pub fn encode_timing(name: &str, millis: u64, tags: &[&str]) -> String {
    let mut datagram = format!("{}:{}|ms", name, millis);
    push_tags(&mut datagram, tags);
    datagram
}

/// Encode an event datagram. An absent text is sent as the title.
pub fn encode_event(title: &str, text: Option<&str>, options: &EventOptions, tags: &[&str]) -> String {
    let title = escape(title);
    let text = text.map(escape).unwrap_or_else(|| title.clone());

    let mut datagram = format!("_e{{{},{}}}:{}|{}", title.len(), text.len(), title, text);

    if let Some(date) = options.date_happened {
        datagram.push_str(&format!("|d:{}", millis_to_secs(date)));
    }
    if let Some(key) = &options.aggregation_key {
        datagram.push_str(&format!("|k:{}", key));
    }
    if let Some(alert_type) = options.alert_type {
        datagram.push_str(&format!("|t:{}", alert_type.as_str()));
    }

    push_tags(&mut datagram, tags);
    datagram
}

/// Encode a service check datagram
pub fn encode_check(name: &str, status: CheckStatus, options: &CheckOptions, tags: &[&str]) -> String {
    let mut datagram = format!("_sc|{}|{}", name, status.code());

    if let Some(date) = options.date_happened {
        datagram.push_str(&format!("|d:{}", millis_to_secs(date)));
    }

    push_tags(&mut datagram, tags);
    datagram
}

fn push_tags(datagram: &mut String, tags: &[&str]) {
    if tags.is_empty() {
        return;
    }
    datagram.push_str("|#");
    datagram.push_str(&tags.join(","));
}

fn escape(value: &str) -> String {
    value.replace('\n', "\\n")
}

fn millis_to_secs(millis: u64) -> u64 {
    millis / 1000
}
