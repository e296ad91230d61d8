//! Device type classification from system description strings

use crate::device::DeviceType;

/// Ordered keyword rules; the first rule with a matching keyword wins.
const RULES: &[(DeviceType, &[&str])] = &[
    (DeviceType::Router, &["router"]),
    (DeviceType::Switch, &["switch"]),
    (DeviceType::Server, &["server", "linux", "windows"]),
];

/// Classify a device from its system description.
///
/// Matching is a case-insensitive substring search. A description naming
/// both "router" and "switch" is a `Router`, and a missing or empty
/// description is `Unknown`.
pub fn classify(description: Option<&str>) -> DeviceType {
    let description = match description {
        Some(d) if !d.is_empty() => d.to_lowercase(),
        _ => return DeviceType::Unknown,
    };

    RULES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| description.contains(k)))
        .map(|(device_type, _)| *device_type)
        .unwrap_or(DeviceType::Unknown)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_or_empty_is_unknown() {
        assert_eq!(classify(None), DeviceType::Unknown);
        assert_eq!(classify(Some("")), DeviceType::Unknown);
    }

    #[test]
    fn test_keywords_case_insensitive() {
        assert_eq!(classify(Some("Cisco IOS Switch")), DeviceType::Switch);
        assert_eq!(classify(Some("MikroTik ROUTER OS")), DeviceType::Router);
        assert_eq!(classify(Some("Linux nas 5.15.0 x86_64")), DeviceType::Server);
        assert_eq!(classify(Some("Hardware: Intel64 - Software: Windows 2019")), DeviceType::Server);
        assert_eq!(classify(Some("HP JetDirect printer")), DeviceType::Unknown);
    }

    #[test]
    fn test_rule_order_router_first() {
        assert_eq!(classify(Some("layer-3 switch router")), DeviceType::Router);
        assert_eq!(classify(Some("router on a linux server")), DeviceType::Router);
        assert_eq!(classify(Some("switch managed from a linux server")), DeviceType::Switch);
    }
}
