//! Parsing of link inspector output.
//!
//! The inspector prints free-form, whitespace-separated text (BSD `ifconfig`
//! style). Only two pairs matter: `ssid <name>` and `status: <value>`.
//! Addresses are listed as `inet <addr>` / `inet6 <addr>` pairs.

use crate::ops::AddressFamily;

/// Substrings of the `status:` value that mean the link is usable.
///
/// Matching is by substring, so `inactive` counts as up as well.
pub const UP_MARKERS: [&str; 2] = ["active", "associated"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkReport {
    /// Wireless network identity, if the interface reports one.
    pub ssid: Option<String>,
    /// Value following the first `status:` token.
    pub status: Option<String>,
    /// True when any `status:` value contains an up-marker.
    pub up: bool,
}

pub fn parse_link_report(text: &str) -> LinkReport {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    let mut report = LinkReport::default();

    for pair in tokens.windows(2) {
        match pair[0] {
            "ssid" if report.ssid.is_none() => {
                report.ssid = Some(pair[1].to_string());
            }
            "status:" => {
                if report.status.is_none() {
                    report.status = Some(pair[1].to_string());
                }
                if is_up_value(pair[1]) {
                    report.up = true;
                }
            }
            _ => {}
        }
    }

    report
}

pub fn is_up_value(value: &str) -> bool {
    UP_MARKERS.iter().any(|marker| value.contains(marker))
}

/// Addresses listed for `family`, in the order the inspector printed them.
pub fn parse_addresses(text: &str, family: AddressFamily) -> Vec<String> {
    let keyword = family.as_str();
    text.split_whitespace()
        .collect::<Vec<_>>()
        .windows(2)
        .filter(|pair| pair[0] == keyword)
        .map(|pair| pair[1].to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const WIRED_ACTIVE: &str = "\
em0: flags=8863<UP,BROADCAST,RUNNING,SIMPLEX,MULTICAST> metric 0 mtu 1500
\toptions=481249b<RXCSUM,TXCSUM,VLAN_MTU,VLAN_HWTAGGING,VLAN_HWCSUM,LRO,WOL_MAGIC>
\tether 54:ee:75:12:34:56
\tinet 192.168.1.23 netmask 0xffffff00 broadcast 192.168.1.255
\tinet6 fe80::56ee:75ff:fe12:3456%em0 prefixlen 64 scopeid 0x1
\tinet6 2001:db8::23 prefixlen 64 autoconf
\tmedia: Ethernet autoselect (1000baseT <full-duplex>)
\tstatus: active
\tnd6 options=23<PERFORMNUD,ACCEPT_RTADV,AUTO_LINKLOCAL>
";

    const WIRED_NO_CARRIER: &str = "\
em0: flags=8822<BROADCAST,SIMPLEX,MULTICAST> metric 0 mtu 1500
\tether 54:ee:75:12:34:56
\tmedia: Ethernet autoselect
\tstatus: no carrier
";

    const WLAN_ASSOCIATED: &str = "\
wlan0: flags=8843<UP,BROADCAST,RUNNING,SIMPLEX,MULTICAST> metric 0 mtu 1500
\tether 00:21:6a:aa:bb:cc
\tinet 10.0.0.7 netmask 0xffffff00 broadcast 10.0.0.255
\tgroups: wlan
\tssid home channel 6 (2437 MHz 11g ht/20) bssid 00:11:22:33:44:55
\tregdomain ETSI country DE authmode WPA2/802.11i privacy ON
\tmedia: IEEE 802.11 Wireless Ethernet MCS mode 11ng
\tstatus: associated
";

    #[test]
    fn test_wired_active() {
        let report = parse_link_report(WIRED_ACTIVE);
        assert!(report.up);
        assert_eq!(report.ssid, None);
        assert_eq!(report.status.as_deref(), Some("active"));
    }

    #[test]
    fn test_wired_no_carrier() {
        let report = parse_link_report(WIRED_NO_CARRIER);
        assert!(!report.up);
        assert_eq!(report.status.as_deref(), Some("no"));
    }

    #[test]
    fn test_wireless_associated() {
        let report = parse_link_report(WLAN_ASSOCIATED);
        assert!(report.up);
        assert_eq!(report.ssid.as_deref(), Some("home"));
    }

    #[test]
    fn test_inactive_counts_as_up() {
        let report = parse_link_report("status: inactive");
        assert!(report.up);
    }

    #[test]
    fn test_trailing_tokens_without_value() {
        let report = parse_link_report("em0: flags=0 ssid");
        assert_eq!(report.ssid, None);
        let report = parse_link_report("em0: status:");
        assert_eq!(report.status, None);
        assert!(!report.up);
    }

    #[test]
    fn test_empty_text() {
        assert_eq!(parse_link_report(""), LinkReport::default());
    }

    #[test]
    fn test_parse_addresses_by_family() {
        assert_eq!(
            parse_addresses(WIRED_ACTIVE, AddressFamily::Inet),
            vec!["192.168.1.23".to_string()]
        );
        assert_eq!(
            parse_addresses(WIRED_ACTIVE, AddressFamily::Inet6),
            vec![
                "fe80::56ee:75ff:fe12:3456%em0".to_string(),
                "2001:db8::23".to_string()
            ]
        );
        assert!(parse_addresses(WIRED_NO_CARRIER, AddressFamily::Inet).is_empty());
    }
}
