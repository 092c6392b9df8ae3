//! Core type definitions for the signaling relay

use std::fmt;
use std::net::IpAddr;

use crate::CONNECTION_ID_BYTES;

/// Identifier assigned to a peer connection when it attaches
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct ConnectionId(String);

impl ConnectionId {
    /// Draw a fresh random identifier (16 lowercase hex characters)
    pub fn random() -> Self {
        let mut bytes = [0u8; CONNECTION_ID_BYTES];
        if getrandom::fill(&mut bytes).is_err() {
            // RNG unavailable; the registry re-draws on collision
            let nanos = std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or_default();
            bytes = nanos.to_le_bytes();
        }
        Self(hex::encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ConnectionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Address family of an ICE candidate
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddressFamily {
    Ipv4,
    Ipv6,
    /// Hostname (mDNS `.local`) or empty end-of-candidates line
    Unknown,
}

impl AddressFamily {
    /// Classify an ICE candidate line such as
    /// `candidate:842163049 1 udp 1677729535 192.0.2.7 54400 typ srflx`.
    ///
    /// The `IP6` address-type token marks IPv6 regardless of the address
    /// field; otherwise the connection-address (fifth token) decides.
    pub fn of_candidate(line: &str) -> Self {
        let mut saw_ip4 = false;
        let mut address = None;

        for (i, token) in line.split_whitespace().enumerate() {
            if token.contains("IP6") {
                return AddressFamily::Ipv6;
            }
            if token.contains("IP4") {
                saw_ip4 = true;
            }
            if i == 4 {
                address = Some(token);
            }
        }

        let parsed = address.and_then(|a| {
            a.trim_matches(|c: char| c == '[' || c == ']')
                .parse::<IpAddr>()
                .ok()
        });

        match parsed {
            Some(IpAddr::V6(_)) => AddressFamily::Ipv6,
            Some(IpAddr::V4(_)) => AddressFamily::Ipv4,
            None if saw_ip4 => AddressFamily::Ipv4,
            None => AddressFamily::Unknown,
        }
    }

    pub fn is_ipv6(self) -> bool {
        self == AddressFamily::Ipv6
    }
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressFamily::Ipv4 => write!(f, "IPv4"),
            AddressFamily::Ipv6 => write!(f, "IPv6"),
            AddressFamily::Unknown => write!(f, "unknown"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_format() {
        let id = ConnectionId::random();
        assert_eq!(id.as_str().len(), CONNECTION_ID_BYTES * 2);
        assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(id, ConnectionId::random());
    }

    #[test]
    fn test_connection_id_display() {
        let id = ConnectionId::from("00ff00ff00ff00ff");
        assert_eq!(id.to_string(), "00ff00ff00ff00ff");
    }

    #[test]
    fn test_family_ipv4_host() {
        let line = "candidate:1 1 udp 2122260223 192.168.1.5 54321 typ host generation 0";
        assert_eq!(AddressFamily::of_candidate(line), AddressFamily::Ipv4);
    }

    #[test]
    fn test_family_ipv6_address() {
        let line = "candidate:2 1 udp 2122262783 2001:db8::1 54322 typ host";
        assert_eq!(AddressFamily::of_candidate(line), AddressFamily::Ipv6);
    }

    #[test]
    fn test_family_ip6_token() {
        assert!(AddressFamily::of_candidate("c=IN IP6 ::1").is_ipv6());
        assert_eq!(
            AddressFamily::of_candidate("c=IN IP4 10.0.0.1"),
            AddressFamily::Ipv4
        );
    }

    #[test]
    fn test_family_unknown() {
        let mdns = "candidate:3 1 udp 2122260223 4b0e-d9a1.local 54323 typ host";
        assert_eq!(AddressFamily::of_candidate(mdns), AddressFamily::Unknown);
        assert_eq!(AddressFamily::of_candidate(""), AddressFamily::Unknown);
    }
}
