//! Address family normalization for listen endpoints.

use crate::error::SessionError;

use netstart_transport::IpVersion;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;

/// Address family tag as carried by a session description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NetworkFamily {
    /// Unset or unparsable address.
    Invalid,
    Ipv4,
    Ipv6,
    /// Custom family, with its raw tag.
    Custom(u16),
    /// Any family tag this build does not know.
    #[serde(other)]
    Unrecognized,
}

impl From<IpAddr> for NetworkFamily {
    fn from(ip: IpAddr) -> Self {
        match ip {
            IpAddr::V4(_) => NetworkFamily::Ipv4,
            IpAddr::V6(_) => NetworkFamily::Ipv6,
        }
    }
}

impl NetworkFamily {
    /// Family of a textual address; anything that is not an IP literal is
    /// [`Invalid`](NetworkFamily::Invalid).
    pub fn of_address(address: &str) -> Self {
        address
            .parse::<IpAddr>()
            .map(Self::from)
            .unwrap_or(NetworkFamily::Invalid)
    }
}

impl fmt::Display for NetworkFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkFamily::Invalid => write!(f, "Invalid"),
            NetworkFamily::Ipv4 => write!(f, "IPv4"),
            NetworkFamily::Ipv6 => write!(f, "IPv6"),
            NetworkFamily::Custom(tag) => write!(f, "Custom({tag})"),
            NetworkFamily::Unrecognized => write!(f, "Unrecognized"),
        }
    }
}

/// Map the family of the listen `address` onto the transport's IP version.
pub fn map_family(address: &str, family: NetworkFamily) -> Result<IpVersion, SessionError> {
    match family {
        NetworkFamily::Ipv4 => Ok(IpVersion::Ipv4),
        NetworkFamily::Ipv6 => Ok(IpVersion::Ipv6),
        NetworkFamily::Invalid => Err(SessionError::InvalidAddress {
            address: address.to_string(),
        }),
        NetworkFamily::Custom(_) | NetworkFamily::Unrecognized => {
            Err(SessionError::UnsupportedAddressFamily {
                address: address.to_string(),
                family,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn maps_ip_families() {
        assert_eq!(map_family("0.0.0.0", NetworkFamily::Ipv4).unwrap(), IpVersion::Ipv4);
        assert_eq!(map_family("::", NetworkFamily::Ipv6).unwrap(), IpVersion::Ipv6);
    }

    #[test]
    fn invalid_family_is_an_address_error() {
        let err = map_family("", NetworkFamily::Invalid).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidAddress);
    }

    #[test]
    fn custom_family_is_unsupported() {
        let err = map_family("ipc://lobby", NetworkFamily::Custom(1)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedAddressFamily);
    }

    #[test]
    fn unknown_family_tag_is_unsupported() {
        let family: NetworkFamily = serde_json::from_str(r#""Ipx""#).unwrap();
        assert_eq!(family, NetworkFamily::Unrecognized);
        let err = map_family("lobby", family).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedAddressFamily);
    }

    #[test]
    fn family_of_textual_address() {
        assert_eq!(NetworkFamily::of_address("127.0.0.1"), NetworkFamily::Ipv4);
        assert_eq!(NetworkFamily::of_address("fe80::1"), NetworkFamily::Ipv6);
        assert_eq!(NetworkFamily::of_address("lobby.local"), NetworkFamily::Invalid);
    }
}
