//! Parsed PROXY protocol header records.

use std::fmt::Write as _;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::LazyLock;

use crate::error::ProxyProtocolError;
use crate::haproxy::tlv::Tlv;

/// Maximum length of an AF_UNIX socket path field in a v2 header.
pub(crate) const UNIX_PATH_LEN: usize = 108;

/// PROXY protocol version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ProxyVersion {
    /// Human-readable text format, terminated by CRLF.
    V1,
    /// Binary format with a fixed 16-byte preamble.
    V2,
}

impl ProxyVersion {
    /// Derive the version from the high nibble of the v2 version/command byte.
    pub fn from_version_byte(byte: u8) -> Option<ProxyVersion> {
        match byte & 0xF0 {
            0x10 => Some(ProxyVersion::V1),
            0x20 => Some(ProxyVersion::V2),
            _ => None,
        }
    }
}

/// PROXY protocol command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ProxyCommand {
    /// Connection established on behalf of the proxy itself (health checks).
    Local,
    /// Connection relayed for a real client; addresses follow.
    Proxy,
}

impl ProxyCommand {
    /// Derive the command from the low nibble of the v2 version/command byte.
    pub fn from_command_byte(byte: u8) -> Option<ProxyCommand> {
        match byte & 0x0F {
            0x00 => Some(ProxyCommand::Local),
            0x01 => Some(ProxyCommand::Proxy),
            _ => None,
        }
    }
}

/// Address family carried by a [`ProxiedProtocol`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AddressFamily {
    /// No address information.
    Unspec,
    /// IPv4.
    Inet4,
    /// IPv6.
    Inet6,
    /// Unix domain socket path.
    Unix,
}

impl AddressFamily {
    /// Human-readable family name, used in error reporting.
    pub fn as_str(self) -> &'static str {
        match self {
            AddressFamily::Unspec => "AF_UNSPEC",
            AddressFamily::Inet4 => "AF_INET",
            AddressFamily::Inet6 => "AF_INET6",
            AddressFamily::Unix => "AF_UNIX",
        }
    }
}

/// Transport protocol carried by a [`ProxiedProtocol`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TransportProtocol {
    /// Transport unknown or irrelevant.
    Unspec,
    /// Connection-oriented (TCP, SOCK_STREAM).
    Stream,
    /// Datagram-oriented (UDP, SOCK_DGRAM).
    Dgram,
}

/// The protocol and address family of the proxied connection.
///
/// Each variant corresponds to one defined value of the v2
/// transport-protocol/address-family byte; the v1 text form can only express
/// `Tcp4`, `Tcp6`, and `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ProxiedProtocol {
    /// Unknown or unsupported; address information must be ignored.
    Unknown,
    /// TCP over IPv4.
    Tcp4,
    /// TCP over IPv6.
    Tcp6,
    /// UDP over IPv4.
    Udp4,
    /// UDP over IPv6.
    Udp6,
    /// Unix stream socket.
    UnixStream,
    /// Unix datagram socket.
    UnixDgram,
}

impl ProxiedProtocol {
    /// Decode the v2 transport-protocol/address-family byte.
    pub fn from_byte(byte: u8) -> Option<ProxiedProtocol> {
        match byte {
            0x00 => Some(ProxiedProtocol::Unknown),
            0x11 => Some(ProxiedProtocol::Tcp4),
            0x21 => Some(ProxiedProtocol::Tcp6),
            0x12 => Some(ProxiedProtocol::Udp4),
            0x22 => Some(ProxiedProtocol::Udp6),
            0x31 => Some(ProxiedProtocol::UnixStream),
            0x32 => Some(ProxiedProtocol::UnixDgram),
            _ => None,
        }
    }

    /// The wire byte for this protocol.
    pub fn as_byte(self) -> u8 {
        match self {
            ProxiedProtocol::Unknown => 0x00,
            ProxiedProtocol::Tcp4 => 0x11,
            ProxiedProtocol::Tcp6 => 0x21,
            ProxiedProtocol::Udp4 => 0x12,
            ProxiedProtocol::Udp6 => 0x22,
            ProxiedProtocol::UnixStream => 0x31,
            ProxiedProtocol::UnixDgram => 0x32,
        }
    }

    /// The address family this protocol carries.
    pub fn address_family(self) -> AddressFamily {
        match self {
            ProxiedProtocol::Unknown => AddressFamily::Unspec,
            ProxiedProtocol::Tcp4 | ProxiedProtocol::Udp4 => AddressFamily::Inet4,
            ProxiedProtocol::Tcp6 | ProxiedProtocol::Udp6 => AddressFamily::Inet6,
            ProxiedProtocol::UnixStream | ProxiedProtocol::UnixDgram => AddressFamily::Unix,
        }
    }

    /// The transport protocol this protocol carries.
    pub fn transport(self) -> TransportProtocol {
        match self {
            ProxiedProtocol::Unknown => TransportProtocol::Unspec,
            ProxiedProtocol::Tcp4 | ProxiedProtocol::Tcp6 | ProxiedProtocol::UnixStream => {
                TransportProtocol::Stream
            }
            ProxiedProtocol::Udp4 | ProxiedProtocol::Udp6 | ProxiedProtocol::UnixDgram => {
                TransportProtocol::Dgram
            }
        }
    }
}

/// A parsed, validated PROXY protocol header.
///
/// Immutable once constructed. For `Unknown` protocol or the `Local`
/// command, all address and port fields are cleared and the TLV list is
/// empty.
///
/// # Example
///
/// ```
/// use gangway_proto::haproxy::{ProxyMessage, ProxiedProtocol};
///
/// let msg = ProxyMessage::from_text("PROXY TCP4 192.168.0.1 192.168.0.11 56324 443").unwrap();
/// assert_eq!(msg.protocol(), ProxiedProtocol::Tcp4);
/// assert_eq!(msg.source_address(), Some("192.168.0.1"));
/// assert_eq!(msg.dest_port(), 443);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ProxyMessage {
    version: ProxyVersion,
    command: ProxyCommand,
    protocol: ProxiedProtocol,
    source_address: Option<String>,
    dest_address: Option<String>,
    source_port: u16,
    dest_port: u16,
    tlvs: Vec<Tlv>,
}

static V1_UNKNOWN: LazyLock<ProxyMessage> =
    LazyLock::new(|| ProxyMessage::cleared(ProxyVersion::V1, ProxyCommand::Proxy));
static V2_UNKNOWN: LazyLock<ProxyMessage> =
    LazyLock::new(|| ProxyMessage::cleared(ProxyVersion::V2, ProxyCommand::Proxy));
static V2_LOCAL: LazyLock<ProxyMessage> =
    LazyLock::new(|| ProxyMessage::cleared(ProxyVersion::V2, ProxyCommand::Local));

impl ProxyMessage {
    fn cleared(version: ProxyVersion, command: ProxyCommand) -> ProxyMessage {
        ProxyMessage {
            version,
            command,
            protocol: ProxiedProtocol::Unknown,
            source_address: None,
            dest_address: None,
            source_port: 0,
            dest_port: 0,
            tlvs: Vec::new(),
        }
    }

    /// The canonical v1 `UNKNOWN` message: all address fields cleared.
    pub fn v1_unknown() -> &'static ProxyMessage {
        &V1_UNKNOWN
    }

    /// The canonical v2 `UNSPEC` message: all address fields cleared.
    pub fn v2_unknown() -> &'static ProxyMessage {
        &V2_UNKNOWN
    }

    /// The canonical v2 `LOCAL` message: all address fields cleared.
    pub fn v2_local() -> &'static ProxyMessage {
        &V2_LOCAL
    }

    /// Construct a validated message. Both the text and the binary decode
    /// paths funnel through here.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        version: ProxyVersion,
        command: ProxyCommand,
        protocol: ProxiedProtocol,
        source_address: Option<String>,
        dest_address: Option<String>,
        source_port: u16,
        dest_port: u16,
        tlvs: Vec<Tlv>,
    ) -> Result<ProxyMessage, ProxyProtocolError> {
        let family = protocol.address_family();
        check_address(family, source_address.as_deref())?;
        check_address(family, dest_address.as_deref())?;
        match family {
            AddressFamily::Unspec | AddressFamily::Unix => {
                // Families without port semantics always report zero.
                if source_port != 0 || dest_port != 0 {
                    return Err(ProxyProtocolError::InvalidPort(format!(
                        "{}:{}",
                        source_port, dest_port
                    )));
                }
            }
            AddressFamily::Inet4 | AddressFamily::Inet6 => {
                if source_address.is_none() && source_port != 0 {
                    return Err(ProxyProtocolError::InvalidPort(source_port.to_string()));
                }
                if dest_address.is_none() && dest_port != 0 {
                    return Err(ProxyProtocolError::InvalidPort(dest_port.to_string()));
                }
            }
        }
        Ok(ProxyMessage {
            version,
            command,
            protocol,
            source_address,
            dest_address,
            source_port,
            dest_port,
            tlvs,
        })
    }

    /// Parse a v1 text header line (without its CRLF terminator).
    ///
    /// Only `TCP4`, `TCP6`, and `UNKNOWN` are expressible in text form;
    /// anything else (notably `UDP4`/`UDP6`) is rejected.
    pub fn from_text(line: &str) -> Result<ProxyMessage, ProxyProtocolError> {
        let tokens: Vec<&str> = line.split(' ').collect();
        if tokens.first() != Some(&"PROXY") {
            return Err(ProxyProtocolError::Malformed("v1 header must start with PROXY"));
        }
        if tokens.len() < 2 {
            return Err(ProxyProtocolError::InvalidTokenCount {
                expected: 6,
                got: tokens.len(),
            });
        }
        match tokens[1] {
            // UNKNOWN ignores whatever follows on the line.
            "UNKNOWN" => Ok(ProxyMessage::v1_unknown().clone()),
            proto @ ("TCP4" | "TCP6") => {
                if tokens.len() != 6 {
                    return Err(ProxyProtocolError::InvalidTokenCount {
                        expected: 6,
                        got: tokens.len(),
                    });
                }
                let protocol = if proto == "TCP4" {
                    ProxiedProtocol::Tcp4
                } else {
                    ProxiedProtocol::Tcp6
                };
                let source_port = parse_text_port(tokens[4])?;
                let dest_port = parse_text_port(tokens[5])?;
                ProxyMessage::new(
                    ProxyVersion::V1,
                    ProxyCommand::Proxy,
                    protocol,
                    Some(tokens[2].to_owned()),
                    Some(tokens[3].to_owned()),
                    source_port,
                    dest_port,
                    Vec::new(),
                )
            }
            other => Err(ProxyProtocolError::UnsupportedV1Protocol(other.to_owned())),
        }
    }

    /// Protocol version of the header this message came from.
    pub fn version(&self) -> ProxyVersion {
        self.version
    }

    /// The PROXY or LOCAL command.
    pub fn command(&self) -> ProxyCommand {
        self.command
    }

    /// Protocol and address family of the proxied connection.
    pub fn protocol(&self) -> ProxiedProtocol {
        self.protocol
    }

    /// Original source address, if the protocol carries one.
    pub fn source_address(&self) -> Option<&str> {
        self.source_address.as_deref()
    }

    /// Original destination address, if the protocol carries one.
    pub fn dest_address(&self) -> Option<&str> {
        self.dest_address.as_deref()
    }

    /// Original source port (zero when the protocol has no port semantics).
    pub fn source_port(&self) -> u16 {
        self.source_port
    }

    /// Original destination port (zero when the protocol has no port semantics).
    pub fn dest_port(&self) -> u16 {
        self.dest_port
    }

    /// TLV records carried by a v2 header, in wire order.
    ///
    /// An SSL TLV is immediately followed by its encapsulated children,
    /// flattened into this list.
    pub fn tlvs(&self) -> &[Tlv] {
        &self.tlvs
    }
}

fn check_address(
    family: AddressFamily,
    address: Option<&str>,
) -> Result<(), ProxyProtocolError> {
    let invalid = |value: &str| ProxyProtocolError::InvalidAddress {
        family: family.as_str(),
        value: value.to_owned(),
    };
    match (family, address) {
        (AddressFamily::Unspec, None) => Ok(()),
        (AddressFamily::Unspec, Some(addr)) => Err(invalid(addr)),
        // A unix path is opaque bytes as far as validation goes.
        (AddressFamily::Unix, _) => Ok(()),
        (AddressFamily::Inet4, Some(addr)) => {
            addr.parse::<Ipv4Addr>().map_err(|_| invalid(addr))?;
            Ok(())
        }
        (AddressFamily::Inet6, Some(addr)) => {
            addr.parse::<Ipv6Addr>().map_err(|_| invalid(addr))?;
            Ok(())
        }
        (AddressFamily::Inet4 | AddressFamily::Inet6, None) => Ok(()),
    }
}

fn parse_text_port(token: &str) -> Result<u16, ProxyProtocolError> {
    let port: u16 = token
        .parse()
        .map_err(|_| ProxyProtocolError::InvalidPort(token.to_owned()))?;
    if port == 0 {
        return Err(ProxyProtocolError::InvalidPort(token.to_owned()));
    }
    Ok(port)
}

/// Render a v2 IPv6 address as eight lowercase colon-hex groups with leading
/// zeros stripped per group.
///
/// Deliberately never `::`-compresses, so the rendering is positionally
/// unambiguous: `2001:db8:85a3:0:0:8a2e:370:7334`.
pub(crate) fn format_ipv6(octets: &[u8]) -> String {
    debug_assert_eq!(octets.len(), 16);
    let mut out = String::with_capacity(39);
    for pair in octets.chunks_exact(2) {
        if !out.is_empty() {
            out.push(':');
        }
        let group = u16::from_be_bytes([pair[0], pair[1]]);
        let _ = write!(out, "{:x}", group);
    }
    out
}
