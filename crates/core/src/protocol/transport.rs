use std::fmt;

/// Parsed RTSP `Transport` header (RFC 2326 §12.39) as WFD uses it.
///
/// ## Wire format example
///
/// ```text
/// Sink → Source (M6 SETUP):
///   Transport: RTP/AVP/UDP;unicast;client_port=19000
///
/// Source → Sink (M6 reply):
///   Transport: RTP/AVP/UDP;unicast;client_port=19000;server_port=5000-5001
/// ```
///
/// Non-port parameters (`RTP/AVP/UDP`, `unicast`, ...) are kept verbatim
/// so the reply can echo what the sink asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportHeader {
    /// Everything except the port parameters, e.g. `RTP/AVP/UDP;unicast`.
    pub profile: String,
    /// Sink's RTP receive port.
    pub client_rtp_port: u16,
    /// Sink's RTCP port, when it gave a range.
    pub client_rtcp_port: Option<u16>,
    /// Source's RTP send port, present in replies.
    pub server_rtp_port: Option<u16>,
    pub server_rtcp_port: Option<u16>,
}

pub const DEFAULT_TRANSPORT_PROFILE: &str = "RTP/AVP/UDP;unicast";

fn parse_port_range(value: &str) -> Option<(u16, Option<u16>)> {
    match value.split_once('-') {
        Some((rtp, rtcp)) => Some((rtp.trim().parse().ok()?, Some(rtcp.trim().parse().ok()?))),
        None => Some((value.trim().parse().ok()?, None)),
    }
}

impl TransportHeader {
    pub fn new(client_rtp_port: u16) -> Self {
        Self {
            profile: DEFAULT_TRANSPORT_PROFILE.to_string(),
            client_rtp_port,
            client_rtcp_port: None,
            server_rtp_port: None,
            server_rtcp_port: None,
        }
    }

    pub fn with_server_ports(mut self, rtp: u16, rtcp: Option<u16>) -> Self {
        self.server_rtp_port = Some(rtp);
        self.server_rtcp_port = rtcp;
        self
    }

    /// Parse the `Transport` header value.
    ///
    /// Looks for `client_port=RTP[-RTCP]` and `server_port=RTP[-RTCP]`
    /// among semicolon-separated parameters. `client_port` is mandatory.
    ///
    /// ## Examples
    ///
    /// ```
    /// use wfd::protocol::TransportHeader;
    ///
    /// let th = TransportHeader::parse("RTP/AVP/UDP;unicast;client_port=19000").unwrap();
    /// assert_eq!(th.client_rtp_port, 19000);
    /// assert_eq!(th.client_rtcp_port, None);
    /// assert_eq!(th.profile, "RTP/AVP/UDP;unicast");
    ///
    /// assert!(TransportHeader::parse("RTP/AVP/UDP;unicast").is_none());
    /// ```
    pub fn parse(header: &str) -> Option<Self> {
        let mut profile = Vec::new();
        let mut client = None;
        let mut server = None;

        for part in header.split(';') {
            let part = part.trim();
            if let Some(ports) = part.strip_prefix("client_port=") {
                client = Some(parse_port_range(ports)?);
            } else if let Some(ports) = part.strip_prefix("server_port=") {
                server = Some(parse_port_range(ports)?);
            } else if !part.is_empty() {
                profile.push(part);
            }
        }

        let (client_rtp_port, client_rtcp_port) = client?;
        Some(TransportHeader {
            profile: profile.join(";"),
            client_rtp_port,
            client_rtcp_port,
            server_rtp_port: server.map(|(rtp, _)| rtp),
            server_rtcp_port: server.and_then(|(_, rtcp)| rtcp),
        })
    }
}

fn write_ports(f: &mut fmt::Formatter<'_>, name: &str, rtp: u16, rtcp: Option<u16>) -> fmt::Result {
    match rtcp {
        Some(rtcp) => write!(f, ";{name}={rtp}-{rtcp}"),
        None => write!(f, ";{name}={rtp}"),
    }
}

impl fmt::Display for TransportHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.profile)?;
        write_ports(f, "client_port", self.client_rtp_port, self.client_rtcp_port)?;
        if let Some(rtp) = self.server_rtp_port {
            write_ports(f, "server_port", rtp, self.server_rtcp_port)?;
        }
        Ok(())
    }
}
