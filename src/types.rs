use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use crate::error::CompareError;

/// One discovered port at scan time: `80/tcp [open] (http)`.
///
/// Two entries are equal only when port, state and service all match, so a
/// state change on the same port is a removal plus an addition.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(try_from = "String", into = "String")]
pub struct PortEntry {
    /// Port and protocol as reported, e.g. `80/tcp`.
    pub port: String,
    /// `open`, `closed`, `filtered` or any other scanner-reported state.
    pub state: String,
    pub service: String,
}

impl PortEntry {
    pub fn new(
        port: impl Into<String>,
        state: impl Into<String>,
        service: impl Into<String>,
    ) -> Self {
        Self {
            port: port.into(),
            state: state.into(),
            service: service.into(),
        }
    }
}

impl fmt::Display for PortEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] ({})", self.port, self.state, self.service)
    }
}

/// Error for text that is not in `<port> [<state>] (<service>)` form.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed port entry: {0:?}")]
pub struct PortEntryParseError(pub String);

impl FromStr for PortEntry {
    type Err = PortEntryParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || PortEntryParseError(s.to_string());
        let (port, rest) = s.split_once(" [").ok_or_else(malformed)?;
        let (state, rest) = rest.split_once("] (").ok_or_else(malformed)?;
        let service = rest.strip_suffix(')').ok_or_else(malformed)?;
        if port.is_empty() || state.is_empty() || service.is_empty() {
            return Err(malformed());
        }
        Ok(Self::new(port, state, service))
    }
}

impl TryFrom<String> for PortEntry {
    type Error = PortEntryParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PortEntry> for String {
    fn from(entry: PortEntry) -> Self {
        entry.to_string()
    }
}

/// Host identifier → port entries in the order the scanner printed them.
pub type HostPorts = BTreeMap<String, Vec<PortEntry>>;

/// One timestamped capture of host → port-state data.
///
/// A host key with an empty list is distinct from an absent key: absence
/// means the host is no longer part of the scan.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct Snapshot {
    /// RFC 3339 capture instant. Kept as text and parsed on demand.
    #[serde(rename = "datetime")]
    pub captured_at: String,
    #[serde(rename = "ports")]
    pub host_ports: HostPorts,
}

impl Snapshot {
    pub fn new(captured_at: impl Into<String>, host_ports: HostPorts) -> Self {
        Self {
            captured_at: captured_at.into(),
            host_ports,
        }
    }

    /// Stamp `host_ports` with the current UTC instant.
    pub fn now(host_ports: HostPorts) -> Self {
        Self::new(now_rfc3339(), host_ports)
    }

    /// Parse the capture timestamp.
    pub fn captured_at(&self) -> Result<OffsetDateTime, time::error::Parse> {
        OffsetDateTime::parse(&self.captured_at, &Rfc3339)
    }

    pub(crate) fn captured_at_for(
        &self,
        which: &'static str,
    ) -> Result<OffsetDateTime, CompareError> {
        self.captured_at().map_err(|source| CompareError::TimeParse {
            which,
            value: self.captured_at.clone(),
            source,
        })
    }

    pub fn host_count(&self) -> usize {
        self.host_ports.len()
    }

    pub fn entry_count(&self) -> usize {
        self.host_ports.values().map(Vec::len).sum()
    }
}

fn now_rfc3339() -> String {
    let now = OffsetDateTime::now_utc();
    now.format(&Rfc3339)
        .unwrap_or_else(|_| String::from("1970-01-01T00:00:00Z"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_text_form() {
        let e = PortEntry::new("80/tcp", "open", "http");
        assert_eq!(e.to_string(), "80/tcp [open] (http)");
        assert_eq!("80/tcp [open] (http)".parse::<PortEntry>().unwrap(), e);
    }

    #[test]
    fn entry_rejects_garbage() {
        assert!("80/tcp open http".parse::<PortEntry>().is_err());
        assert!("80/tcp [open] (http".parse::<PortEntry>().is_err());
        assert!(" [] ()".parse::<PortEntry>().is_err());
    }

    #[test]
    fn snapshot_uses_original_field_names() {
        let mut ports = HostPorts::new();
        ports.insert(
            "10.0.0.1".into(),
            vec![PortEntry::new("22/tcp", "open", "ssh")],
        );
        let snap = Snapshot::new("2025-01-01T00:00:00Z", ports);
        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["datetime"], "2025-01-01T00:00:00Z");
        assert_eq!(json["ports"]["10.0.0.1"][0], "22/tcp [open] (ssh)");
    }

    #[test]
    fn now_is_parseable() {
        let snap = Snapshot::now(HostPorts::new());
        assert!(snap.captured_at().is_ok());
        assert_eq!(snap.host_count(), 0);
        assert_eq!(snap.entry_count(), 0);
    }
}
