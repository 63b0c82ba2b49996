use tracing::{debug, trace};

use crate::types::{HostPorts, PortEntry};

const HOST_MARKER: &str = "scan report for ";
const PROTOCOLS: &[&str] = &["tcp", "udp", "sctp"];

/// Parse raw scanner text into a host → port entries map.
///
/// Only two kinds of lines matter; everything else (banners, progress,
/// blank lines, warnings) is skipped:
/// - `Nmap scan report for <host>` sets the current host. When the host is
///   printed as `name (1.2.3.4)` the address in parentheses wins.
/// - `<port>/<proto> <state> <service> [version...]` adds an entry for the
///   current host. Port lines before any host line are dropped.
///
/// Text with no recognizable lines yields an empty map.
pub fn parse_scan_output(text: &str) -> HostPorts {
    let mut out = HostPorts::new();
    let mut current_host: Option<String> = None;

    for raw_line in text.lines() {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(host) = parse_host_line(line) {
            trace!(%host, "host line");
            current_host = Some(host);
            continue;
        }

        let Some(host) = current_host.as_deref() else {
            continue;
        };
        if let Some(entry) = parse_port_line(line) {
            out.entry(host.to_string()).or_default().push(entry);
        }
    }

    debug!(
        hosts = out.len(),
        entries = out.values().map(Vec::len).sum::<usize>(),
        "parsed scanner output"
    );
    out
}

/// Extract the bare host identifier from a `scan report for` line.
fn parse_host_line(line: &str) -> Option<String> {
    let idx = line.find(HOST_MARKER)?;
    let rest = &line[idx + HOST_MARKER.len()..];
    let host = rest
        .split_whitespace()
        .last()?
        .trim_matches(|c| c == '(' || c == ')');
    if host.is_empty() {
        None
    } else {
        Some(host.to_string())
    }
}

fn parse_port_line(line: &str) -> Option<PortEntry> {
    let mut cols = line.split_whitespace();
    let port = cols.next()?;
    if !is_port_token(port) {
        return None;
    }
    let state = cols.next()?;
    let service = cols.next()?;
    Some(PortEntry::new(port, state, service))
}

/// `80/tcp`, `53/udp`, `2905/sctp`.
fn is_port_token(token: &str) -> bool {
    match token.split_once('/') {
        Some((num, proto)) => {
            !num.is_empty()
                && num.bytes().all(|b| b.is_ascii_digit())
                && PROTOCOLS.contains(&proto)
        }
        None => false,
    }
}
