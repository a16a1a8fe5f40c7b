use crate::Role;
use std::net::IpAddr;
use std::ops::Range;

/// In-memory copy of an inventory file.
///
/// The document is kept as raw lines so that comments, blank lines, variable
/// blocks and unknown sections survive a rewrite untouched. Only the three
/// role sections are interpreted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inventory {
    lines: Vec<String>,
}

/// One machine line inside a role section: `<ip> [metadata...]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeEntry {
    pub address: IpAddr,
    pub metadata: Option<String>,
}

impl NodeEntry {
    /// Parses a section line. Returns `None` for comments, blank lines and
    /// lines whose leading token is not an IP address.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }
        let (head, rest) = match line.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (line, ""),
        };
        let address = head.parse::<IpAddr>().ok()?;
        let metadata = (!rest.is_empty()).then(|| rest.to_string());
        Some(Self { address, metadata })
    }

    pub fn render(&self) -> String {
        match &self.metadata {
            Some(meta) => format!("{} {meta}", self.address),
            None => self.address.to_string(),
        }
    }
}

pub(crate) fn is_header(line: &str) -> bool {
    let line = line.trim();
    line.len() >= 2 && line.starts_with('[') && line.ends_with(']')
}

pub(crate) fn is_comment_or_blank(line: &str) -> bool {
    let line = line.trim();
    line.is_empty() || line.starts_with('#')
}

pub(crate) fn leading_token_is_ip(line: &str) -> bool {
    line.split_whitespace()
        .next()
        .is_some_and(|token| token.parse::<IpAddr>().is_ok())
}

/// Whether a section line names `ip`, either as its leading token or as a
/// whitespace-delimited token further along (connection hints, labels).
pub(crate) fn line_mentions(line: &str, ip: &str) -> bool {
    if is_comment_or_blank(line) {
        return false;
    }
    line.split_whitespace().any(|token| token == ip)
}

impl Inventory {
    pub fn parse(text: &str) -> Self {
        Self {
            lines: text.lines().map(str::to_string).collect(),
        }
    }

    /// Serializes the whole document with a single trailing newline.
    pub fn render(&self) -> String {
        let mut out = self.lines.join("\n");
        out.push('\n');
        out
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub(crate) fn lines_mut(&mut self) -> &mut Vec<String> {
        &mut self.lines
    }

    /// Index of the header line that opens `role`'s section.
    pub fn header_index(&self, role: Role) -> Option<usize> {
        self.lines.iter().position(|line| role.matches_header(line))
    }

    /// Line range of the section body: everything after the header up to the
    /// next header or the end of the document.
    pub fn section_range(&self, role: Role) -> Option<Range<usize>> {
        let header = self.header_index(role)?;
        let start = header + 1;
        let len = self.lines[start..]
            .iter()
            .take_while(|line| !is_header(line))
            .count();
        Some(start..start + len)
    }

    pub fn section_lines(&self, role: Role) -> Option<&[String]> {
        self.section_range(role).map(|range| &self.lines[range])
    }

    /// Parsed member lines of a section, in document order.
    pub fn entries(&self, role: Role) -> Vec<NodeEntry> {
        self.section_lines(role)
            .unwrap_or_default()
            .iter()
            .filter_map(|line| NodeEntry::parse(line))
            .collect()
    }

    /// Reads a top-level `KEY=value` or `KEY="value"` assignment, as found in
    /// the `[all:vars]` block of the templates.
    pub fn variable(&self, key: &str) -> Option<String> {
        self.lines.iter().find_map(|line| {
            let line = line.trim();
            let (name, value) = line.split_once('=')?;
            if name.trim() != key {
                return None;
            }
            Some(value.trim().trim_matches(|c| c == '"' || c == '\'').to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = "\
# cluster demo
[etcd]
10.0.0.1 NODE_NAME=etcd1

[kube_master]
10.0.0.1 k8s_nodename='master-01'
10.0.0.2
# 10.0.0.9 retired

[kube_node]
10.0.0.4

[all:vars]
CLUSTER_NETWORK=\"calico\"
";

    #[test]
    fn section_range_stops_at_next_header() {
        let doc = Inventory::parse(SAMPLE);
        let lines = doc.section_lines(Role::Master).unwrap();
        assert_eq!(
            lines,
            [
                "10.0.0.1 k8s_nodename='master-01'",
                "10.0.0.2",
                "# 10.0.0.9 retired",
                ""
            ]
        );
    }

    #[test]
    fn entries_skip_comments_and_blank_lines() {
        let doc = Inventory::parse(SAMPLE);
        let entries = doc.entries(Role::Master);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].address.to_string(), "10.0.0.1");
        assert_eq!(
            entries[0].metadata.as_deref(),
            Some("k8s_nodename='master-01'")
        );
        assert_eq!(entries[1].metadata, None);
    }

    #[test]
    fn reads_declared_variables() {
        let doc = Inventory::parse(SAMPLE);
        assert_eq!(doc.variable("CLUSTER_NETWORK").as_deref(), Some("calico"));
        assert_eq!(doc.variable("SERVICE_CIDR"), None);
    }

    #[test]
    fn render_ends_with_single_newline() {
        let doc = Inventory::parse("[etcd]\n10.0.0.1");
        assert_eq!(doc.render(), "[etcd]\n10.0.0.1\n");
    }

    #[test]
    fn mentions_requires_whole_token() {
        assert!(line_mentions("10.0.0.1 name=a", "10.0.0.1"));
        assert!(line_mentions("node-a 10.0.0.1 zone=b", "10.0.0.1"));
        assert!(!line_mentions("10.0.0.10", "10.0.0.1"));
        assert!(!line_mentions("# 10.0.0.1", "10.0.0.1"));
    }
}
