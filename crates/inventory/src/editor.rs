use crate::document::{is_header, leading_token_is_ip, line_mentions};
use crate::{Inventory, InventoryError, Result, Role};
use std::net::IpAddr;

/// Where an address sits in the inventory relative to a requested role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Membership {
    InRole,
    InOtherRole(Role),
    Absent,
}

impl Inventory {
    /// Scans only `role`'s section and stops at the first match or at the next
    /// section header. A missing section counts as "no member".
    pub fn member_exists(&self, role: Role, ip: &str) -> bool {
        let Some(header) = self.header_index(role) else {
            return false;
        };
        self.lines()[header + 1..]
            .iter()
            .take_while(|line| !is_header(line))
            .any(|line| line_mentions(line, ip))
    }

    /// Reports whether `ip` is listed under `role`, under some other role, or
    /// nowhere. Other sections are only consulted when the role section has
    /// no match.
    pub fn locate(&self, role: Role, ip: &str) -> Membership {
        if self.member_exists(role, ip) {
            return Membership::InRole;
        }
        Role::ALL
            .into_iter()
            .filter(|other| *other != role)
            .find(|other| self.member_exists(*other, ip))
            .map_or(Membership::Absent, Membership::InOtherRole)
    }

    pub fn assert_absent(&self, role: Role, ip: &str) -> Result<()> {
        if self.member_exists(role, ip) {
            return Err(InventoryError::NodeExists {
                ip: ip.to_string(),
                role,
            });
        }
        Ok(())
    }

    pub fn assert_present(&self, role: Role, ip: &str) -> Result<()> {
        if !self.member_exists(role, ip) {
            return Err(InventoryError::NodeNotFound {
                ip: ip.to_string(),
                role,
            });
        }
        Ok(())
    }

    /// Adds `line` (`<ip> [metadata]`) to `role`'s section, right after the
    /// last line whose leading token is an IP address, or right after the
    /// header when the section has no members yet. Trailing comments and blank
    /// lines of the section stay below the new entry.
    ///
    /// Returns the index the line was written at. The document is untouched on
    /// error.
    pub fn insert(&mut self, role: Role, line: &str) -> Result<usize> {
        let line = line.trim();
        let ip = line.split_whitespace().next().unwrap_or_default();
        if ip.parse::<IpAddr>().is_err() {
            return Err(InventoryError::InvalidIp(ip.to_string()));
        }
        self.assert_absent(role, ip)?;

        let range = self
            .section_range(role)
            .ok_or_else(|| InventoryError::SectionNotFound {
                section: role.section().to_string(),
            })?;
        let header = range.start - 1;
        let last_member = self.lines()[range.clone()]
            .iter()
            .rposition(|candidate| leading_token_is_ip(candidate))
            .map(|offset| range.start + offset);
        let at = last_member.unwrap_or(header) + 1;

        self.lines_mut().insert(at, line.to_string());
        log::debug!("Inserted {ip} into {} at line {}", role.section(), at + 1);
        Ok(at)
    }

    /// Drops every line of `role`'s section that names `ip`. Lines in other
    /// sections are never touched. Returns how many lines were removed.
    pub fn remove(&mut self, role: Role, ip: &str) -> Result<usize> {
        let range = self
            .section_range(role)
            .ok_or_else(|| InventoryError::SectionNotFound {
                section: role.section().to_string(),
            })?;

        let doomed: Vec<usize> = range
            .filter(|idx| line_mentions(&self.lines()[*idx], ip))
            .collect();
        if doomed.is_empty() {
            return Err(InventoryError::NodeNotFound {
                ip: ip.to_string(),
                role,
            });
        }

        let lines = self.lines_mut();
        for idx in doomed.iter().rev() {
            lines.remove(*idx);
        }
        log::debug!("Removed {} line(s) for {ip} from {}", doomed.len(), role.section());
        Ok(doomed.len())
    }
}
