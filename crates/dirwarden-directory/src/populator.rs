//! LDIF-based directory seeding.
//!
//! Loads an LDIF file at startup so a fresh directory (or a demo
//! environment) starts with a usable tree. When the file was written
//! against a different base DN than the one configured, every
//! occurrence of that default base is rewritten before loading.
//! Optionally clears the existing subtree first.

use std::path::PathBuf;

use base64::Engine;
use dirwarden_core::Dn;
use ldap3::Scope;
use tracing::{debug, info, warn};

use crate::error::{DirectoryError, DirectoryResult};
use crate::ldap::LdapHandle;

/// One entry from an LDIF file: a DN plus its attribute lines in file
/// order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LdifEntry {
    pub dn: String,
    pub attrs: Vec<(String, String)>,
}

/// Seeds the directory from an LDIF file.
pub struct LdifPopulator {
    handle: LdapHandle,
    path: PathBuf,
    default_base: String,
    clean: bool,
}

impl LdifPopulator {
    /// Create a populator for the given file.
    ///
    /// `default_base` is the base DN the LDIF file was written against;
    /// it is rewritten to the configured base when the two differ.
    pub fn new(
        handle: LdapHandle,
        path: impl Into<PathBuf>,
        default_base: impl Into<String>,
    ) -> Self {
        Self {
            handle,
            path: path.into(),
            default_base: default_base.into(),
            clean: false,
        }
    }

    /// Delete the existing subtree under the base DN before loading.
    #[must_use]
    pub fn with_clean(mut self, clean: bool) -> Self {
        self.clean = clean;
        self
    }

    /// Load the file into the directory.
    ///
    /// Entries that already exist are skipped with a warning so the
    /// populator can run against a pre-seeded server.
    pub async fn populate(&self) -> DirectoryResult<()> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            DirectoryError::invalid_configuration(format!(
                "cannot read LDIF file {}: {e}",
                self.path.display()
            ))
        })?;

        let configured = Dn::parse(&self.handle.config().base_dn)?;
        let default = Dn::parse(&self.default_base)?;
        let content = if configured == default {
            content
        } else {
            rewrite_base(&content, &self.default_base, &self.handle.config().base_dn)
        };

        let entries = parse_ldif(&content)?;

        if self.clean {
            self.clear_subtree().await?;
        }

        let mut loaded = 0usize;
        for entry in &entries {
            match self.add_entry(entry).await {
                Ok(()) => loaded += 1,
                Err(DirectoryError::AlreadyExists { identifier }) => {
                    warn!(dn = %identifier, "entry already exists, skipping");
                }
                Err(e) => return Err(e),
            }
        }

        info!(
            file = %self.path.display(),
            total = entries.len(),
            loaded,
            "LDIF population complete"
        );
        Ok(())
    }

    async fn add_entry(&self, entry: &LdifEntry) -> DirectoryResult<()> {
        use std::collections::HashSet;

        let mut ldap = self.handle.get().await?;

        let mut grouped: Vec<(String, HashSet<String>)> = Vec::new();
        for (name, value) in &entry.attrs {
            match grouped.iter_mut().find(|(n, _)| n.eq_ignore_ascii_case(name)) {
                Some((_, values)) => {
                    values.insert(value.clone());
                }
                None => {
                    let mut values = HashSet::new();
                    values.insert(value.clone());
                    grouped.push((name.clone(), values));
                }
            }
        }

        let result = ldap.add(&entry.dn, grouped).await.map_err(|e| {
            DirectoryError::write_failed_with_source(
                format!("failed to load LDIF entry {}", entry.dn),
                e,
            )
        })?;
        super::ldap::check_result("add", &entry.dn, result.rc, &result.text)?;

        debug!(dn = %entry.dn, "LDIF entry loaded");
        Ok(())
    }

    /// Delete every entry strictly under the base DN, leaf-first.
    async fn clear_subtree(&self) -> DirectoryResult<()> {
        let mut ldap = self.handle.get().await?;
        let base = self.handle.config().base_dn.clone();

        let result = ldap
            .search(&base, Scope::Subtree, "(objectClass=*)", vec!["1.1"])
            .await
            .map_err(|e| DirectoryError::search_failed_with_source("subtree scan failed", e))?;

        let entries = match result.success() {
            Ok((entries, _res)) => entries,
            // Nothing to clean on a virgin server.
            Err(ldap3::LdapError::LdapResult { result }) if result.rc == 32 => return Ok(()),
            Err(e) => {
                return Err(DirectoryError::search_failed_with_source(
                    "subtree scan failed",
                    e,
                ))
            }
        };

        let base_dn = Dn::parse(&base)?;
        let mut dns: Vec<Dn> = Vec::new();
        for entry in entries {
            let dn = Dn::parse(&ldap3::SearchEntry::construct(entry).dn)?;
            if dn != base_dn {
                dns.push(dn);
            }
        }
        // Children before parents.
        dns.sort_by_key(|dn| std::cmp::Reverse(dn.len()));

        for dn in dns {
            let target = dn.to_string();
            let result = ldap.delete(&target).await.map_err(|e| {
                DirectoryError::write_failed_with_source(format!("failed to delete {target}"), e)
            })?;
            if result.rc != 0 && result.rc != 32 {
                return Err(DirectoryError::write_failed(format!(
                    "LDAP delete on '{target}' failed with code {}: {}",
                    result.rc, result.text
                )));
            }
        }

        info!(base = %base, "existing subtree cleared");
        Ok(())
    }
}

/// Replace the default base DN with the configured one, line by line.
fn rewrite_base(content: &str, from: &str, to: &str) -> String {
    let mut out = String::with_capacity(content.len());
    for line in content.lines() {
        out.push_str(&line.replace(from, to));
        out.push('\n');
    }
    out
}

/// Minimal LDIF reader: `dn:` records separated by blank lines,
/// `attr: value` / `attr:: base64` lines, leading-space continuations,
/// `#` comments.
pub fn parse_ldif(content: &str) -> DirectoryResult<Vec<LdifEntry>> {
    // Unfold continuation lines first.
    let mut logical: Vec<String> = Vec::new();
    for raw in content.lines() {
        if let Some(rest) = raw.strip_prefix(' ') {
            if let Some(last) = logical.last_mut() {
                last.push_str(rest);
                continue;
            }
        }
        logical.push(raw.to_string());
    }

    let mut entries = Vec::new();
    let mut current: Option<LdifEntry> = None;

    for line in &logical {
        let line = line.trim_end();
        if line.is_empty() {
            if let Some(entry) = current.take() {
                entries.push(entry);
            }
            continue;
        }
        if line.starts_with('#') || line.starts_with("version:") {
            continue;
        }

        let (name, value) = parse_attr_line(line)?;

        if name.eq_ignore_ascii_case("dn") {
            if let Some(entry) = current.take() {
                entries.push(entry);
            }
            current = Some(LdifEntry {
                dn: value,
                attrs: Vec::new(),
            });
        } else if let Some(entry) = current.as_mut() {
            entry.attrs.push((name, value));
        } else {
            return Err(DirectoryError::invalid_configuration(format!(
                "LDIF attribute line before any dn: '{line}'"
            )));
        }
    }
    if let Some(entry) = current.take() {
        entries.push(entry);
    }

    Ok(entries)
}

fn parse_attr_line(line: &str) -> DirectoryResult<(String, String)> {
    let colon = line.find(':').ok_or_else(|| {
        DirectoryError::invalid_configuration(format!("LDIF line without ':': '{line}'"))
    })?;
    let name = line[..colon].trim().to_string();
    let rest = &line[colon + 1..];

    // "name:: value" is base64-encoded.
    if let Some(encoded) = rest.strip_prefix(':') {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|e| {
                DirectoryError::invalid_configuration(format!(
                    "invalid base64 in LDIF line '{line}': {e}"
                ))
            })?;
        let value = String::from_utf8(bytes).map_err(|e| {
            DirectoryError::invalid_configuration(format!(
                "non-UTF-8 base64 value in LDIF line '{line}': {e}"
            ))
        })?;
        return Ok((name, value));
    }

    Ok((name, rest.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
# seed data
version: 1

dn: dc=example,dc=com
objectClass: top
objectClass: domain
dc: example

dn: ou=people,dc=example,dc=com
objectClass: organizationalUnit
ou: people

dn: cn=Alice Smith,ou=people,dc=example,dc=com
objectClass: inetOrgPerson
cn: Alice Smith
sn: Smith
description: a line that is
 folded onto the next
mail:: YWxpY2VAZXhhbXBsZS5jb20=
";

    #[test]
    fn parses_records_and_attributes() {
        let entries = parse_ldif(SAMPLE).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].dn, "dc=example,dc=com");
        assert_eq!(
            entries[0]
                .attrs
                .iter()
                .filter(|(n, _)| n == "objectClass")
                .count(),
            2
        );
    }

    #[test]
    fn unfolds_continuation_lines() {
        let entries = parse_ldif(SAMPLE).unwrap();
        let alice = &entries[2];
        let description = alice
            .attrs
            .iter()
            .find(|(n, _)| n == "description")
            .map(|(_, v)| v.as_str())
            .unwrap();
        assert_eq!(description, "a line that is folded onto the next");
    }

    #[test]
    fn decodes_base64_values() {
        let entries = parse_ldif(SAMPLE).unwrap();
        let alice = &entries[2];
        let mail = alice
            .attrs
            .iter()
            .find(|(n, _)| n == "mail")
            .map(|(_, v)| v.as_str())
            .unwrap();
        assert_eq!(mail, "alice@example.com");
    }

    #[test]
    fn rejects_attribute_before_dn() {
        assert!(parse_ldif("objectClass: top\n").is_err());
    }

    #[test]
    fn rewrites_default_base() {
        let rewritten = rewrite_base(SAMPLE, "dc=example,dc=com", "dc=corp,dc=net");
        assert!(rewritten.contains("dn: ou=people,dc=corp,dc=net"));
        assert!(!rewritten.contains("dc=example,dc=com"));
    }
}
