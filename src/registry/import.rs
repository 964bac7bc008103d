//! Bulk loading of ban lists from text.
//!
//! ```text
//! # comment
//! [category=full]
//! 203.0.113.0/24 spam ring
//!
//! [category=partial, creator=12]
//! 45.0.0.0/8 open proxies
//! ```
//!
//! Each entry line is an address or subnet followed by the ban reason.
//! Lines before the first header are full bans by the importing creator.
//! Entries under a header that fails to parse are reported and skipped
//! until the next valid header.

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read};

use super::BanRegistry;
use crate::error::Result;
use crate::record::{BanRecord, CreatorId};
use crate::Category;

/// A line that could not be imported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportFailure {
    /// 1-based line number
    pub line: usize,
    pub text: String,
    pub error: String,
}

/// Outcome of [`BanRegistry::import_from_reader`].
#[derive(Debug, Clone, Default)]
pub struct ImportReport {
    pub created: Vec<BanRecord>,
    pub rejected: Vec<ImportFailure>,
}

impl ImportReport {
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}

impl BanRegistry {
    /// Create bans from a text ban list.
    ///
    /// Every entry goes through the same validation as
    /// [`create`](BanRegistry::create); rejected entries are reported, not
    /// fatal. Only a read error aborts the import.
    pub fn import_from_reader<R: Read>(&self, reader: R, creator: CreatorId) -> Result<ImportReport> {
        let mut report = ImportReport::default();
        let mut category = Category::Full;
        let mut section_creator = creator;
        // Line of the rejected header whose entries are being skipped
        let mut bad_section: Option<usize> = None;

        for (idx, line) in BufReader::new(reader).lines().enumerate() {
            let line = line?;
            let line_no = idx + 1;

            // Remove comments
            let content = match line.find('#') {
                Some(pos) => &line[..pos],
                None => line.as_str(),
            };
            let content = content.trim();
            if content.is_empty() {
                continue;
            }

            if content.starts_with('[') && content.ends_with(']') {
                let params = parse_header_params(&content[1..content.len() - 1]);
                match parse_section(&params, creator) {
                    Ok((c, who)) => {
                        category = c;
                        section_creator = who;
                        bad_section = None;
                    }
                    Err(error) => {
                        bad_section = Some(line_no);
                        report.rejected.push(ImportFailure {
                            line: line_no,
                            text: content.to_string(),
                            error,
                        });
                    }
                }
                continue;
            }

            if let Some(header) = bad_section {
                report.rejected.push(ImportFailure {
                    line: line_no,
                    text: content.to_string(),
                    error: format!("section header on line {header} was rejected"),
                });
                continue;
            }

            let (address, reason) = match content.split_once(char::is_whitespace) {
                Some((address, reason)) => (address, reason.trim()),
                None => (content, ""),
            };
            match self.create_from_str(address, category, section_creator, reason) {
                Ok(record) => report.created.push(record),
                Err(e) => {
                    log::debug!("Import line {} rejected: {}", line_no, e);
                    report.rejected.push(ImportFailure {
                        line: line_no,
                        text: content.to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }

        log::info!(
            "Imported {} bans ({} rejected)",
            report.created.len(),
            report.rejected.len()
        );
        Ok(report)
    }
}

fn parse_section(
    params: &HashMap<String, String>,
    default_creator: CreatorId,
) -> std::result::Result<(Category, CreatorId), String> {
    let category = match params.get("category") {
        Some(value) => Category::parse(value).ok_or_else(|| format!("unknown category: {value}"))?,
        None => return Err("section header needs a category".to_string()),
    };
    let creator = match params.get("creator") {
        Some(value) => value
            .parse::<u64>()
            .map(CreatorId)
            .map_err(|_| format!("invalid creator id: {value}"))?,
        None => default_creator,
    };
    Ok((category, creator))
}

/// Parse header parameters from a string like "category=full,creator=3"
fn parse_header_params(content: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();

    for part in content.split(',') {
        let part = part.trim();
        if let Some((key, value)) = part.split_once('=') {
            params.insert(key.trim().to_lowercase(), value.trim().to_string());
        } else if !part.is_empty() {
            params.insert(part.to_lowercase(), String::new());
        }
    }

    params
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AddressSpec;

    const BAN_LIST: &str = r#"
# Known abuse
198.51.100.0/24 credential stuffing

[category=full]
203.0.113.0/24 spam ring   # reported twice
203.0.113.7 inside the ring above
10.0.0.1 private

[category=partial, creator=12]
45.0.0.0/8 open proxies
2001:db8::/32 hosting range

[category=harsh]
192.0.2.1 unreachable section
"#;

    #[test]
    fn test_import_ban_list() {
        let registry = BanRegistry::in_memory();
        let report = registry
            .import_from_reader(BAN_LIST.as_bytes(), CreatorId(1))
            .unwrap();

        let created: Vec<String> = report.created.iter().map(|r| r.subnet.to_string()).collect();
        assert_eq!(
            created,
            vec![
                "198.51.100.0/24",
                "203.0.113.0/24",
                "45.0.0.0/8",
                "2001:db8::/32",
            ]
        );
        assert_eq!(report.created[1].reason, "spam ring");
        assert_eq!(report.created[2].category, Category::Partial);
        assert_eq!(report.created[2].creator_id, CreatorId(12));

        let failed: Vec<usize> = report.rejected.iter().map(|f| f.line).collect();
        assert_eq!(failed, vec![7, 8, 14, 15]);
        assert!(report.rejected[3].error.contains("line 14"));
        assert!(report.rejected[0].error.contains("already banned"));
        assert!(!report.is_clean());

        let addr = AddressSpec::parse("45.1.2.3").unwrap();
        assert!(registry.check(&addr, Category::Partial).is_some());
    }

    #[test]
    fn test_entries_after_bad_header_are_skipped() {
        let list = "[category=partial]\n\
                    45.0.0.0/8 proxies\n\
                    [category=partail]\n\
                    198.51.100.0/24 meant partial\n\
                    [category=full]\n\
                    203.0.113.0/24 spam\n";
        let registry = BanRegistry::in_memory();
        let report = registry.import_from_reader(list.as_bytes(), CreatorId(1)).unwrap();

        let created: Vec<(String, Category)> = report
            .created
            .iter()
            .map(|r| (r.subnet.to_string(), r.category))
            .collect();
        assert_eq!(
            created,
            vec![
                ("45.0.0.0/8".to_string(), Category::Partial),
                ("203.0.113.0/24".to_string(), Category::Full),
            ]
        );
        let failed: Vec<usize> = report.rejected.iter().map(|f| f.line).collect();
        assert_eq!(failed, vec![3, 4]);
        assert!(report.rejected[0].error.contains("partail"));

        let addr = AddressSpec::parse("198.51.100.1").unwrap();
        assert!(registry.check(&addr, Category::Full).is_none());
        assert!(registry.check(&addr, Category::Partial).is_none());
    }

    #[test]
    fn test_missing_reason_rejected() {
        let registry = BanRegistry::in_memory();
        let report = registry
            .import_from_reader("203.0.113.0/24\n".as_bytes(), CreatorId(1))
            .unwrap();
        assert!(report.created.is_empty());
        assert!(report.rejected[0].error.contains("missing_reason"));
    }

    #[test]
    fn test_parse_header_params() {
        let params = parse_header_params("category=partial, creator = 4,strict");
        assert_eq!(params.get("category").map(String::as_str), Some("partial"));
        assert_eq!(params.get("creator").map(String::as_str), Some("4"));
        assert!(params.contains_key("strict"));
    }
}
