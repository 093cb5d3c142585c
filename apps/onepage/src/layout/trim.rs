//! Content trimming. Last resort once every style lever is at its floor.
//!
//! Every function here takes a `Document` by reference and returns a new one.
//! Section spans are heading-scoped: a heading owns every block up to the next
//! heading of the same or a higher level.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::markdown::{Block, Document};

/// A content-specific trimming rule, applied in profile order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TrimRule {
    /// Remove a heading and everything it owns. Title match ignores case and `**`.
    DropSection { title: String },
    /// Under the first heading whose title contains `section`, keep only the
    /// first `keep` direct sub-headings (with their content).
    KeepOnlyEntries { section: String, keep: usize },
    /// Under every heading titled `heading`, keep only the first `keep` bullets.
    TrimBulletsUnder { heading: String, keep: usize },
}

impl TrimRule {
    pub fn apply(&self, document: &Document) -> Document {
        let blocks = document.blocks();
        let removed = match self {
            TrimRule::DropSection { title } => drop_section(blocks, title),
            TrimRule::KeepOnlyEntries { section, keep } => {
                keep_only_entries(blocks, section, *keep)
            }
            TrimRule::TrimBulletsUnder { heading, keep } => {
                trim_bullets_under(blocks, heading, *keep)
            }
        };
        document.without(&removed)
    }
}

impl std::fmt::Display for TrimRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrimRule::DropSection { title } => write!(f, "drop section '{title}'"),
            TrimRule::KeepOnlyEntries { section, keep } => {
                write!(f, "keep only {keep} entries under '{section}'")
            }
            TrimRule::TrimBulletsUnder { heading, keep } => {
                write!(f, "keep only {keep} bullets under '{heading}'")
            }
        }
    }
}

/// Index one past the last block owned by the heading at `start`.
fn span_end(blocks: &[Block], start: usize) -> usize {
    let level = blocks[start].level;
    blocks
        .iter()
        .enumerate()
        .skip(start + 1)
        .find(|(_, b)| b.is_heading() && b.level <= level)
        .map(|(i, _)| i)
        .unwrap_or(blocks.len())
}

fn drop_section(blocks: &[Block], title: &str) -> BTreeSet<usize> {
    let mut removed = BTreeSet::new();
    for (i, block) in blocks.iter().enumerate() {
        if block.is_heading()
            && !removed.contains(&i)
            && block.title().eq_ignore_ascii_case(title.trim())
        {
            removed.extend(i..span_end(blocks, i));
        }
    }
    removed
}

fn keep_only_entries(blocks: &[Block], section: &str, keep: usize) -> BTreeSet<usize> {
    let needle = section.trim().to_uppercase();
    let Some(start) = blocks
        .iter()
        .position(|b| b.is_heading() && b.title().to_uppercase().contains(&needle))
    else {
        return BTreeSet::new();
    };

    let end = span_end(blocks, start);
    let entry_level = blocks[start].level + 1;
    let mut removed = BTreeSet::new();
    let mut seen = 0usize;

    for i in start + 1..end {
        let block = &blocks[i];
        if block.is_heading() && block.level == entry_level {
            seen += 1;
            if seen > keep {
                removed.extend(i..span_end(blocks, i).min(end));
            }
        }
    }
    removed
}

fn trim_bullets_under(blocks: &[Block], heading: &str, keep: usize) -> BTreeSet<usize> {
    let mut removed = BTreeSet::new();
    let mut in_target = false;
    let mut kept = 0usize;

    for (i, block) in blocks.iter().enumerate() {
        if block.is_heading() {
            in_target = block.title().eq_ignore_ascii_case(heading.trim());
            kept = 0;
            continue;
        }
        if in_target && block.is_bullet() {
            kept += 1;
            if kept > keep {
                removed.insert(i);
            }
        }
    }
    removed
}

/// Drops the lowest-priority bullet: the last bullet of the largest bullet
/// group (bullets under the same heading), the later group winning ties.
///
/// A group never shrinks below `min_per_group`. Returns the dropped bullet's
/// text and the new document, or `None` when nothing can be dropped.
pub fn drop_lowest_priority_bullet(
    document: &Document,
    min_per_group: usize,
) -> Option<(String, Document)> {
    let mut groups: Vec<Vec<usize>> = Vec::new();
    let mut current: Vec<usize> = Vec::new();

    for (i, block) in document.blocks().iter().enumerate() {
        if block.is_heading() {
            if !current.is_empty() {
                groups.push(std::mem::take(&mut current));
            }
        } else if block.is_bullet() {
            current.push(i);
        }
    }
    if !current.is_empty() {
        groups.push(current);
    }

    let target = groups
        .iter()
        .filter(|g| g.len() > min_per_group)
        .fold(None::<&Vec<usize>>, |best, g| match best {
            Some(b) if b.len() > g.len() => Some(b),
            _ => Some(g),
        })?;

    let index = *target.last()?;
    let text = document.blocks()[index].text.clone();
    Some((text, document.without(&BTreeSet::from([index]))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markdown::parse;

    const RESUME: &str = "\
# Jane Doe
## PROFESSIONAL EXPERIENCE
### **Technical & IT Support Roles**
- Resolved tickets
- Imaged laptops
- Managed AD accounts
- Wrote runbooks
### Other Professional Experience
- Retail associate
- Barista
## TECHNICAL PROJECTS
### Windows Event Monitoring & Mini SOC Lab
- Forwarded logs
- Built alerts
### pfSense Firewall & Network Segmentation Lab
- Configured VLANs
### Small Business IT & Security Assessments
- Audited 5 offices
## EDUCATION
- B.S. Information Technology
";

    fn titles(doc: &Document) -> Vec<String> {
        doc.blocks().iter().map(|b| b.title()).collect()
    }

    #[test]
    fn test_drop_section_removes_owned_blocks_only() {
        let doc = parse(RESUME);
        let rule = TrimRule::DropSection {
            title: "Other Professional Experience".into(),
        };
        let out = rule.apply(&doc);
        assert_eq!(out.len(), doc.len() - 3);
        let t = titles(&out);
        assert!(!t.iter().any(|s| s == "Barista"));
        assert!(t.iter().any(|s| s == "TECHNICAL PROJECTS"));
    }

    #[test]
    fn test_drop_section_matches_through_bold_and_case() {
        let doc = parse(RESUME);
        let rule = TrimRule::DropSection {
            title: "technical & it support roles".into(),
        };
        let out = rule.apply(&doc);
        assert!(!titles(&out).iter().any(|s| s == "Wrote runbooks"));
        assert_eq!(out.len(), doc.len() - 5);
    }

    #[test]
    fn test_keep_only_entries_under_projects() {
        let doc = parse(RESUME);
        let rule = TrimRule::KeepOnlyEntries {
            section: "Technical Project".into(),
            keep: 2,
        };
        let out = rule.apply(&doc);
        let t = titles(&out);
        assert!(t.iter().any(|s| s == "pfSense Firewall & Network Segmentation Lab"));
        assert!(!t.iter().any(|s| s == "Small Business IT & Security Assessments"));
        assert!(!t.iter().any(|s| s == "Audited 5 offices"));
        assert!(t.iter().any(|s| s == "EDUCATION"));
    }

    #[test]
    fn test_trim_bullets_under_heading() {
        let doc = parse(RESUME);
        let rule = TrimRule::TrimBulletsUnder {
            heading: "Technical & IT Support Roles".into(),
            keep: 2,
        };
        let out = rule.apply(&doc);
        assert_eq!(out.len(), doc.len() - 2);
        let t = titles(&out);
        assert!(t.iter().any(|s| s == "Imaged laptops"));
        assert!(!t.iter().any(|s| s == "Managed AD accounts"));
    }

    #[test]
    fn test_rule_without_match_is_noop() {
        let doc = parse(RESUME);
        let rule = TrimRule::DropSection {
            title: "Volunteering".into(),
        };
        assert_eq!(rule.apply(&doc), doc);
    }

    #[test]
    fn test_drop_lowest_priority_picks_largest_group_tail() {
        let doc = parse(RESUME);
        let (text, out) = drop_lowest_priority_bullet(&doc, 1).unwrap();
        assert_eq!(text, "Wrote runbooks");
        assert_eq!(out.len(), doc.len() - 1);
    }

    #[test]
    fn test_drop_lowest_priority_later_group_wins_ties() {
        let doc = parse("## A\n- a1\n- a2\n## B\n- b1\n- b2\n");
        let (text, _) = drop_lowest_priority_bullet(&doc, 1).unwrap();
        assert_eq!(text, "b2");
    }

    #[test]
    fn test_drop_lowest_priority_respects_group_minimum() {
        let doc = parse("## A\n- a1\n## B\n- b1\n");
        assert!(drop_lowest_priority_bullet(&doc, 1).is_none());
        let (text, out) = drop_lowest_priority_bullet(&doc, 0).unwrap();
        assert_eq!(text, "b1");
        assert_eq!(out.bullet_count(), 1);
    }

    #[test]
    fn test_trim_rule_json_shape() {
        let rules: Vec<TrimRule> = serde_json::from_str(
            r#"[
                {"kind": "drop_section", "title": "Other Professional Experience"},
                {"kind": "keep_only_entries", "section": "TECHNICAL PROJECT", "keep": 2},
                {"kind": "trim_bullets_under", "heading": "Technical & IT Support Roles", "keep": 3}
            ]"#,
        )
        .unwrap();
        assert_eq!(rules.len(), 3);
        assert_eq!(
            rules[1],
            TrimRule::KeepOnlyEntries {
                section: "TECHNICAL PROJECT".into(),
                keep: 2
            }
        );
    }
}
