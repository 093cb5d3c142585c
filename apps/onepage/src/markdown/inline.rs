//! Inline span splitting: `**bold**`, e-mail addresses, URLs and `[text](url)` links.

use std::sync::OnceLock;

use regex::Regex;

/// A run of text with uniform inline styling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub text: String,
    pub bold: bool,
    /// Hyperlink target (`https://…` or `mailto:…`), if this span is a link.
    pub link: Option<String>,
}

impl Span {
    fn plain(text: &str, bold: bool) -> Self {
        Self {
            text: text.to_string(),
            bold,
            link: None,
        }
    }
}

fn bold_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\*\*(.+?)\*\*").expect("bold pattern"))
}

fn markdown_link_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[([^\]]+)\]\(([^)\s]+)\)").expect("link pattern"))
}

fn email_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}").expect("email pattern")
    })
}

// Bare domains only link when they carry a path, so "Node.js" stays plain text.
fn url_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?:https?://[^\s|,)]+|www\.[A-Za-z0-9.\-]+\.[A-Za-z]{2,}(?:/[^\s|,)]*)?|[A-Za-z0-9.\-]+\.[A-Za-z]{2,}/[^\s|,)]+)",
        )
        .expect("url pattern")
    })
}

/// Splits block text into styled spans.
///
/// `force_bold` marks every span bold (used for headings).
pub fn spans(text: &str, force_bold: bool) -> Vec<Span> {
    let mut out = Vec::new();
    let mut last = 0;

    for caps in bold_re().captures_iter(text) {
        let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if whole.start() > last {
            push_linked(&text[last..whole.start()], force_bold, &mut out);
        }
        push_linked(inner.as_str(), true, &mut out);
        last = whole.end();
    }
    if last < text.len() {
        push_linked(&text[last..], force_bold, &mut out);
    }

    out
}

/// Text with `**` markers removed and Markdown links reduced to their label.
pub fn plain_text(text: &str) -> String {
    let unbolded = bold_re().replace_all(text, "$1");
    markdown_link_re()
        .replace_all(&unbolded, "$1")
        .trim()
        .to_string()
}

/// Prefixes scheme-less URLs with `https://`.
pub fn normalize_url(url: &str) -> String {
    let url = url.trim();
    if url.starts_with("http://") || url.starts_with("https://") || url.starts_with("mailto:") {
        url.to_string()
    } else {
        format!("https://{url}")
    }
}

struct LinkMatch {
    start: usize,
    end: usize,
    label: String,
    target: String,
}

fn push_linked(segment: &str, bold: bool, out: &mut Vec<Span>) {
    let mut pos = 0;
    while pos < segment.len() {
        let Some(found) = next_link(segment, pos) else {
            break;
        };
        if found.start > pos {
            out.push(Span::plain(&segment[pos..found.start], bold));
        }
        out.push(Span {
            text: found.label,
            bold,
            link: Some(found.target),
        });
        pos = found.end;
    }
    if pos < segment.len() {
        out.push(Span::plain(&segment[pos..], bold));
    }
}

/// Earliest link starting at or after `pos`. Ties: Markdown link, then e-mail, then URL.
fn next_link(segment: &str, pos: usize) -> Option<LinkMatch> {
    let markdown = markdown_link_re()
        .captures_at(segment, pos)
        .and_then(|caps| {
            let whole = caps.get(0)?;
            Some(LinkMatch {
                start: whole.start(),
                end: whole.end(),
                label: caps[1].to_string(),
                target: normalize_url(&caps[2]),
            })
        });

    let email = email_re().find_at(segment, pos).map(|m| LinkMatch {
        start: m.start(),
        end: m.end(),
        label: m.as_str().to_string(),
        target: format!("mailto:{}", m.as_str()),
    });

    let url = url_re().find_at(segment, pos).map(|m| {
        let raw = m.as_str().trim_end_matches(['.', ';', ':', '!', '?']);
        LinkMatch {
            start: m.start(),
            end: m.start() + raw.len(),
            label: raw.to_string(),
            target: normalize_url(raw),
        }
    });

    [markdown, email, url]
        .into_iter()
        .flatten()
        .min_by_key(|m| m.start)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link_targets(spans: &[Span]) -> Vec<&str> {
        spans.iter().filter_map(|s| s.link.as_deref()).collect()
    }

    #[test]
    fn test_plain_text_single_span() {
        let out = spans("Windows, Active Directory, PowerShell", false);
        assert_eq!(out.len(), 1);
        assert!(!out[0].bold);
        assert!(out[0].link.is_none());
    }

    #[test]
    fn test_bold_segments_split() {
        let out = spans("**IT Support** | Acme Corp", false);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].text, "IT Support");
        assert!(out[0].bold);
        assert_eq!(out[1].text, " | Acme Corp");
        assert!(!out[1].bold);
    }

    #[test]
    fn test_force_bold_marks_everything() {
        let out = spans("**Title** rest", true);
        assert!(out.iter().all(|s| s.bold));
    }

    #[test]
    fn test_full_email_becomes_mailto() {
        let out = spans("jane.doe+cv@example.co.uk | 555-0100", false);
        assert_eq!(out[0].text, "jane.doe+cv@example.co.uk");
        assert_eq!(
            out[0].link.as_deref(),
            Some("mailto:jane.doe+cv@example.co.uk")
        );
        assert_eq!(out[1].text, " | 555-0100");
    }

    #[test]
    fn test_bare_profile_url_gets_https() {
        let out = spans("linkedin.com/in/janedoe | github.com/janedoe", false);
        assert_eq!(
            link_targets(&out),
            vec![
                "https://linkedin.com/in/janedoe",
                "https://github.com/janedoe"
            ]
        );
    }

    #[test]
    fn test_technology_names_not_linked() {
        let out = spans("Built dashboards with Node.js and ASP.NET", false);
        assert!(link_targets(&out).is_empty());
    }

    #[test]
    fn test_trailing_period_not_part_of_url() {
        let out = spans("See https://example.dev/portfolio.", false);
        assert_eq!(link_targets(&out), vec!["https://example.dev/portfolio"]);
        assert_eq!(out.last().unwrap().text, ".");
    }

    #[test]
    fn test_markdown_link_uses_label() {
        let out = spans("[Portfolio](janedoe.dev) and more", false);
        assert_eq!(out[0].text, "Portfolio");
        assert_eq!(out[0].link.as_deref(), Some("https://janedoe.dev"));
    }

    #[test]
    fn test_link_inside_bold_stays_bold() {
        let out = spans("**www.janedoe.dev**", false);
        assert_eq!(out.len(), 1);
        assert!(out[0].bold);
        assert_eq!(out[0].link.as_deref(), Some("https://www.janedoe.dev"));
    }

    #[test]
    fn test_plain_text_strips_markers() {
        assert_eq!(
            plain_text("**Small Business IT** & [Security](x.io/a) "),
            "Small Business IT & Security"
        );
    }

    #[test]
    fn test_normalize_url_keeps_scheme() {
        assert_eq!(normalize_url("http://a.io"), "http://a.io");
        assert_eq!(normalize_url("a.io/x"), "https://a.io/x");
    }
}
