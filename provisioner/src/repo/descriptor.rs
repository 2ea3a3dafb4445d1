//! Line-preserving model of a yum repository descriptor.
//!
//! Descriptors are INI documents. Rewrites must leave everything they do not
//! touch byte-identical, so the model keeps every line's original text and
//! only classifies it. Rendering joins the (possibly edited) text back
//! together.

use std::fmt;
use thiserror::Error;

/// Errors raised when a descriptor cannot be parsed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DescriptorParseError {
    /// A `key=value` line appears before the first section header.
    #[error("line {line}: entry outside of any section")]
    EntryOutsideSection {
        /// One-based line number.
        line: usize,
    },

    /// A section header is missing its closing bracket.
    #[error("line {line}: unterminated section header")]
    UnterminatedSection {
        /// One-based line number.
        line: usize,
    },

    /// A section header has no name.
    #[error("line {line}: empty section name")]
    EmptySectionName {
        /// One-based line number.
        line: usize,
    },

    /// An entry has an empty key.
    #[error("line {line}: entry has an empty key")]
    EmptyKey {
        /// One-based line number.
        line: usize,
    },

    /// A line is neither a header, an entry, a comment, nor a continuation.
    #[error("line {line}: cannot parse {text:?}")]
    MalformedLine {
        /// One-based line number.
        line: usize,
        /// The offending text.
        text: String,
    },
}

/// Classification of a single descriptor line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind {
    /// Empty or whitespace-only.
    Blank,
    /// Starts with `#` or `;`.
    Comment,
    /// `[name]`.
    Section(String),
    /// `key=value`, with the key lower-cased and both sides trimmed.
    Entry {
        /// Entry key.
        key: String,
        /// Entry value.
        value: String,
    },
    /// An indented line extending the previous entry's value.
    Continuation,
}

/// One line of a descriptor: its original text and classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    text: String,
    kind: LineKind,
}

impl Line {
    /// The line's current text, without a line terminator.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The line's classification.
    #[must_use]
    pub fn kind(&self) -> &LineKind {
        &self.kind
    }

    /// Replace the text of an existing line, reclassifying it.
    ///
    /// Only entries, comments, and continuations are meant to be edited;
    /// the caller is responsible for keeping the document well formed.
    pub(crate) fn set_text(&mut self, text: String) {
        self.kind = match &self.kind {
            LineKind::Continuation => LineKind::Continuation,
            _ => classify_simple(&text),
        };
        self.text = text;
    }
}

/// A `baseurl` or `mirrorlist` directive and whether it is in effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDirective {
    /// The directive's URL, as written.
    pub url: String,
    /// `false` when the directive is commented out.
    pub enabled: bool,
}

/// Read-only view of one repository section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositorySection {
    /// Section name, the repository id.
    pub name: String,
    /// Active or commented-out `baseurl` directives, in file order.
    pub baseurls: Vec<SourceDirective>,
    /// Active or commented-out `mirrorlist` directives, in file order.
    pub mirrorlists: Vec<SourceDirective>,
    /// Parsed `gpgcheck` value, if present.
    pub gpgcheck: Option<bool>,
}

impl RepositorySection {
    /// Number of active `baseurl` and `mirrorlist` directives.
    #[must_use]
    pub fn active_sources(&self) -> usize {
        self.baseurls
            .iter()
            .chain(&self.mirrorlists)
            .filter(|directive| directive.enabled)
            .count()
    }
}

/// A parsed repository descriptor.
///
/// # Examples
///
/// ```
/// use envforge_provisioner::repo::descriptor::RepositoryDescriptor;
///
/// let text = "[base]\nmirrorlist=http://mirrorlist.example/?repo=os\ngpgcheck=1\n";
/// let descriptor = RepositoryDescriptor::parse(text).expect("well formed");
/// let sections = descriptor.sections();
/// assert_eq!(sections.len(), 1);
/// assert_eq!(sections[0].gpgcheck, Some(true));
/// assert_eq!(descriptor.to_string(), text);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryDescriptor {
    lines: Vec<Line>,
    trailing_newline: bool,
}

impl RepositoryDescriptor {
    /// Parse descriptor text.
    ///
    /// # Errors
    ///
    /// Returns a [`DescriptorParseError`] describing the first malformed
    /// line.
    pub fn parse(text: &str) -> Result<Self, DescriptorParseError> {
        let mut lines = Vec::new();
        let mut in_section = false;

        for (index, raw) in text.lines().enumerate() {
            let number = index + 1;
            let kind = classify(raw, number, lines.last().map(Line::kind))?;
            match &kind {
                LineKind::Section(_) => in_section = true,
                LineKind::Entry { .. } if !in_section => {
                    return Err(DescriptorParseError::EntryOutsideSection { line: number });
                }
                _ => {}
            }
            lines.push(Line {
                text: raw.to_owned(),
                kind,
            });
        }

        Ok(Self {
            lines,
            trailing_newline: text.ends_with('\n'),
        })
    }

    /// All lines in file order.
    #[must_use]
    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub(crate) fn lines_mut(&mut self) -> &mut [Line] {
        &mut self.lines
    }

    /// Summarise each section's source directives.
    #[must_use]
    pub fn sections(&self) -> Vec<RepositorySection> {
        let mut sections: Vec<RepositorySection> = Vec::new();
        for line in &self.lines {
            if let LineKind::Section(name) = &line.kind {
                sections.push(RepositorySection {
                    name: name.clone(),
                    ..RepositorySection::default()
                });
                continue;
            }
            let Some(section) = sections.last_mut() else {
                continue;
            };
            let directive = match &line.kind {
                LineKind::Entry { key, value } => Some((key.clone(), value.clone(), true)),
                LineKind::Comment => {
                    commented_entry(&line.text).map(|(key, value)| (key, value, false))
                }
                _ => None,
            };
            let Some((key, value, enabled)) = directive else {
                continue;
            };
            match key.as_str() {
                "baseurl" => section.baseurls.push(SourceDirective { url: value, enabled }),
                "mirrorlist" => section
                    .mirrorlists
                    .push(SourceDirective { url: value, enabled }),
                "gpgcheck" if enabled => section.gpgcheck = parse_flag(&value),
                _ => {}
            }
        }
        sections
    }
}

impl fmt::Display for RepositoryDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, line) in self.lines.iter().enumerate() {
            if index > 0 {
                f.write_str("\n")?;
            }
            f.write_str(&line.text)?;
        }
        if self.trailing_newline {
            f.write_str("\n")?;
        }
        Ok(())
    }
}

/// Interpret a comment line as a disabled `key=value` entry.
///
/// Accepts any run of `#` or `;` markers followed by optional whitespace,
/// so `#baseurl=...` and `# baseurl=...` both qualify.
#[must_use]
pub fn commented_entry(text: &str) -> Option<(String, String)> {
    let body = text
        .trim_start()
        .strip_prefix(['#', ';'])?
        .trim_start_matches(['#', ';'])
        .trim_start();
    let (key, value) = body.split_once('=')?;
    let key = key.trim();
    let is_key = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    is_key.then(|| (key.to_ascii_lowercase(), value.trim().to_owned()))
}

fn classify(
    raw: &str,
    number: usize,
    previous: Option<&LineKind>,
) -> Result<LineKind, DescriptorParseError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(LineKind::Blank);
    }
    if trimmed.starts_with(['#', ';']) {
        return Ok(LineKind::Comment);
    }
    let indented = raw.starts_with([' ', '\t']);
    if indented && matches!(previous, Some(LineKind::Entry { .. } | LineKind::Continuation)) {
        return Ok(LineKind::Continuation);
    }
    if let Some(header) = trimmed.strip_prefix('[') {
        let name = header
            .strip_suffix(']')
            .ok_or(DescriptorParseError::UnterminatedSection { line: number })?
            .trim();
        if name.is_empty() {
            return Err(DescriptorParseError::EmptySectionName { line: number });
        }
        return Ok(LineKind::Section(name.to_owned()));
    }
    let Some((key, value)) = trimmed.split_once('=') else {
        return Err(DescriptorParseError::MalformedLine {
            line: number,
            text: raw.to_owned(),
        });
    };
    let key = key.trim();
    if key.is_empty() {
        return Err(DescriptorParseError::EmptyKey { line: number });
    }
    Ok(LineKind::Entry {
        key: key.to_ascii_lowercase(),
        value: value.trim().to_owned(),
    })
}

/// Classify an edited line, where no parse error can be reported.
fn classify_simple(text: &str) -> LineKind {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return LineKind::Blank;
    }
    if trimmed.starts_with(['#', ';']) {
        return LineKind::Comment;
    }
    match trimmed.split_once('=') {
        Some((key, value)) => LineKind::Entry {
            key: key.trim().to_ascii_lowercase(),
            value: value.trim().to_owned(),
        },
        None => LineKind::Comment,
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "yes" | "true" | "on" => Some(true),
        "0" | "no" | "false" | "off" => Some(false),
        _ => None,
    }
}
