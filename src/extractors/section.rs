// src/extractors/section.rs

// --- Imports ---
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

// --- Constants ---
/// Longest span returned when no closing heading can be found.
pub const DEFAULT_MAX_SPAN_LEN: usize = 30_000;
/// Bytes past the chosen heading's start before the closing-heading search begins.
pub const DEFAULT_BOUNDARY_SKIP: usize = 50;
/// Window inspected after a heading whose line has no break.
pub const DEFAULT_TOC_LOOKAHEAD: usize = 100;

// --- Known Sections (static lookup table) ---
struct KnownSection {
    id: SectionId,
    label: &'static str,
    title: &'static str,
    pattern: &'static str,
    following: &'static str,
    opens_part_one: bool,
}

// Each pattern needs the item number AND a fragment of the title, so bare
// "Item 1" cross-references and footnotes never qualify.
static KNOWN_SECTIONS: [KnownSection; 4] = [
    KnownSection {
        id: SectionId::Business,
        label: "Item 1",
        title: "Business",
        pattern: r"(?i)Item\s+1[.\s]+Business",
        following: "Item 1A",
        opens_part_one: true,
    },
    KnownSection {
        id: SectionId::RiskFactors,
        label: "Item 1A",
        title: "Risk Factors",
        pattern: r"(?i)Item\s+1A[.\s]+Risk\s+Factors",
        following: "Item 1B",
        opens_part_one: false,
    },
    KnownSection {
        id: SectionId::ManagementDiscussion,
        label: "Item 7",
        title: "Management's Discussion and Analysis",
        pattern: r"(?i)Item\s+7[.\s]+Management",
        following: "Item 7A",
        opens_part_one: false,
    },
    KnownSection {
        id: SectionId::QuantitativeDisclosures,
        label: "Item 7A",
        title: "Quantitative and Qualitative Disclosures About Market Risk",
        pattern: r"(?i)Item\s+7A[.\s]+Quantitative",
        following: "Item 8",
        opens_part_one: false,
    },
];

static KNOWN_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    KNOWN_SECTIONS
        .iter()
        .map(|s| Regex::new(s.pattern).expect("Failed to compile known section pattern"))
        .collect()
});

static PART_ONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bPART\s+I\b").expect("Failed to compile PART_ONE_RE"));

// Dot leaders: "....", "····" or spaced ". . . ."
static TOC_LEADER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\.{4,}|·{4,}|(?:\.\s){3,}\.").expect("Failed to compile TOC_LEADER_RE")
});

// --- Data Structures ---

/// A named 10-K section. `Other` carries an arbitrary heading label such as "Item 1B".
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SectionId {
    Business,
    RiskFactors,
    ManagementDiscussion,
    QuantitativeDisclosures,
    Other(String),
}

impl SectionId {
    /// The narrative sections fed to the analysis prompt.
    pub const NARRATIVE: [SectionId; 3] = [
        SectionId::Business,
        SectionId::RiskFactors,
        SectionId::ManagementDiscussion,
    ];

    fn known(&self) -> Option<(usize, &'static KnownSection)> {
        KNOWN_SECTIONS.iter().enumerate().find(|(_, s)| s.id == *self)
    }

    /// Maps an item label ("Item 1A", "item   7") to a known section, or `Other`.
    pub fn from_label(label: &str) -> Self {
        let wanted = label.split_whitespace().collect::<Vec<_>>().join(" ");
        KNOWN_SECTIONS
            .iter()
            .find(|s| s.label.eq_ignore_ascii_case(&wanted))
            .map_or_else(|| SectionId::Other(label.trim().to_string()), |s| s.id.clone())
    }

    pub fn label(&self) -> &str {
        match self {
            SectionId::Other(label) => label,
            _ => self.known().map_or("", |(_, s)| s.label),
        }
    }

    pub fn title(&self) -> &str {
        self.known().map_or("", |(_, s)| s.title)
    }

    /// Filesystem-friendly name, e.g. `item_1a_risk_factors`.
    pub fn slug(&self) -> String {
        let raw = format!("{} {}", self.label(), self.title());
        raw.split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|part| !part.is_empty())
            .map(|part| part.to_ascii_lowercase())
            .collect::<Vec<_>>()
            .join("_")
    }

    /// The section that conventionally closes this one.
    pub fn default_following(&self) -> Option<SectionId> {
        self.known().map(|(_, s)| SectionId::from_label(s.following))
    }

    fn opens_part_one(&self) -> bool {
        self.known().is_some_and(|(_, s)| s.opens_part_one)
    }

    /// Recognition pattern for this section's heading. `None` for an empty label.
    pub fn pattern(&self) -> Option<Regex> {
        match self {
            SectionId::Other(label) => label_pattern(label),
            _ => self.known().map(|(idx, _)| KNOWN_PATTERNS[idx].clone()),
        }
    }
}

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.title() {
            "" => write!(f, "{}", self.label()),
            title => write!(f, "{}. {}", self.label(), title),
        }
    }
}

fn label_pattern(label: &str) -> Option<Regex> {
    let words: Vec<String> = label.split_whitespace().map(regex::escape).collect();
    if words.is_empty() {
        return None;
    }
    let mut pattern = format!(r"(?i){}", words.join(r"\s+"));
    // "Item 1" must not match inside "Item 1A" or "Item 10"
    if label.trim_end().chars().last().is_some_and(char::is_alphanumeric) {
        pattern.push_str(r"\b");
    }
    match Regex::new(&pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            tracing::warn!("Could not build heading pattern for label '{}': {}", label, e);
            None
        }
    }
}

/// Tunable limits for extraction. Defaults reproduce the historical behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionConfig {
    pub max_span_len: usize,
    pub boundary_skip: usize,
    pub toc_lookahead: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            max_span_len: DEFAULT_MAX_SPAN_LEN,
            boundary_skip: DEFAULT_BOUNDARY_SKIP,
            toc_lookahead: DEFAULT_TOC_LOOKAHEAD,
        }
    }
}

/// A place where a section's heading pattern matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadingCandidate<'a> {
    pub start: usize,
    pub end: usize,
    /// Rest of the logical line after the match, trimmed.
    pub trailing: &'a str,
}

impl HeadingCandidate<'_> {
    pub fn is_toc(&self) -> bool {
        is_toc_remainder(self.trailing)
    }
}

/// Which rule picked the starting heading. The payload indexes the candidate list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadingChoice {
    AfterPartMarker(usize),
    LastGenuine(usize),
    LastRaw(usize),
}

impl HeadingChoice {
    pub fn index(self) -> usize {
        match self {
            HeadingChoice::AfterPartMarker(i)
            | HeadingChoice::LastGenuine(i)
            | HeadingChoice::LastRaw(i) => i,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanBoundary {
    FollowingHeading,
    Capped,
}

/// The located body of one section, borrowed from the document text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionSpan<'a> {
    pub start: usize,
    pub end: usize,
    pub text: &'a str,
    pub choice: HeadingChoice,
    pub boundary: SpanBoundary,
}

impl SectionSpan<'_> {
    fn len(&self) -> usize {
        self.end - self.start
    }
}

// --- Heuristics ---

/// True when a heading's line remainder looks like a table-of-contents entry:
/// a trailing page number or a run of dot leaders.
pub fn is_toc_remainder(remainder: &str) -> bool {
    let trimmed = remainder.trim();
    trimmed.ends_with(|c: char| c.is_ascii_digit()) || TOC_LEADER_RE.is_match(trimmed)
}

/// Picks the heading that most likely starts the real section.
///
/// With a part marker, the first genuine candidate after it wins. Otherwise the
/// last genuine candidate wins, since tables of contents and cross-references
/// precede the body. If every candidate looks like TOC noise the last raw match
/// is used. Sections referenced three or more times can still misfire.
pub fn choose_heading(
    candidates: &[HeadingCandidate<'_>],
    part_marker: Option<usize>,
) -> Option<HeadingChoice> {
    let last_raw = candidates.len().checked_sub(1)?;
    let genuine: Vec<usize> = candidates
        .iter()
        .enumerate()
        .filter(|(_, c)| !c.is_toc())
        .map(|(i, _)| i)
        .collect();

    let Some(&last_genuine) = genuine.last() else {
        return Some(HeadingChoice::LastRaw(last_raw));
    };

    if let Some(marker) = part_marker {
        if let Some(&idx) = genuine.iter().find(|&&i| candidates[i].start > marker) {
            return Some(HeadingChoice::AfterPartMarker(idx));
        }
    }

    Some(HeadingChoice::LastGenuine(last_genuine))
}

// --- Extractor ---

/// Locates section bodies in normalized filing text. Holds only configuration,
/// so one instance can serve any number of documents concurrently.
#[derive(Debug, Clone, Copy, Default)]
pub struct SectionExtractor {
    config: ExtractionConfig,
}

impl SectionExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ExtractionConfig) -> Self {
        Self { config }
    }

    /// Every match of `id`'s heading pattern, in document order.
    pub fn heading_candidates<'a>(&self, text: &'a str, id: &SectionId) -> Vec<HeadingCandidate<'a>> {
        id.pattern()
            .map(|re| scan_candidates(text, &re, 0, self.config.toc_lookahead))
            .unwrap_or_default()
    }

    /// Extracts the body of `target`, closed by the next genuine `following` heading.
    /// Returns `None` when `target`'s heading does not occur at all.
    pub fn extract<'a>(
        &self,
        text: &'a str,
        target: &SectionId,
        following: &SectionId,
    ) -> Option<SectionSpan<'a>> {
        if text.is_empty() {
            return None;
        }

        let candidates = self.heading_candidates(text, target);
        if candidates.is_empty() {
            tracing::debug!("No heading found for {}", target);
            return None;
        }

        let part_marker = if target.opens_part_one() {
            PART_ONE_RE.find(text).map(|m| m.start())
        } else {
            None
        };
        let choice = choose_heading(&candidates, part_marker)?;
        let heading = candidates[choice.index()];
        tracing::debug!(
            "Chose heading for {} at {} via {:?} ({} candidates, part marker {:?})",
            target,
            heading.start,
            choice,
            candidates.len(),
            part_marker
        );

        let (end, boundary) = self.find_span_end(text, &heading, following);
        let span = SectionSpan {
            start: heading.start,
            end,
            text: &text[heading.start..end],
            choice,
            boundary,
        };
        tracing::debug!("Span for {} is {}..{} ({} bytes, {:?})", target, span.start, span.end, span.len(), boundary);
        Some(span)
    }

    /// Like [`extract`](Self::extract) but yields an empty string for an absent section.
    pub fn extract_text<'a>(&self, text: &'a str, target: &SectionId, following: &SectionId) -> &'a str {
        self.extract(text, target, following).map_or("", |span| span.text)
    }

    fn find_span_end(
        &self,
        text: &str,
        heading: &HeadingCandidate<'_>,
        following: &SectionId,
    ) -> (usize, SpanBoundary) {
        if let Some(re) = following.pattern() {
            let from = self.boundary_search_start(text, heading);
            let closing = scan_candidates(text, &re, from, self.config.toc_lookahead)
                .into_iter()
                .find(|c| !c.is_toc());
            if let Some(closing) = closing {
                return (closing.start, SpanBoundary::FollowingHeading);
            }
        }

        let cap = heading.start.saturating_add(self.config.max_span_len);
        let mut end = floor_char_boundary(text, cap);
        if end <= heading.start {
            end = ceil_char_boundary(text, heading.start + 1);
        }
        (end, SpanBoundary::Capped)
    }

    // Skip at most to the end of the heading's own line, but never back into the match.
    fn boundary_search_start(&self, text: &str, heading: &HeadingCandidate<'_>) -> usize {
        let line_end = text[heading.end..]
            .find('\n')
            .map_or(text.len(), |offset| heading.end + offset);
        let skip_to = heading
            .start
            .saturating_add(self.config.boundary_skip)
            .min(line_end)
            .max(heading.end);
        ceil_char_boundary(text, skip_to)
    }
}

// --- Text helpers ---

fn scan_candidates<'a>(
    text: &'a str,
    re: &Regex,
    from: usize,
    lookahead: usize,
) -> Vec<HeadingCandidate<'a>> {
    re.find_iter(&text[from..])
        .map(|m| {
            let start = from + m.start();
            let end = from + m.end();
            let line_end = match text[end..].find('\n') {
                Some(offset) => end + offset,
                None => floor_char_boundary(text, end.saturating_add(lookahead)),
            };
            HeadingCandidate {
                start,
                end,
                trailing: text[end..line_end].trim(),
            }
        })
        .collect()
}

fn floor_char_boundary(text: &str, idx: usize) -> usize {
    if idx >= text.len() {
        return text.len();
    }
    let mut idx = idx;
    while !text.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

fn ceil_char_boundary(text: &str, idx: usize) -> usize {
    if idx >= text.len() {
        return text.len();
    }
    let mut idx = idx;
    while !text.is_char_boundary(idx) {
        idx += 1;
    }
    idx
}
