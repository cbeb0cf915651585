//! Mapping diagnostics onto buffer regions and a navigable results list.
//!
//! Region categories are theme contract strings and must keep their names.
//! Hosts implement [`Host`]; the terminal printer in `output` is one of
//! them. [`ResultStore`] keeps the latest presentation per file and drops
//! results from superseded checks.

use crate::config::{HighlightStyle, Settings};
use crate::models::{Diagnostic, Severity, Tool};
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub const ERROR_SCOPE: &str = "sublimePMD.error";
pub const WARNING_SCOPE: &str = "sublimePMD.warning";

const PASS_LINE: &str = "       -- pass -- ";
const SOURCE_WIDTH: usize = 80;

/// Theme category for a severity.
pub fn scope_for(severity: Severity) -> &'static str {
    match severity {
        Severity::Error => ERROR_SCOPE,
        Severity::Warning => WARNING_SCOPE,
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
/// Byte span `start..end` in a buffer.
pub struct Region {
    pub start: usize,
    pub end: usize,
}

impl Region {
    /// Inclusive of `end` so a cursor at the end of a line still hits.
    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset <= self.end
    }
}

/// Line index over a buffer's text.
pub struct Buffer<'a> {
    text: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> Buffer<'a> {
    pub fn new(text: &'a str) -> Buffer<'a> {
        let mut line_starts = vec![0];
        line_starts.extend(text.match_indices('\n').map(|(i, _)| i + 1));
        Buffer { text, line_starts }
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Span of 1-based `line` without its line terminator. Lines past the
    /// end collapse to an empty region at the end of the buffer.
    pub fn line_region(&self, line: usize) -> Region {
        let Some(&start) = line.checked_sub(1).and_then(|i| self.line_starts.get(i)) else {
            return Region {
                start: self.text.len(),
                end: self.text.len(),
            };
        };
        let mut end = self
            .line_starts
            .get(line)
            .map(|next| next - 1)
            .unwrap_or(self.text.len());
        if end > start && self.text.as_bytes()[end - 1] == b'\r' {
            end -= 1;
        }
        Region { start, end }
    }

    pub fn line_text(&self, line: usize) -> &'a str {
        let r = self.line_region(line);
        &self.text[r.start..r.end]
    }

    /// Byte offset of 0-based `column` (in chars) on `line`, clamped to the
    /// line end.
    pub fn point(&self, line: usize, column: usize) -> usize {
        let r = self.line_region(line);
        self.text[r.start..r.end]
            .char_indices()
            .nth(column)
            .map(|(i, _)| r.start + i)
            .unwrap_or(r.end)
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
/// One row of the results list.
pub struct ListEntry {
    pub tool: Tool,
    pub severity: Severity,
    pub line: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,
    pub message: String,
    pub source_line: String,
    /// Byte offset to jump to in the buffer.
    pub point: usize,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
/// A highlighted region with the message shown when the cursor is inside.
pub struct Highlight {
    pub region: Region,
    pub severity: Severity,
    pub message: String,
}

#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
/// Everything displayed for one file.
pub struct Presentation {
    pub file: PathBuf,
    pub highlights: Vec<Highlight>,
    pub entries: Vec<ListEntry>,
}

impl Presentation {
    /// Regions of one category, in list order.
    pub fn regions(&self, severity: Severity) -> Vec<Region> {
        self.highlights
            .iter()
            .filter(|h| h.severity == severity)
            .map(|h| h.region)
            .collect()
    }

    /// Message of the first highlight containing `offset`.
    pub fn message_at(&self, offset: usize) -> Option<&str> {
        self.highlights
            .iter()
            .find(|h| h.region.contains(offset))
            .map(|h| h.message.as_str())
    }
}

/// Sort by line, then errors before warnings, keeping discovery order for
/// ties.
pub fn sort_diagnostics(diags: &mut [Diagnostic]) {
    diags.sort_by(|a, b| a.line.cmp(&b.line).then(a.severity.cmp(&b.severity)));
}

/// Build the presentation for `file` whose current contents are `text`.
pub fn build_presentation(file: &Path, text: &str, diagnostics: &[Diagnostic]) -> Presentation {
    let buffer = Buffer::new(text);
    let mut sorted = diagnostics.to_vec();
    sort_diagnostics(&mut sorted);

    let mut highlights = Vec::with_capacity(sorted.len());
    let mut entries = Vec::with_capacity(sorted.len());
    for d in sorted {
        let region = buffer.line_region(d.line);
        let point = d
            .column
            .map(|c| buffer.point(d.line, c))
            .unwrap_or(region.start);
        highlights.push(Highlight {
            region,
            severity: d.severity,
            message: d.message.clone(),
        });
        entries.push(ListEntry {
            tool: d.tool,
            severity: d.severity,
            line: d.line,
            column: d.column,
            source_line: buffer.line_text(d.line).to_string(),
            message: d.message,
            point,
        });
    }
    Presentation {
        file: file.to_path_buf(),
        highlights,
        entries,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionStyle {
    pub style: HighlightStyle,
    pub gutter_marks: bool,
}

/// UI capabilities a host editor provides.
pub trait Host {
    /// Remove every region previously rendered for `file`.
    fn clear_regions(&mut self, file: &Path);
    fn render_regions(&mut self, file: &Path, category: &str, regions: &[Region], style: RegionStyle);
    /// Replace the results list for `file`.
    fn show_list(&mut self, file: &Path, entries: &[ListEntry]);
    fn set_status(&mut self, _file: &Path, _message: &str) {}
}

/// Push a presentation to `host`, replacing whatever it showed before.
pub fn render(host: &mut dyn Host, presentation: &Presentation, settings: &Settings) {
    let file = presentation.file.as_path();
    host.clear_regions(file);
    if settings.highlight {
        let style = RegionStyle {
            style: settings.highlight_style,
            gutter_marks: settings.gutter_marks,
        };
        for severity in [Severity::Error, Severity::Warning] {
            let regions = presentation.regions(severity);
            if !regions.is_empty() {
                host.render_regions(file, scope_for(severity), &regions, style);
            }
        }
    }
    if settings.results_pane {
        host.show_list(file, &presentation.entries);
    }
}

/// Format one results row: right-aligned line number, the source line cut
/// to 80 chars and padded, then the message.
pub fn format_entry(entry: &ListEntry) -> String {
    let count = entry.source_line.chars().count();
    let source = if count > SOURCE_WIDTH {
        let head: String = entry.source_line.chars().take(SOURCE_WIDTH - 3).collect();
        format!("{}...", head)
    } else {
        entry.source_line.clone()
    };
    format!(
        "{:>5}: {:<width$}{}",
        entry.line,
        source,
        entry.message,
        width = SOURCE_WIDTH + 1
    )
}

/// Full results pane text for a file.
pub fn format_results_pane(file: &Path, entries: &[ListEntry]) -> String {
    let mut out = format!("{}:\n\n", file.display());
    if entries.is_empty() {
        out.push_str(PASS_LINE);
        out.push('\n');
    }
    for e in entries {
        out.push_str(&format_entry(e));
        out.push('\n');
    }
    out
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Handle for a check in flight. Only the latest ticket per file commits.
pub struct Ticket {
    key: PathBuf,
    generation: u64,
}

#[derive(Default)]
struct Slot {
    generation: u64,
    presentation: Option<Presentation>,
}

#[derive(Default)]
/// Latest presentation per file, keyed by file identity.
pub struct ResultStore {
    slots: Mutex<HashMap<PathBuf, Slot>>,
}

fn identity(file: &Path) -> PathBuf {
    file.canonicalize().unwrap_or_else(|_| file.to_path_buf())
}

impl ResultStore {
    pub fn new() -> ResultStore {
        ResultStore::default()
    }

    fn slots(&self) -> std::sync::MutexGuard<'_, HashMap<PathBuf, Slot>> {
        self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Start a check for `file`, superseding any check still running.
    pub fn begin(&self, file: &Path) -> Ticket {
        let key = identity(file);
        let mut slots = self.slots();
        let slot = slots.entry(key.clone()).or_default();
        slot.generation += 1;
        Ticket {
            key,
            generation: slot.generation,
        }
    }

    /// Store `presentation` if `ticket` is still the latest for its file.
    /// Returns false when a newer check has started since.
    pub fn commit(&self, ticket: &Ticket, presentation: Presentation) -> bool {
        self.commit_then(ticket, presentation, |_| {})
    }

    /// Like [`commit`](Self::commit), running `display` on the stored
    /// presentation before the store is unlocked so a superseded check
    /// can never display after a newer one.
    pub fn commit_then(
        &self,
        ticket: &Ticket,
        presentation: Presentation,
        display: impl FnOnce(&Presentation),
    ) -> bool {
        let mut slots = self.slots();
        match slots.get_mut(&ticket.key) {
            Some(slot) if slot.generation == ticket.generation => {
                display(&presentation);
                slot.presentation = Some(presentation);
                true
            }
            _ => {
                tracing::debug!(file = %ticket.key.display(), "discarding superseded result");
                false
            }
        }
    }

    pub fn get(&self, file: &Path) -> Option<Presentation> {
        self.slots()
            .get(&identity(file))
            .and_then(|s| s.presentation.clone())
    }

    /// Status-bar message for a cursor at `offset` in `file`.
    pub fn message_at(&self, file: &Path, offset: usize) -> Option<String> {
        self.slots()
            .get(&identity(file))
            .and_then(|s| s.presentation.as_ref())
            .and_then(|p| p.message_at(offset))
            .map(str::to_string)
    }

    /// Forget a file, e.g. when it is closed.
    pub fn remove(&self, file: &Path) {
        self.slots().remove(&identity(file));
    }

    pub fn len(&self) -> usize {
        self.slots()
            .values()
            .filter(|s| s.presentation.is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SRC: &str = "class Foo {\n  void a() {}\n  void b() {}\n  void c() {}\n  int d;\n}\n";

    fn diag(line: usize, severity: Severity, message: &str) -> Diagnostic {
        Diagnostic {
            file: PathBuf::from("Foo.java"),
            line,
            column: None,
            severity,
            message: message.into(),
            tool: Tool::Pmd,
            rule: None,
        }
    }

    #[derive(Default)]
    struct RecordingHost {
        regions: HashMap<String, Vec<Region>>,
        list: Vec<ListEntry>,
        clears: usize,
    }

    impl Host for RecordingHost {
        fn clear_regions(&mut self, _file: &Path) {
            self.regions.clear();
            self.clears += 1;
        }
        fn render_regions(&mut self, _file: &Path, category: &str, regions: &[Region], _style: RegionStyle) {
            self.regions
                .entry(category.to_string())
                .or_default()
                .extend_from_slice(regions);
        }
        fn show_list(&mut self, _file: &Path, entries: &[ListEntry]) {
            self.list = entries.to_vec();
        }
    }

    #[test]
    fn test_line_regions() {
        let b = Buffer::new("ab\r\ncd\n\nlast");
        assert_eq!(b.line_count(), 4);
        assert_eq!(b.line_region(1), Region { start: 0, end: 2 });
        assert_eq!(b.line_region(2), Region { start: 4, end: 6 });
        assert_eq!(b.line_region(3), Region { start: 7, end: 7 });
        assert_eq!(b.line_region(4), Region { start: 8, end: 12 });
        assert_eq!(b.line_region(9), Region { start: 12, end: 12 });
        assert_eq!(b.line_region(0), Region { start: 12, end: 12 });
        assert_eq!(b.point(4, 2), 10);
        assert_eq!(b.point(4, 40), 12);
    }

    #[test]
    fn test_ordering_line_then_severity_then_discovery() {
        let diags = vec![
            diag(5, Severity::Warning, "w5"),
            diag(5, Severity::Error, "e5"),
            diag(3, Severity::Error, "e3"),
        ];
        let p = build_presentation(Path::new("Foo.java"), SRC, &diags);
        let order: Vec<(usize, Severity)> = p.entries.iter().map(|e| (e.line, e.severity)).collect();
        assert_eq!(
            order,
            vec![
                (3, Severity::Error),
                (5, Severity::Error),
                (5, Severity::Warning)
            ]
        );
    }

    #[test]
    fn test_stable_for_equal_keys() {
        let diags = vec![
            diag(2, Severity::Warning, "first"),
            diag(2, Severity::Warning, "second"),
        ];
        let p = build_presentation(Path::new("Foo.java"), SRC, &diags);
        assert_eq!(p.entries[0].message, "first");
        assert_eq!(p.entries[1].message, "second");
    }

    #[test]
    fn test_render_splits_categories_and_replaces() {
        let settings = Settings::defaults(Path::new("."));
        let mut host = RecordingHost::default();
        let p1 = build_presentation(
            Path::new("Foo.java"),
            SRC,
            &[diag(1, Severity::Error, "e"), diag(2, Severity::Warning, "w")],
        );
        render(&mut host, &p1, &settings);
        assert_eq!(host.regions[ERROR_SCOPE], vec![Region { start: 0, end: 11 }]);
        assert_eq!(host.regions[WARNING_SCOPE].len(), 1);
        assert_eq!(host.list.len(), 2);

        let p2 = build_presentation(Path::new("Foo.java"), SRC, &[diag(4, Severity::Warning, "w")]);
        render(&mut host, &p2, &settings);
        assert_eq!(host.clears, 2);
        assert!(!host.regions.contains_key(ERROR_SCOPE));
        assert_eq!(host.regions[WARNING_SCOPE].len(), 1);
        assert_eq!(host.list.len(), 1);
    }

    #[test]
    fn test_render_respects_display_toggles() {
        let mut settings = Settings::defaults(Path::new("."));
        settings.highlight = false;
        settings.results_pane = false;
        let mut host = RecordingHost::default();
        let p = build_presentation(Path::new("Foo.java"), SRC, &[diag(1, Severity::Error, "e")]);
        render(&mut host, &p, &settings);
        assert_eq!(host.clears, 1);
        assert!(host.regions.is_empty());
        assert!(host.list.is_empty());
    }

    #[test]
    fn test_format_entry_columns() {
        let entry = ListEntry {
            tool: Tool::Pmd,
            severity: Severity::Warning,
            line: 12,
            column: None,
            message: "Avoid empty catch blocks".into(),
            source_line: "x".repeat(100),
            point: 0,
        };
        let row = format_entry(&entry);
        assert!(row.starts_with("   12: "));
        assert!(row.contains(&format!("{}...", "x".repeat(77))));
        assert_eq!(row.find("Avoid"), Some(7 + 81));
    }

    #[test]
    fn test_results_pane_pass_line() {
        let pane = format_results_pane(Path::new("Foo.java"), &[]);
        assert_eq!(pane, "Foo.java:\n\n       -- pass -- \n");
    }

    #[test]
    fn test_store_replaces_and_supersedes() {
        let store = ResultStore::new();
        let file = Path::new("Foo.java");

        let t1 = store.begin(file);
        let p1 = build_presentation(file, SRC, &[diag(1, Severity::Error, "old")]);
        assert!(store.commit(&t1, p1));
        assert_eq!(store.get(file).unwrap().entries.len(), 1);

        let t2 = store.begin(file);
        let t3 = store.begin(file);
        let p3 = build_presentation(
            file,
            SRC,
            &[diag(2, Severity::Warning, "a"), diag(3, Severity::Warning, "b")],
        );
        assert!(store.commit(&t3, p3));
        let stale = build_presentation(file, SRC, &[diag(5, Severity::Error, "stale")]);
        assert!(!store.commit(&t2, stale));

        let current = store.get(file).unwrap();
        let messages: Vec<&str> = current.entries.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["a", "b"]);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_message_at_and_remove() {
        let store = ResultStore::new();
        let file = Path::new("Foo.java");
        let t = store.begin(file);
        store.commit(&t, build_presentation(file, SRC, &[diag(2, Severity::Warning, "unused")]));
        assert_eq!(store.message_at(file, 14).as_deref(), Some("unused"));
        assert_eq!(store.message_at(file, 0), None);
        store.remove(file);
        assert!(store.is_empty());
    }
}
