//! Check-on-save: watch a directory and re-check Java files as they change.
//!
//! Each save spawns a check; when a file is saved again before its previous
//! check finished, only the newest result is displayed.

use crate::check::Checker;
use crate::error::{CheckError, Result};
use crate::present::Host;
use notify::{Event, EventKind, RecursiveMode, Watcher};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

const SETTLE: Duration = Duration::from_millis(300);

/// Whether a changed path should trigger a check.
pub fn is_java_source(path: &Path) -> bool {
    path.extension().is_some_and(|e| e == "java") && path.is_file()
}

/// Paths from a batch of change events worth re-checking, deduplicated.
pub fn changed_sources(events: &[Event]) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for ev in events {
        if !matches!(ev.kind, EventKind::Modify(_) | EventKind::Create(_)) {
            continue;
        }
        for p in &ev.paths {
            if is_java_source(p) && seen.insert(p.clone()) {
                out.push(p.clone());
            }
        }
    }
    out
}

/// Watch `dir` until the watcher channel closes.
pub fn run_watch<H>(dir: &Path, checker: Arc<Checker>, host: Arc<Mutex<H>>) -> Result<()>
where
    H: Host + Send + 'static,
{
    let (tx, rx) = mpsc::channel::<Event>();
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
        Ok(event) => {
            let _ = tx.send(event);
        }
        Err(e) => tracing::warn!("watch error: {}", e),
    })
    .map_err(|e| CheckError::Configuration(format!("cannot start watcher: {}", e)))?;
    watcher
        .watch(dir, RecursiveMode::Recursive)
        .map_err(|e| CheckError::Configuration(format!("cannot watch {}: {}", dir.display(), e)))?;
    tracing::info!("watching {}", dir.display());

    while let Ok(first) = rx.recv() {
        // Editors often emit several events per save.
        thread::sleep(SETTLE);
        let mut batch = vec![first];
        batch.extend(rx.try_iter());

        for file in changed_sources(&batch) {
            let enabled = checker
                .settings_for(&file)
                .map(|s| s.check_on_save)
                .unwrap_or(true);
            if !enabled {
                tracing::debug!(file = %file.display(), "check_on_save disabled");
                continue;
            }
            let checker = Arc::clone(&checker);
            let host = Arc::clone(&host);
            thread::spawn(move || {
                let mut sink = SharedHost(&*host);
                if let Err(e) = checker.run(&file, &mut sink) {
                    tracing::warn!(file = %file.display(), "check failed: {}", e);
                }
            });
        }
    }
    Ok(())
}

/// Forwards host calls through a mutex so concurrent checks can share one
/// display. Each call locks separately.
struct SharedHost<'a, H>(&'a Mutex<H>);

impl<H: Host> SharedHost<'_, H> {
    fn with<R>(&self, f: impl FnOnce(&mut H) -> R) -> R {
        let mut guard = self.0.lock().unwrap_or_else(|p| p.into_inner());
        f(&mut guard)
    }
}

impl<H: Host> Host for SharedHost<'_, H> {
    fn clear_regions(&mut self, file: &Path) {
        self.with(|h| h.clear_regions(file))
    }
    fn render_regions(
        &mut self,
        file: &Path,
        category: &str,
        regions: &[crate::present::Region],
        style: crate::present::RegionStyle,
    ) {
        self.with(|h| h.render_regions(file, category, regions, style))
    }
    fn show_list(&mut self, file: &Path, entries: &[crate::present::ListEntry]) {
        self.with(|h| h.show_list(file, entries))
    }
    fn set_status(&mut self, file: &Path, message: &str) {
        self.with(|h| h.set_status(file, message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, ModifyKind, RemoveKind};
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_changed_sources_filters_and_dedups() {
        let dir = tempdir().unwrap();
        let java = dir.path().join("Foo.java");
        let txt = dir.path().join("notes.txt");
        fs::write(&java, "class Foo {}").unwrap();
        fs::write(&txt, "").unwrap();

        let events = vec![
            Event::new(EventKind::Modify(ModifyKind::Any)).add_path(java.clone()),
            Event::new(EventKind::Create(CreateKind::File)).add_path(java.clone()),
            Event::new(EventKind::Modify(ModifyKind::Any)).add_path(txt),
            Event::new(EventKind::Remove(RemoveKind::File)).add_path(dir.path().join("Gone.java")),
        ];
        assert_eq!(changed_sources(&events), vec![java]);
    }
}
