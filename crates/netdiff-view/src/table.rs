#![forbid(unsafe_code)]

//! Tabular view of every payload entry.
//!
//! Rows come from the diff maps and rename maps of every section, geometric
//! or not. Statuses of geometric sections are read from the same
//! [`Classification`] that drives the map, so the two views never disagree;
//! rename targets are folded into their source row.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;

use netdiff_model::classify::Claims;
use netdiff_model::payload::SectionSummary;
use netdiff_model::{Classification, Domain, FeatureId, Payload, Status};
use tracing::{debug, debug_span};
use unicode_width::UnicodeWidthStr;

use crate::viewer::SelectionEvent;

/// One payload entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    pub section: String,
    pub id: FeatureId,
    pub status: Status,
    /// New ID when the entry was renamed.
    pub renamed_to: Option<FeatureId>,
    /// Geometry domain of the section, if any.
    pub domain: Option<Domain>,
    /// Whether the entry is drawn on the map.
    pub has_geometry: bool,
}

/// Rows, section summary, and the highlighted row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableModel {
    rows: Vec<TableRow>,
    summary: Vec<SectionSummary>,
    highlighted: Option<usize>,
}

/// Source ID a section-local rename target folds into.
fn canonical(back: &BTreeMap<&str, &str>, id: &str) -> String {
    back.get(id).copied().unwrap_or(id).to_string()
}

impl TableModel {
    pub fn build(payload: &Payload, classification: &Classification) -> Self {
        let _span = debug_span!("table_build").entered();
        let sections: BTreeSet<&String> = payload.diffs.keys().chain(payload.renames.keys()).collect();
        let no_renames = BTreeMap::new();

        let mut rows = Vec::new();
        for section in sections {
            let domain = Domain::of_section(section);
            let renames = payload.renames.get(section).unwrap_or(&no_renames);
            let back: BTreeMap<&str, &str> = renames
                .iter()
                .filter(|(old, new)| old != new)
                .map(|(old, new)| (new.as_str(), old.as_str()))
                .collect();
            let mut claims: BTreeMap<String, Claims> = BTreeMap::new();
            if let Some(diff) = payload.diffs.get(section) {
                for id in diff.added.keys() {
                    claims.entry(canonical(&back, id)).or_default().added = true;
                }
                for id in diff.removed.keys() {
                    claims.entry(canonical(&back, id)).or_default().removed = true;
                }
                for id in diff.changed.keys() {
                    claims.entry(canonical(&back, id)).or_default().changed = true;
                }
            }
            for (old, new) in renames {
                if old != new {
                    claims.entry(old.clone()).or_default().changed = true;
                }
            }

            for (id, claim) in claims {
                let classified = domain.and_then(|d| classification.status_of(d, &id));
                let status = classified
                    .or_else(|| domain.and_then(|d| classification.orphans(d).status_of(&id)))
                    .unwrap_or_else(|| claim.resolve());
                rows.push(TableRow {
                    section: section.clone(),
                    renamed_to: renames.get(&id).filter(|new| **new != id).cloned(),
                    id,
                    status,
                    domain,
                    has_geometry: classified.is_some(),
                });
            }
        }
        debug!(rows = rows.len(), "table built");
        Self {
            rows,
            summary: payload.summary(),
            highlighted: None,
        }
    }

    pub fn rows(&self) -> &[TableRow] {
        &self.rows
    }

    pub fn summary(&self) -> &[SectionSummary] {
        &self.summary
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn highlighted(&self) -> Option<&TableRow> {
        self.highlighted.and_then(|i| self.rows.get(i))
    }

    /// Row of a geometric feature.
    pub fn find(&self, domain: Domain, id: &str) -> Option<usize> {
        self.rows
            .iter()
            .position(|r| r.domain == Some(domain) && r.id == id)
    }

    /// Follow a selection change. Unchanged features have no row and clear
    /// the highlight.
    pub fn on_selection(&mut self, event: &SelectionEvent) {
        self.highlighted = match event {
            SelectionEvent::Selected(selection) => self.find(selection.domain, &selection.id),
            SelectionEvent::Cleared => None,
        };
    }

    /// Plain-text rendering with display-width aligned columns.
    pub fn render(&self) -> String {
        const HEADERS: [&str; 4] = ["section", "id", "status", "renamed to"];
        let cells: Vec<[&str; 4]> = self
            .rows
            .iter()
            .map(|r| {
                [
                    r.section.as_str(),
                    r.id.as_str(),
                    r.status.as_str(),
                    r.renamed_to.as_deref().unwrap_or(""),
                ]
            })
            .collect();
        let mut widths = HEADERS.map(UnicodeWidthStr::width);
        for row in &cells {
            for (w, cell) in widths.iter_mut().zip(row) {
                *w = (*w).max(cell.width());
            }
        }

        let mut out = String::new();
        let mut line = |marker: char, row: &[&str; 4]| {
            out.push(marker);
            for (i, (cell, w)) in row.iter().zip(widths).enumerate() {
                out.push(' ');
                out.push_str(cell);
                if i + 1 < row.len() {
                    out.extend(std::iter::repeat_n(' ', w - cell.width()));
                }
            }
            let trimmed = out.trim_end_matches(' ').len();
            out.truncate(trimmed);
            out.push('\n');
        };
        line(' ', &HEADERS);
        for (i, row) in cells.iter().enumerate() {
            line(if self.highlighted == Some(i) { '>' } else { ' ' }, row);
        }
        out
    }

    /// Section summary as text, one line per section.
    pub fn render_summary(&self) -> String {
        let width = self
            .summary
            .iter()
            .map(|s| s.section.width())
            .max()
            .unwrap_or(0);
        let mut out = String::new();
        for s in &self.summary {
            let pad = width - s.section.width();
            let _ = writeln!(
                out,
                "{}{}  +{:<5} -{:<5} ~{}",
                s.section,
                " ".repeat(pad),
                s.added,
                s.removed,
                s.changed
            );
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netdiff_model::classify;
    use serde_json::json;

    fn payload() -> Payload {
        Payload::from_value(json!({
            "geometry": {
                "nodes1": {"J1": [0, 0], "OLD": [1, 1]},
                "nodes2": {"J1": [0, 0], "J2": [2, 2], "NEW": [1, 1]}
            },
            "diffs": {
                "JUNCTIONS": {
                    "added": {"J2": [], "NEW": [], "GHOST": []},
                    "removed": {"OLD": []}
                },
                "OPTIONS": {"changed": {"FLOW_UNITS": [["CFS"], ["CMS"]]}}
            },
            "renames": {"JUNCTIONS": {"OLD": "NEW"}}
        }))
        .unwrap()
    }

    fn model() -> TableModel {
        let p = payload();
        TableModel::build(&p, &classify(&p))
    }

    fn row<'a>(t: &'a TableModel, id: &str) -> &'a TableRow {
        t.rows().iter().find(|r| r.id == id).unwrap()
    }

    #[test]
    fn rows_fold_renames() {
        let t = model();
        let ids: Vec<&str> = t.rows().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["GHOST", "J2", "OLD", "FLOW_UNITS"]);
        let old = row(&t, "OLD");
        assert_eq!(old.status, Status::Changed);
        assert_eq!(old.renamed_to.as_deref(), Some("NEW"));
        assert!(old.has_geometry);
    }

    #[test]
    fn statuses_match_classification() {
        let t = model();
        assert_eq!(row(&t, "J2").status, Status::Added);
        let ghost = row(&t, "GHOST");
        assert_eq!(ghost.status, Status::Added);
        assert!(!ghost.has_geometry);
        let opt = row(&t, "FLOW_UNITS");
        assert_eq!(opt.status, Status::Changed);
        assert_eq!(opt.domain, None);
    }

    #[test]
    fn summary_by_section() {
        let t = model();
        let sections: Vec<&str> = t.summary().iter().map(|s| s.section.as_str()).collect();
        assert_eq!(sections, vec!["JUNCTIONS", "OPTIONS"]);
        assert!(t.render_summary().starts_with("JUNCTIONS  +3"));
    }

    #[test]
    fn render_aligns_columns() {
        let t = model();
        let text = t.render();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[0].starts_with("  section   id"));
        let status_col = lines[0].find("status").unwrap();
        assert_eq!(&lines[1][status_col..status_col + 5], "added");
    }
}
