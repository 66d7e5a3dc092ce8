//! Table columns for workload listings.
//!
//! - Stable column specs (labels, widths)
//! - A column set for namespaced or all-namespace views
//! - Cell rendering for a `WorkloadInfo`

#![forbid(unsafe_code)]

use crate::WorkloadInfo;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnKind {
    Namespace,
    Name,
    Status,
    Strategy,
    Ready,
    Revision,
    Images,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnSpec {
    pub kind: ColumnKind,
    pub label: &'static str,
    pub width: usize,
}

const fn col(kind: ColumnKind, label: &'static str, width: usize) -> ColumnSpec {
    ColumnSpec { kind, label, width }
}

/// Columns for a workload table. The namespace column is only shown when
/// rows may come from several namespaces.
pub fn workload_columns(all_namespaces: bool) -> Vec<ColumnSpec> {
    let mut cols = Vec::with_capacity(7);
    if all_namespaces {
        cols.push(col(ColumnKind::Namespace, "NAMESPACE", 16));
    }
    cols.push(col(ColumnKind::Name, "NAME", 32));
    cols.push(col(ColumnKind::Status, "STATUS", 12));
    cols.push(col(ColumnKind::Strategy, "STRATEGY", 18));
    cols.push(col(ColumnKind::Ready, "READY", 7));
    cols.push(col(ColumnKind::Revision, "REVISION", 14));
    cols.push(col(ColumnKind::Images, "IMAGES", 0));
    cols
}

pub fn render_cell(w: &WorkloadInfo, kind: ColumnKind) -> String {
    match kind {
        ColumnKind::Namespace => w.namespace().to_string(),
        ColumnKind::Name => w.name().to_string(),
        ColumnKind::Status => w.status.clone(),
        ColumnKind::Strategy => w.strategy.clone(),
        ColumnKind::Ready => w.ready.clone(),
        ColumnKind::Revision => {
            if w.update_revision.is_empty() || w.update_revision == w.current_revision {
                w.current_revision.clone()
            } else {
                format!("{}→{}", short(&w.current_revision), short(&w.update_revision))
            }
        }
        ColumnKind::Images => w.images.join(","),
    }
}

fn short(rev: &str) -> String {
    rev.chars().take(6).collect()
}

fn pad(s: &str, width: usize) -> String {
    if width == 0 {
        return s.to_string();
    }
    let n = s.chars().count();
    if n >= width {
        let mut out: String = s.chars().take(width.saturating_sub(1)).collect();
        out.push(' ');
        out
    } else {
        format!("{}{}", s, " ".repeat(width - n))
    }
}

pub fn render_header(cols: &[ColumnSpec]) -> String {
    cols.iter().map(|c| pad(c.label, c.width)).collect::<String>().trim_end().to_string()
}

pub fn render_row(w: &WorkloadInfo, cols: &[ColumnSpec]) -> String {
    cols.iter()
        .map(|c| pad(&render_cell(w, c.kind), c.width))
        .collect::<String>()
        .trim_end()
        .to_string()
}
