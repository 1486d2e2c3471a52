//! Per-level timing and eigenvalue report of one solve.

use std::io::Write;

use serde::Serialize;

use crate::error::MgError;
use crate::multigrid::eigen::EigenvalueEstimate;
use crate::multigrid::level::MgLevelObject;
use crate::multigrid::timer::{LevelTimers, MgStage};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LevelDiagnostics {
    pub level: usize,
    /// Seconds per stage, in [`MgStage::ALL`] order.
    pub seconds: [f64; 7],
    pub min_eigenvalue: Option<f64>,
    pub max_eigenvalue: Option<f64>,
}

impl LevelDiagnostics {
    pub fn stage_seconds(&self, stage: MgStage) -> f64 {
        self.seconds[stage as usize]
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MgDiagnostics {
    pub rows: Vec<LevelDiagnostics>,
    /// Largest raw eigenvalue estimate over all estimated levels, before the safety factor.
    pub max_eigenvalue: Option<f64>,
    pub eigenvalues_estimated: bool,
}

impl MgDiagnostics {
    pub fn collect(
        timers: &LevelTimers,
        eigenvalues: Option<&MgLevelObject<EigenvalueEstimate>>,
        max_eigenvalue: Option<f64>,
    ) -> Self {
        let rows = (timers.min_level()..=timers.max_level())
            .map(|level| {
                let est = eigenvalues.and_then(|e| e.get(level)).filter(|e| e.is_set());
                LevelDiagnostics {
                    level,
                    seconds: MgStage::ALL.map(|stage| timers.seconds(stage, level)),
                    min_eigenvalue: est.map(|e| e.min),
                    max_eigenvalue: est.map(|e| e.max),
                }
            })
            .collect();
        Self { rows, max_eigenvalue, eigenvalues_estimated: eigenvalues.is_some() }
    }

    pub fn column_names(&self) -> Vec<&'static str> {
        let mut names = vec!["level"];
        names.extend(MgStage::ALL.iter().map(|s| s.label()));
        if self.eigenvalues_estimated {
            names.extend(["min_eigenvalue", "max_eigenvalue"]);
        }
        names
    }
}

/// Destination for the table produced at the end of a solve.
pub trait DiagnosticsSink {
    fn write_diagnostics(&mut self, diagnostics: &MgDiagnostics) -> Result<(), MgError>;
}

impl<S: DiagnosticsSink + ?Sized> DiagnosticsSink for &mut S {
    fn write_diagnostics(&mut self, diagnostics: &MgDiagnostics) -> Result<(), MgError> {
        (**self).write_diagnostics(diagnostics)
    }
}

/// Keeps every table it receives.
#[derive(Debug, Default)]
pub struct CollectingSink {
    pub tables: Vec<MgDiagnostics>,
}

impl DiagnosticsSink for CollectingSink {
    fn write_diagnostics(&mut self, diagnostics: &MgDiagnostics) -> Result<(), MgError> {
        self.tables.push(diagnostics.clone());
        Ok(())
    }
}

/// Whitespace-aligned text table, one row per level.
pub struct TextTableSink<W: Write> {
    writer: W,
}

impl<W: Write> TextTableSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> DiagnosticsSink for TextTableSink<W> {
    fn write_diagnostics(&mut self, d: &MgDiagnostics) -> Result<(), MgError> {
        let names = d.column_names();
        let mut cells: Vec<Vec<String>> = vec![names.iter().map(|s| s.to_string()).collect()];
        for row in &d.rows {
            let mut line = vec![row.level.to_string()];
            line.extend(row.seconds.iter().map(|s| format!("{:.6e}", s)));
            if d.eigenvalues_estimated {
                for v in [row.min_eigenvalue, row.max_eigenvalue] {
                    line.push(v.map_or_else(|| "-".to_string(), |v| format!("{:.6e}", v)));
                }
            }
            cells.push(line);
        }
        let widths: Vec<usize> =
            (0..names.len()).map(|c| cells.iter().map(|r| r[c].len()).max().unwrap_or(0)).collect();
        for row in &cells {
            let padded: Vec<String> = row.iter().zip(&widths).map(|(s, w)| format!("{:>w$}", s, w = w)).collect();
            writeln!(self.writer, "{}", padded.join("  "))?;
        }
        if let Some(max) = d.max_eigenvalue {
            writeln!(self.writer, "Max EV on all MG levels: {:.6e}", max)?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
