// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Text exposition rendering (format version 0.0.4).

use std::fmt::Write as _;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FamilyKind {
    Counter,
    Gauge,
    Histogram,
}

impl FamilyKind {
    fn as_str(self) -> &'static str {
        match self {
            FamilyKind::Counter => "counter",
            FamilyKind::Gauge => "gauge",
            FamilyKind::Histogram => "histogram",
        }
    }
}

/// One sample line. `name` overrides the family name (histogram `_sum` and
/// `_count` series).
#[derive(Debug, Clone)]
pub struct Sample {
    pub name: Option<String>,
    pub labels: Vec<(&'static str, String)>,
    pub value: f64,
}

impl Sample {
    pub fn labeled(labels: impl IntoIterator<Item = (&'static str, String)>, value: f64) -> Self {
        Self { name: None, labels: labels.into_iter().collect(), value }
    }

    pub fn named(
        name: &str,
        labels: impl IntoIterator<Item = (&'static str, String)>,
        value: f64,
    ) -> Self {
        Self { name: Some(name.to_string()), labels: labels.into_iter().collect(), value }
    }
}

/// One metric family: HELP/TYPE header plus sample lines.
#[derive(Debug, Clone)]
pub struct MetricFamily {
    pub name: String,
    pub help: &'static str,
    pub kind: FamilyKind,
    pub samples: Vec<Sample>,
}

impl MetricFamily {
    pub fn new(name: &str, help: &'static str, kind: FamilyKind) -> Self {
        Self { name: name.to_string(), help, kind, samples: Vec::new() }
    }

    pub fn push(&mut self, sample: Sample) {
        self.samples.push(sample);
    }
}

/// Render families into the text exposition format.
pub fn render(families: &[MetricFamily]) -> String {
    let mut out = String::new();
    for family in families {
        let _ = writeln!(out, "# HELP {} {}", family.name, family.help);
        let _ = writeln!(out, "# TYPE {} {}", family.name, family.kind.as_str());
        for sample in &family.samples {
            let name = sample.name.as_deref().unwrap_or(&family.name);
            out.push_str(name);
            if !sample.labels.is_empty() {
                out.push('{');
                for (i, (key, value)) in sample.labels.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    let _ = write!(out, "{key}=\"{}\"", escape_label(value));
                }
                out.push('}');
            }
            let _ = writeln!(out, " {}", format_value(sample.value));
        }
    }
    out
}

fn escape_label(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

fn format_value(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

#[cfg(test)]
#[path = "render_tests.rs"]
mod tests;
