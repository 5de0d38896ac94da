//! Prometheus text exposition format (version 0.0.4).

use std::io::Write;

use crate::mapping::Sample;

/// Content type served on the metrics endpoint.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Encode samples as Prometheus text.
///
/// Samples of the same metric must be adjacent, which is how
/// [`MetricMapper::render`](crate::mapping::MetricMapper::render) emits them.
/// `# HELP` and `# TYPE` are written once per metric that has samples, so an
/// empty slice encodes to an empty string.
pub fn encode(samples: &[Sample]) -> String {
    let mut output = Vec::with_capacity(samples.len() * 64);
    let mut current: Option<&str> = None;

    for sample in samples {
        if current != Some(sample.name.as_str()) {
            writeln!(
                output,
                "# HELP {} {}",
                sample.name,
                escape_help(sample.desc.help)
            )
            .ok();
            writeln!(
                output,
                "# TYPE {} {}",
                sample.name,
                sample.desc.metric_type.as_str()
            )
            .ok();
            current = Some(sample.name.as_str());
        }

        writeln!(
            output,
            "{}{} {}",
            sample.name,
            format_labels(&sample.labels),
            format_value(sample.value)
        )
        .ok();
    }

    String::from_utf8(output).unwrap_or_default()
}

/// Escape special characters in label values.
fn escape_label_value(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => result.push_str("\\\\"),
            '"' => result.push_str("\\\""),
            '\n' => result.push_str("\\n"),
            _ => result.push(c),
        }
    }
    result
}

/// Escape help text; quotes are allowed there.
fn escape_help(help: &str) -> String {
    help.replace('\\', "\\\\").replace('\n', "\\n")
}

/// Format a floating point value for Prometheus.
fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value.is_sign_positive() {
            "+Inf".to_string()
        } else {
            "-Inf".to_string()
        }
    } else if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{}", value)
    }
}

/// Format labels for Prometheus exposition format.
fn format_labels(labels: &[(String, String)]) -> String {
    if labels.is_empty() {
        return String::new();
    }

    let parts: Vec<String> = labels
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", k, escape_label_value(v)))
        .collect();

    format!("{{{}}}", parts.join(","))
}
