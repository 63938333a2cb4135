//! Prometheus text exposition format.
//!
//! Renders gauge board samples into the Prometheus text exposition
//! format for scraping by a Prometheus server or compatible agent.

/// Render `(name, value)` samples into Prometheus text format.
///
/// Names are already sanitized by the gauge board; every entry is
/// exposed as a GAUGE.
pub fn render_prometheus(samples: &[(String, f64)]) -> String {
    let mut out = String::new();
    for (name, value) in samples {
        out.push_str(&format!("# TYPE {name} gauge\n"));
        out.push_str(&format!("{name} {value}\n"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_empty() {
        assert_eq!(render_prometheus(&[]), "");
    }

    #[test]
    fn render_declares_gauge_type() {
        let samples = vec![
            ("registry_instances_total".to_string(), 4.0),
            ("registry_memory_utilization_ratio".to_string(), 0.25),
        ];
        let output = render_prometheus(&samples);

        assert!(output.contains("# TYPE registry_instances_total gauge"));
        assert!(output.contains("registry_instances_total 4"));
        assert!(output.contains("registry_memory_utilization_ratio 0.25"));
    }

    #[test]
    fn render_format_is_line_oriented() {
        let samples = vec![("app_instances_up_orders".to_string(), 2.0)];
        let output = render_prometheus(&samples);

        for line in output.lines() {
            if line.starts_with('#') {
                continue;
            }
            let mut parts = line.split_whitespace();
            assert!(parts.next().is_some(), "metric name missing: {line}");
            assert!(
                parts.next().and_then(|v| v.parse::<f64>().ok()).is_some(),
                "value not numeric: {line}"
            );
        }
    }
}
