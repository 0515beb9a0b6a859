//! HTML rendering of the metric list.

use pulse_core::Metric;

fn escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// Render the metric list as a minimal HTML table. Callers are expected to
/// hand in an already sorted list.
pub fn render_list(metrics: &[Metric]) -> String {
    let mut rows = String::new();
    for metric in metrics {
        rows.push_str(&format!(
            "      <tr><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            escape(metric.name()),
            metric.display_value(),
            metric.kind()
        ));
    }

    format!(
        "<!DOCTYPE html>\n<html>\n  <head><title>pulse metrics</title></head>\n  <body>\n    \
         <table>\n      <tr><th>Name</th><th>Value</th><th>Kind</th></tr>\n{rows}    </table>\n  \
         </body>\n</html>\n"
    )
}
