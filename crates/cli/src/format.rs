//! [`Output`] -> human/JSON string formatting.

use kg_core::KgError;
use kg_executor::Output;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

pub fn format_output(output: &Output, mode: OutputMode) -> String {
    match mode {
        OutputMode::Json => {
            serde_json::to_string_pretty(output).unwrap_or_else(|_| "{\"error\":\"serialization failed\"}".to_string())
        }
        OutputMode::Human => format_human(output),
    }
}

pub fn format_error(err: &KgError, mode: OutputMode) -> String {
    match mode {
        OutputMode::Json => serde_json::to_string_pretty(&serde_json::json!({ "error": err.to_string() }))
            .unwrap_or_else(|_| format!("{{\"error\": \"{err}\"}}")),
        OutputMode::Human => format!("error: {err}"),
    }
}

fn format_human(output: &Output) -> String {
    match output {
        Output::Context { text, partial } => {
            if *partial {
                format!("{text}\n\n(partial: deadline or budget cut this short)")
            } else {
                text.clone()
            }
        }
        Output::Search { hits } => {
            if hits.is_empty() {
                return "(no hits)".to_string();
            }
            hits.iter()
                .map(|h| format!("{:.4}  {}  {}", h.score, h.slug, truncate(&h.text, 80)))
                .collect::<Vec<_>>()
                .join("\n")
        }
        Output::Show { text } => text.clone(),
        Output::BulletAdded { bullet_id } => format!("added {bullet_id}"),
        Output::Status(report) => {
            let mut lines: Vec<String> = report
                .nodes
                .iter()
                .map(|n| {
                    format!(
                        "{:<24} live={:<4} served_budget={:<8} flagged={}",
                        n.slug, n.live_bullet_count, n.served_budget, n.flagged
                    )
                })
                .collect();
            lines.push(format!("calibration_due={}", report.calibration_due));
            lines.join("\n")
        }
        Output::Ok => "ok".to_string(),
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut s: String = text.chars().take(max_chars).collect();
    s.push('\u{2026}');
    s
}
