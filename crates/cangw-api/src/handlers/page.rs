//! Minimal HTML status page

use std::fmt::Write;

use axum::extract::State;
use axum::response::Html;
use cangw_core::StatusSnapshot;

use crate::state::AppState;

/// GET /
pub async fn index(State(state): State<AppState>) -> Html<String> {
    Html(render(&state.gateway().status().await))
}

fn render(snapshot: &StatusSnapshot) -> String {
    let mut options = String::new();
    for choice in &snapshot.choices {
        let template = serde_json::to_string(&choice.template).unwrap_or_default();
        let _ = writeln!(
            options,
            r#"      <option value="{}" data-signal-names="{}" data-template="{}"{}>{}</option>"#,
            escape(&choice.name),
            escape(&choice.signal_names.join(",")),
            escape(&template),
            if choice.selected { " selected" } else { "" },
            escape(&choice.label),
        );
    }

    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>CAN Signal Gateway</title></head>
<body>
  <h1>CAN Signal Gateway</h1>
  <p id="status">{status}</p>
  <form method="post" action="/send_can">
    <select name="message">
{options}    </select>
    <input name="value" placeholder="value">
    <input name="payload" placeholder='{{"Signal": 1}}'>
    <button type="submit">Send</button>
  </form>
</body>
</html>
"#,
        status = escape(&snapshot.status_text),
        options = options,
    )
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use cangw_core::MessageChoice;
    use std::collections::BTreeMap;

    #[test]
    fn test_render_marks_selected_choice() {
        let snapshot = StatusSnapshot {
            status_text: "Sent <ok>".to_string(),
            current_message: Some("M1".to_string()),
            choices: vec![MessageChoice {
                name: "M1".to_string(),
                frame_id: 0x100,
                label: "M1 (0x100)".to_string(),
                template: BTreeMap::from([("SigA".to_string(), 0.0)]),
                signal_names: vec!["siga".to_string(), "sigb".to_string()],
                selected: true,
            }],
        };
        let html = render(&snapshot);
        assert!(html.contains("Sent &lt;ok&gt;"));
        assert!(html.contains(r#"data-signal-names="siga,sigb""#));
        assert!(html.contains(" selected>M1 (0x100)</option>"));
    }
}
