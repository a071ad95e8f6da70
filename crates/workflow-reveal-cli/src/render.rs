use workflow_reveal::{SessionPhase, ViewState};

/// Turns successive view snapshots into the text to print.
///
/// Revealed text only grows within a session, so each snapshot prints the
/// part not printed yet.
#[derive(Debug, Default)]
pub struct TextRenderer {
    session_id: Option<uuid::Uuid>,
    printed: usize,
    title_shown: bool,
}

impl TextRenderer {
    /// Returns the newly revealed suffix of `view.text`, if any.
    pub fn render(&mut self, view: &ViewState) -> Option<String> {
        if view.session_id != self.session_id {
            self.session_id = view.session_id;
            self.printed = 0;
            self.title_shown = false;
        }
        let mut out = String::new();
        if !self.title_shown && !view.title.is_empty() {
            out.push_str(&format!("== {} ==\n", view.title));
            self.title_shown = true;
        }
        if let Some(fresh) = view.text.get(self.printed..) {
            out.push_str(fresh);
            self.printed = view.text.len();
        }
        (!out.is_empty()).then_some(out)
    }
}

/// Closing lines shown after the session ends.
pub fn summary(view: &ViewState) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(link) = view.link.as_deref().filter(|l| !l.is_empty()) {
        lines.push(format!("link: {link}"));
    }
    match view.phase {
        SessionPhase::Failed => {
            let message = view.error.as_deref().unwrap_or("request failed");
            lines.push(format!("error: {message}"));
        }
        SessionPhase::Cancelled => lines.push("cancelled".to_string()),
        _ => {}
    }
    lines
}
