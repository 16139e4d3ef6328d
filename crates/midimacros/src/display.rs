//! Text rendering for engine messages and listings.
use macro_protocol::{ConnectionStatus, Mode, MsgToUI, NotifyKind};
use macro_registry::Macro;

/// Render one engine message as a console line. Messages with nothing to
/// show return `None`.
#[must_use]
pub fn render(msg: &MsgToUI) -> Option<String> {
    let line = match msg {
        MsgToUI::ConnectionStatus(status) => format!("status: {status}"),
        MsgToUI::ModeChanged(mode) => format!("mode: {mode}"),
        MsgToUI::TriggerFired { identity, bound } => {
            if *bound {
                format!("trigger {}", identity.label())
            } else {
                format!("trigger {} (unbound)", identity.label())
            }
        }
        MsgToUI::ExecutionResult { identity, outcome } => format!("  {identity} -> {outcome}"),
        MsgToUI::TriggerCaptured { identity } => format!("captured {}", identity.label()),
        MsgToUI::CaptureCancelled => "learn cancelled".to_string(),
        MsgToUI::RegistryChanged => return None,
        MsgToUI::Notify { kind, title, text } => {
            format!("[{}] {title}: {text}", kind_tag(*kind))
        }
    };
    Some(line)
}

/// Short console tag for a notification kind.
fn kind_tag(kind: NotifyKind) -> &'static str {
    match kind {
        NotifyKind::Info => "info",
        NotifyKind::Warn => "warn",
        NotifyKind::Error => "error",
        NotifyKind::Success => "ok",
    }
}

/// One-line engine summary.
#[must_use]
pub fn status_line(status: &ConnectionStatus, mode: Mode, macros: usize) -> String {
    format!("{status}, mode {mode}, {macros} macro(s)")
}

/// Macro listing, one line per macro in registry order, with aligned columns.
#[must_use]
pub fn macro_table(macros: &[Macro]) -> String {
    if macros.is_empty() {
        return "no macros\n".to_string();
    }
    let ids: Vec<String> = macros.iter().map(|m| m.identity.to_string()).collect();
    let id_w = ids.iter().map(String::len).max().unwrap_or(0);
    let name_w = macros.iter().map(|m| m.name.chars().count()).max().unwrap_or(0);
    let mut out = String::new();
    for (m, id) in macros.iter().zip(&ids) {
        out.push_str(&format!(
            "{id:<id_w$}  {name:<name_w$}  {summary}\n",
            name = m.name,
            summary = m.action.summary(),
        ));
    }
    out
}

/// Port listing, one per line.
#[must_use]
pub fn port_list(ports: &[String]) -> String {
    if ports.is_empty() {
        return "no input ports\n".to_string();
    }
    ports.iter().map(|p| format!("{p}\n")).collect()
}
