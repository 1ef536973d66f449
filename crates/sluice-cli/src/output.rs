//! Renderers and formatting helpers.

use sluice_deluge::{AddOutcome, PluginInfo, TorrentSummary};

/// Render the result of an add operation.
pub(crate) fn render_add_outcome(outcome: &AddOutcome) -> String {
    match outcome {
        AddOutcome::Added { hash } => format!("Torrent added ({hash})"),
        AddOutcome::AlreadyExists { hash: Some(hash) } => {
            format!("Torrent is already in the session ({hash})")
        }
        AddOutcome::AlreadyExists { hash: None } => {
            "Torrent is already in the session".to_string()
        }
    }
}

/// Render the plugin/label summary.
pub(crate) fn render_plugin_info(info: &PluginInfo) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Label plugin: {}\nLabelPlus plugin: {}\n",
        enabled(info.has_label_plugin),
        enabled(info.has_label_plus_plugin)
    ));
    if info.labels.is_empty() {
        out.push_str("Labels: none\n");
    } else {
        out.push_str(&format!("Labels: {}\n", info.labels.join(", ")));
    }
    out
}

/// Render a torrent listing, one line per torrent.
pub(crate) fn render_torrent_list(torrents: &[TorrentSummary]) -> String {
    if torrents.is_empty() {
        return "No torrents.\n".to_string();
    }
    let mut out = String::new();
    out.push_str(&format!(
        "{:<42} {:>7} {:<12} {:<24} LABEL\n",
        "HASH", "DONE", "STATE", "NAME"
    ));
    for torrent in torrents {
        out.push_str(&format!(
            "{:<42} {:>6.1}% {:<12} {:<24} {}\n",
            torrent.hash,
            torrent.progress,
            torrent.state,
            truncate(&torrent.name, 24),
            torrent.label.as_deref().unwrap_or("-")
        ));
    }
    out
}

const fn enabled(flag: bool) -> &'static str {
    if flag { "enabled" } else { "not enabled" }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let kept: String = text.chars().take(max.saturating_sub(1)).collect();
        format!("{kept}…")
    }
}
