use std::path::Path;

use anyhow::anyhow;
use base64::{Engine as _, engine::general_purpose};
use sluice_deluge::{PluginOptions, TorrentOptions};

use crate::cli::AddArgs;
use crate::client::{AppContext, CliError, CliResult, parse_cookie_pair};
use crate::output::render_add_outcome;

pub(crate) async fn handle_add(ctx: &mut AppContext, args: AddArgs) -> CliResult<()> {
    let source = args.source.trim();
    if source.is_empty() {
        return Err(CliError::validation("source must not be empty"));
    }

    let plugin_options = PluginOptions { label: args.label };
    let options = TorrentOptions {
        add_paused: args.paused.then_some(true),
        download_location: args.download_dir,
        move_completed: args.move_completed_path.as_ref().map(|_| true),
        move_completed_path: args.move_completed_path,
        ..TorrentOptions::default()
    };

    let outcome = if is_remote_source(source) {
        let cookies = args
            .cookies
            .iter()
            .map(|raw| parse_cookie_pair(raw))
            .collect::<CliResult<Vec<_>>>()?;
        ctx.manager
            .add_torrent(source, &cookies, &plugin_options, &options, ctx.server)
            .await
    } else {
        let path = Path::new(source);
        let bytes = std::fs::read(path).map_err(|err| {
            CliError::validation(format!(
                "failed to read torrent file '{}': {err}",
                path.display()
            ))
        })?;
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("upload.torrent");
        let payload = general_purpose::STANDARD.encode(&bytes);
        ctx.manager
            .add_torrent_file(filename, &payload, &plugin_options, &options, ctx.server)
            .await
    }
    .map_err(|err| CliError::failure(anyhow!("add failed: {err}")))?;

    // "Already exists" renders as information, never as an error.
    println!("{}", render_add_outcome(&outcome));
    Ok(())
}

fn is_remote_source(source: &str) -> bool {
    source.starts_with("magnet:") || source.starts_with("http://") || source.starts_with("https://")
}
