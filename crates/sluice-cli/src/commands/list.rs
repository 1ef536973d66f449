use anyhow::anyhow;

use crate::client::{AppContext, CliError, CliResult};
use crate::output::render_torrent_list;

pub(crate) async fn handle_list(ctx: &mut AppContext) -> CliResult<()> {
    let torrents = ctx
        .manager
        .get_torrent_list(ctx.server)
        .await
        .map_err(|err| CliError::failure(anyhow!("listing failed: {err}")))?;
    print!("{}", render_torrent_list(&torrents));
    Ok(())
}
