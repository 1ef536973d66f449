use anyhow::anyhow;

use crate::client::{AppContext, CliError, CliResult};
use crate::output::render_plugin_info;

pub(crate) async fn handle_plugins(ctx: &mut AppContext) -> CliResult<()> {
    let info = ctx
        .manager
        .get_plugin_info(ctx.server)
        .await
        .map_err(|err| CliError::failure(anyhow!("plugin lookup failed: {err}")))?;
    print!("{}", render_plugin_info(&info));
    Ok(())
}
