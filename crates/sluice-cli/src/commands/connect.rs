use anyhow::anyhow;

use crate::client::{AppContext, CliError, CliResult};

pub(crate) async fn handle_connect(ctx: &mut AppContext) -> CliResult<()> {
    ctx.manager
        .connect_to_server(ctx.server, false)
        .await
        .map_err(|err| CliError::failure(anyhow!("connect failed: {err}")))?;

    match ctx.manager.daemon_info() {
        Some(info) => {
            let version = info.version.as_deref().unwrap_or("unknown");
            println!(
                "Connected to daemon {} at {}:{} (version {version})",
                info.host_id, info.ip, info.port
            );
        }
        None => println!("Connected"),
    }
    Ok(())
}
