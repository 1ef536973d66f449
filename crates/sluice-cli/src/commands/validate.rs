use anyhow::anyhow;
use sluice_config::Settings;
use sluice_deluge::ConnectionManager;

use crate::cli::ValidateArgs;
use crate::client::{CliError, CliResult};
use crate::output::render_plugin_info;

pub(crate) async fn handle_validate(args: ValidateArgs) -> CliResult<()> {
    let password = match args.password {
        Some(password) => password,
        None => rpassword::prompt_password("Web-UI password: ")
            .map_err(|err| CliError::validation(format!("could not read password: {err}")))?,
    };

    // A throwaway manager with empty settings: validation never touches
    // saved connections.
    let manager = ConnectionManager::new(Settings::default())
        .map_err(|err| CliError::failure(anyhow!("failed to build HTTP client: {err}")))?;
    let info = manager
        .validate_server_and_get_plugins(args.url.trim(), &password)
        .await
        .map_err(|err| CliError::validation(format!("validation failed: {err}")))?;

    println!("Credentials accepted for {}", args.url.trim());
    print!("{}", render_plugin_info(&info));
    Ok(())
}
