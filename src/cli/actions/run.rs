use crate::cli::actions::Action;
use crate::exporter::new;
use anyhow::Result;

/// Handle the run action
///
/// # Errors
///
/// Returns an error if the exporter can't start or the listener can't bind.
pub async fn handle(action: Action) -> Result<()> {
    match action {
        Action::Run {
            port,
            listen,
            telemetry_path,
            config,
        } => {
            new(port, listen, telemetry_path, *config).await?;
        }
    }

    Ok(())
}
