//! Print a campus as the dual-path resolver sees it.

use campus_hub_admin::AppState;
use campus_hub_admin::config::AdminConfig;
use campus_hub_core::CampusId;

use super::CommandError;

/// Resolve `campus_id` and print the snapshot as pretty JSON.
///
/// # Errors
///
/// Returns an error if the store cannot be reached or the campus is missing.
pub async fn run(config: &AdminConfig, campus_id: &str) -> Result<(), CommandError> {
    let state = AppState::from_config(config).await?;
    let snapshot = state.engine().snapshot(&CampusId::new(campus_id)).await?;

    tracing::info!(
        campus_id,
        shape = ?snapshot.campus.shape,
        dorms = snapshot.dorms.len(),
        default_clubs = snapshot.default_clubs.len(),
        "Campus resolved"
    );

    #[allow(clippy::print_stdout)]
    {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    }
    Ok(())
}
