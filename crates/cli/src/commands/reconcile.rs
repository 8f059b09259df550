//! Apply a desired-state file as one admin save.
//!
//! # File Format
//!
//! ```yaml
//! campus:                      # every key optional; omitted keys keep the stored value
//!   name: State University
//!   short_name: SU
//!   locations:
//!     - { id: north, name: North Campus }
//!   is_active: true
//!   admin_emails: [dean@state.edu]
//!   is_university: true
//!   logo: images/crest.png     # uploaded on save
//! dorms:                       # omit to keep the stored list
//!   - name: Pioneer Hall
//!     location_id: north
//!     admin_email: ra@state.edu
//!     image: images/pioneer.jpg
//! default_clubs:               # omit to keep the stored list
//!   - name: Chess
//!     admin_emails: [chess@state.edu]
//!     category: games
//!     image: images/chess.png
//! ```
//!
//! Image paths are relative to the file. Entries missing from a listed
//! `dorms` or `default_clubs` section are removed, which queues their clubs
//! for deletion behind the confirmation gate.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use campus_hub_admin::AppState;
use campus_hub_admin::config::AdminConfig;
use campus_hub_admin::models::{Actor, DesiredDefaultClub, DesiredDorm, ImageUpload, Location};
use campus_hub_admin::services::{EditSession, ReconcileReport, SaveOutcome};
use campus_hub_core::{AccountId, CampusId, Email, LocationId};

use super::CommandError;

/// Arguments of `ch-cli reconcile`.
#[derive(Debug)]
pub struct ReconcileArgs {
    pub campus_id: String,
    pub file: PathBuf,
    pub actor: String,
    pub actor_email: Option<String>,
    pub confirm_deletions: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct DesiredFile {
    #[serde(default)]
    campus: Option<CampusSection>,
    #[serde(default)]
    dorms: Option<Vec<DormEntry>>,
    #[serde(default)]
    default_clubs: Option<Vec<DefaultClubEntry>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct CampusSection {
    name: Option<String>,
    short_name: Option<String>,
    locations: Option<Vec<Location>>,
    is_active: Option<bool>,
    admin_emails: Option<Vec<String>>,
    is_university: Option<bool>,
    logo: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DormEntry {
    name: String,
    location_id: Option<String>,
    admin_email: Option<String>,
    image: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DefaultClubEntry {
    name: String,
    #[serde(default)]
    admin_emails: Vec<String>,
    category: Option<String>,
    logo_url: Option<String>,
    image: Option<PathBuf>,
}

async fn read_file(path: &Path) -> Result<Vec<u8>, CommandError> {
    tokio::fs::read(path).await.map_err(|source| CommandError::Io {
        path: path.to_path_buf(),
        source,
    })
}

async fn read_image(base: &Path, path: &Path) -> Result<ImageUpload, CommandError> {
    let full = base.join(path);
    let bytes = read_file(&full).await?;
    let file_name = path
        .file_name()
        .map_or_else(|| "image".to_owned(), |n| n.to_string_lossy().into_owned());
    Ok(ImageUpload { file_name, bytes })
}

async fn read_optional_image(
    base: &Path,
    path: Option<&PathBuf>,
) -> Result<Option<ImageUpload>, CommandError> {
    match path {
        Some(path) => Ok(Some(read_image(base, path).await?)),
        None => Ok(None),
    }
}

/// Apply the file to the session the way an administrator would edit the form.
async fn apply(
    session: &mut EditSession,
    file: DesiredFile,
    base: &Path,
) -> Result<(), CommandError> {
    if let Some(section) = file.campus {
        let new_logo = read_optional_image(base, section.logo.as_ref()).await?;
        let campus = session.campus_mut();
        if let Some(name) = section.name {
            campus.name = name;
        }
        if section.short_name.is_some() {
            campus.short_name = section.short_name;
        }
        if let Some(locations) = section.locations {
            campus.locations = locations;
        }
        if let Some(is_active) = section.is_active {
            campus.is_active = is_active;
        }
        if let Some(admin_emails) = section.admin_emails {
            campus.admin_emails = admin_emails;
        }
        if let Some(is_university) = section.is_university {
            campus.is_university = is_university;
        }
        if new_logo.is_some() {
            campus.new_logo = new_logo;
        }
    }

    if let Some(dorms) = file.dorms {
        let wanted: BTreeSet<&str> = dorms.iter().map(|d| d.name.as_str()).collect();
        let stale: Vec<String> = session
            .dorms()
            .iter()
            .map(|d| d.name.clone())
            .filter(|name| !wanted.contains(name.as_str()))
            .collect();
        for name in stale {
            session.remove_dorm(&name)?;
        }

        for entry in dorms {
            let image = read_optional_image(base, entry.image.as_ref()).await?;
            let location_id = entry.location_id.map(LocationId::new);
            if let Ok(dorm) = session.dorm_mut(&entry.name) {
                if location_id.is_some() {
                    dorm.location_id = location_id;
                }
                dorm.admin_email = entry.admin_email;
                if image.is_some() {
                    dorm.image = image;
                }
            } else {
                let mut dorm = DesiredDorm::new(entry.name);
                dorm.location_id = location_id;
                dorm.admin_email = entry.admin_email;
                dorm.image = image;
                session.add_dorm(dorm);
            }
        }
    }

    if let Some(clubs) = file.default_clubs {
        let wanted: BTreeSet<&str> = clubs.iter().map(|c| c.name.as_str()).collect();
        let stale: Vec<String> = session
            .default_clubs()
            .iter()
            .map(|c| c.name.clone())
            .filter(|name| !wanted.contains(name.as_str()))
            .collect();
        for name in stale {
            session.remove_default_club(&name)?;
        }

        for entry in clubs {
            let image = read_optional_image(base, entry.image.as_ref()).await?;
            if let Ok(club) = session.default_club_mut(&entry.name) {
                club.admin_emails = entry.admin_emails;
                club.category = entry.category;
                if entry.logo_url.is_some() {
                    club.logo_url = entry.logo_url;
                }
                if image.is_some() {
                    club.image = image;
                }
            } else {
                let mut club = DesiredDefaultClub::new(entry.name);
                club.admin_emails = entry.admin_emails;
                club.category = entry.category;
                club.logo_url = entry.logo_url;
                club.image = image;
                session.add_default_club(club);
            }
        }
    }

    Ok(())
}

/// Load, apply, save; walk the deletion prompts if allowed.
///
/// # Errors
///
/// Returns an error if the file is unreadable, the campus cannot be loaded,
/// the save fails, or deletions are queued without `--confirm-deletions`.
pub async fn run(config: &AdminConfig, args: ReconcileArgs) -> Result<(), CommandError> {
    let state = AppState::from_config(config).await?;
    let report = reconcile(&state, args).await?;

    tracing::info!(
        dorms = report.snapshot.dorms.len(),
        default_clubs = report.snapshot.default_clubs.len(),
        "Campus reconciled"
    );
    #[allow(clippy::print_stdout)]
    {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}

async fn reconcile(state: &AppState, args: ReconcileArgs) -> Result<ReconcileReport, CommandError> {
    let raw = read_file(&args.file).await?;
    let file: DesiredFile = serde_yaml::from_slice(&raw)?;
    let base = args
        .file
        .parent()
        .map_or_else(PathBuf::new, Path::to_path_buf);

    let actor = Actor {
        account_id: AccountId::new(args.actor),
        email: args.actor_email.as_deref().map(Email::parse).transpose()?,
    };

    let engine = state.engine();
    let mut session = EditSession::load(&engine, CampusId::new(args.campus_id), actor).await?;
    apply(&mut session, file, &base).await?;

    let mut outcome = session.save(&engine).await?;
    loop {
        match outcome {
            SaveOutcome::Saved(report) => return Ok(*report),
            SaveOutcome::AwaitingConfirmation(stage) => {
                let pending = session.pending();
                let queued = pending.len();
                if !args.confirm_deletions {
                    tracing::warn!(queued, "{}", stage.prompt());
                    for dorm in &pending.dorms {
                        tracing::warn!(dorm = %dorm.name, "Dorm club queued for deletion");
                    }
                    for club in &pending.default_clubs {
                        tracing::warn!(club = %club.name, "Default club queued for deletion");
                    }
                    session.cancel();
                    return Err(CommandError::ConfirmationRequired {
                        queued,
                        prompt: stage.prompt(),
                    });
                }
                tracing::info!(stage = %stage, queued, "{}", stage.prompt());
                outcome = session.advance(&engine).await?;
            }
        }
    }
}
