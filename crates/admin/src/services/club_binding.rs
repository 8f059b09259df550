//! Finds or creates the club derived from a dorm or default-club entry.
//!
//! Derived clubs are matched, never recreated: a dorm's club is the single
//! non-default club of the campus carrying the dorm's exact name, and a
//! default club is matched by its persisted id first and by name second.
//! A match is updated in place so its members, join state and cover image
//! survive every save.

use tracing::{debug, info};

use campus_hub_core::{CampusId, ClubId, Email, Identity};

use crate::db::{ClubRepository, RepositoryError};
use crate::models::{Actor, Club, ClubPatch, DORM_CATEGORY, ImageUpload, NewClub};
use crate::store::BlobStore;

/// Blob path of a campus logo.
#[must_use]
pub fn campus_logo_path(campus_id: &CampusId, image: &ImageUpload) -> String {
    format!("campuses/{campus_id}/logo/{}", file_segment(&image.file_name))
}

/// Blob path of a dorm club's cover image.
#[must_use]
pub fn dorm_image_path(campus_id: &CampusId, dorm_name: &str, image: &ImageUpload) -> String {
    format!(
        "campuses/{campus_id}/dorms/{}/{}",
        slug(dorm_name),
        file_segment(&image.file_name)
    )
}

/// Blob path of a default club's logo.
#[must_use]
pub fn default_club_image_path(
    campus_id: &CampusId,
    club_name: &str,
    image: &ImageUpload,
) -> String {
    format!(
        "campuses/{campus_id}/default-clubs/{}/{}",
        slug(club_name),
        file_segment(&image.file_name)
    )
}

/// Lowercase ASCII alphanumerics, every other run collapsed to one `-`.
fn slug(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.is_empty() && !out.ends_with('-') {
            out.push('-');
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    if out.is_empty() {
        out.push_str("unnamed");
    }
    out
}

/// Last segment of an uploaded file name; never empty, never `.` or `..`.
fn file_segment(file_name: &str) -> &str {
    match file_name.rsplit(['/', '\\']).next() {
        Some(segment) if !segment.is_empty() && segment != "." && segment != ".." => segment,
        _ => "image",
    }
}

/// Inputs for binding one dorm to its club.
#[derive(Debug, Clone, Copy)]
pub struct DormBinding<'b> {
    /// Owning campus.
    pub campus_id: &'b CampusId,
    /// Campus display name, used in the club description.
    pub campus_name: &'b str,
    /// Dorm name; the lookup key.
    pub dorm_name: &'b str,
    /// Admin email override carried by the dorm row.
    pub admin_override: Option<&'b Email>,
    /// Campus admin emails, used when there is no override.
    pub campus_admins: &'b [Email],
    /// New cover image.
    pub image: Option<&'b ImageUpload>,
}

/// Inputs for binding one default-club entry to its club.
#[derive(Debug, Clone, Copy)]
pub struct DefaultClubBinding<'b> {
    /// Owning campus.
    pub campus_id: &'b CampusId,
    /// Persisted id, or the name for entries added since load.
    pub identity: &'b Identity<ClubId>,
    /// Club name.
    pub name: &'b str,
    /// Administrator emails.
    pub admin_emails: &'b [Email],
    /// Current logo url, kept when no new image is uploaded.
    pub logo_url: Option<&'b str>,
    /// New logo.
    pub image: Option<&'b ImageUpload>,
    /// Category; never the dorm category.
    pub category: Option<&'b str>,
}

/// Outcome of a binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    /// The bound club.
    pub club_id: ClubId,
    /// Whether the club was created by this call.
    pub created: bool,
}

/// Club Binding Resolver.
pub struct ClubBindingResolver<'a> {
    clubs: ClubRepository<'a>,
    blobs: &'a dyn BlobStore,
}

impl<'a> ClubBindingResolver<'a> {
    /// Create a resolver writing through `clubs` and uploading to `blobs`.
    #[must_use]
    pub const fn new(clubs: ClubRepository<'a>, blobs: &'a dyn BlobStore) -> Self {
        Self { clubs, blobs }
    }

    /// Find or create the dorm club of `binding.dorm_name`.
    ///
    /// An existing club gets the dorm category, the new image if one was
    /// picked, and the override admin email if the dorm has one; its other
    /// admin emails are left alone. A new club is created with the image
    /// already uploaded and an owner membership for `actor`.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup, upload, or write fails.
    pub async fn bind_dorm_club(
        &self,
        binding: DormBinding<'_>,
        actor: &Actor,
    ) -> Result<Binding, RepositoryError> {
        let cover_image_url = match binding.image {
            Some(image) => Some(
                self.blobs
                    .upload(
                        &dorm_image_path(binding.campus_id, binding.dorm_name, image),
                        &image.bytes,
                    )
                    .await?,
            ),
            None => None,
        };

        if let Some(club) = self
            .clubs
            .find_dorm_club(binding.campus_id, binding.dorm_name)
            .await?
        {
            let patch = ClubPatch {
                category: Some(DORM_CATEGORY.to_owned()),
                admin_emails: binding.admin_override.map(|email| vec![email.clone()]),
                cover_image_url,
                ..ClubPatch::default()
            };
            self.clubs.update(&club.id, &patch).await?;
            debug!(club_id = %club.id, dorm = binding.dorm_name, "Bound dorm to existing club");
            return Ok(Binding {
                club_id: club.id,
                created: false,
            });
        }

        let admin_emails = binding
            .admin_override
            .map_or_else(|| binding.campus_admins.to_vec(), |email| vec![email.clone()]);
        let club_id = self
            .clubs
            .create(
                NewClub {
                    name: binding.dorm_name.to_owned(),
                    campus_id: binding.campus_id.clone(),
                    is_default: false,
                    category: Some(DORM_CATEGORY.to_owned()),
                    description: format!(
                        "Residents of {} at {}.",
                        binding.dorm_name, binding.campus_name
                    ),
                    admin_emails,
                    cover_image_url,
                },
                actor,
            )
            .await?;
        info!(club_id = %club_id, dorm = binding.dorm_name, "Created dorm club");
        Ok(Binding {
            club_id,
            created: true,
        })
    }

    /// Find or create the default club of one default-club entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup, upload, or write fails.
    pub async fn bind_default_club(
        &self,
        binding: DefaultClubBinding<'_>,
        actor: &Actor,
    ) -> Result<Binding, RepositoryError> {
        let cover_image_url = match binding.image {
            Some(image) => Some(
                self.blobs
                    .upload(
                        &default_club_image_path(binding.campus_id, binding.name, image),
                        &image.bytes,
                    )
                    .await?,
            ),
            None => binding.logo_url.map(str::to_owned),
        };

        if let Some(club) = self.existing_default_club(&binding).await? {
            let patch = ClubPatch {
                name: Some(binding.name.to_owned()),
                category: binding.category.map(str::to_owned),
                admin_emails: Some(binding.admin_emails.to_vec()),
                cover_image_url,
                is_default: Some(true),
            };
            self.clubs.update(&club.id, &patch).await?;
            debug!(club_id = %club.id, name = binding.name, "Updated default club");
            return Ok(Binding {
                club_id: club.id,
                created: false,
            });
        }

        let club_id = self
            .clubs
            .create(
                NewClub {
                    name: binding.name.to_owned(),
                    campus_id: binding.campus_id.clone(),
                    is_default: true,
                    category: binding.category.map(str::to_owned),
                    description: String::new(),
                    admin_emails: binding.admin_emails.to_vec(),
                    cover_image_url,
                },
                actor,
            )
            .await?;
        info!(club_id = %club_id, name = binding.name, "Created default club");
        Ok(Binding {
            club_id,
            created: true,
        })
    }

    /// Identity first, then the name.
    async fn existing_default_club(
        &self,
        binding: &DefaultClubBinding<'_>,
    ) -> Result<Option<Club>, RepositoryError> {
        if let Identity::Identified(id) = binding.identity
            && let Some(club) = self.clubs.get(id).await?
            && club.is_default
            && &club.campus_id == binding.campus_id
        {
            return Ok(Some(club));
        }
        self.clubs
            .find_default_club(binding.campus_id, binding.name)
            .await
    }
}
