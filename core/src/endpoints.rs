//! Path templates of the pet-store API, relative to the configured base URL.

pub const PET: &str = "/pet";
pub const PET_FIND_BY_STATUS: &str = "/pet/findByStatus";
pub const PET_FIND_BY_TAGS: &str = "/pet/findByTags";

pub fn pet_by_id(id: i64) -> String {
    format!("/pet/{id}")
}

pub fn pet_upload_image(id: i64) -> String {
    format!("/pet/{id}/uploadImage")
}
