//! Sample pets for driving tests.
//!
//! Generated pets embed a millisecond timestamp and a process-wide sequence
//! number in their names so concurrently running tests never collide on the
//! shared service.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::{json, Value};

use crate::types::{Category, Pet, PetStatus, Tag};

pub const PET_STATUSES: [PetStatus; 3] = [PetStatus::Available, PetStatus::Pending, PetStatus::Sold];

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// `<millis>-<seq>`, unique within the process.
pub fn unique_suffix() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("{millis}-{seq}")
}

fn category(id: i64, name: &str) -> Option<Category> {
    Some(Category {
        id: Some(id),
        name: Some(name.to_string()),
    })
}

fn tag(id: i64, name: &str) -> Tag {
    Tag {
        id: Some(id),
        name: Some(name.to_string()),
    }
}

pub fn valid_pet() -> Pet {
    Pet {
        id: None,
        category: category(1, "Dogs"),
        name: "Fluffy".to_string(),
        photo_urls: vec!["https://example.com/fluffy.jpg".to_string()],
        tags: Some(vec![tag(1, "friendly"), tag(2, "small")]),
        status: Some(PetStatus::Available),
    }
}

/// Required fields only.
pub fn minimal_pet() -> Pet {
    Pet {
        name: "Buddy".to_string(),
        photo_urls: vec!["https://example.com/buddy.jpg".to_string()],
        ..Pet::default()
    }
}

pub fn updated_pet() -> Pet {
    Pet {
        id: None,
        category: category(2, "Cats"),
        name: "Fluffy Updated".to_string(),
        photo_urls: vec!["https://example.com/fluffy-updated.jpg".to_string()],
        tags: Some(vec![tag(3, "updated")]),
        status: Some(PetStatus::Sold),
    }
}

/// Lacks the required `name` field.
pub fn pet_without_name() -> Value {
    json!({
        "photoUrls": ["https://example.com/invalid.jpg"],
        "status": "available"
    })
}

/// `status` outside the three allowed values.
pub fn pet_with_invalid_status() -> Value {
    json!({
        "name": "InvalidStatusPet",
        "photoUrls": ["https://example.com/pet.jpg"],
        "status": "invalid-status"
    })
}

pub fn create_pet_with_status(status: PetStatus) -> Pet {
    Pet {
        id: None,
        category: category(1, "TestCategory"),
        name: format!("Pet-{status}-{}", unique_suffix()),
        photo_urls: vec![format!("https://example.com/{status}.jpg")],
        tags: None,
        status: Some(status),
    }
}

/// A pet with a preset `id`, for probing service-side id handling.
pub fn create_pet_with_id(id: i64) -> Pet {
    Pet {
        id: Some(id),
        category: None,
        name: format!("Pet-{id}"),
        photo_urls: vec![format!("https://example.com/pet-{id}.jpg")],
        tags: None,
        status: Some(PetStatus::Available),
    }
}

/// `count` distinct pets cycling through available, pending, sold.
pub fn create_multiple_pets(count: usize) -> Vec<Pet> {
    (0..count)
        .map(|i| Pet {
            id: None,
            category: category(1, "TestCategory"),
            name: format!("TestPet-{}-{}", i + 1, unique_suffix()),
            photo_urls: vec![format!("https://example.com/pet-{}.jpg", i + 1)],
            tags: None,
            status: Some(PET_STATUSES[i % PET_STATUSES.len()]),
        })
        .collect()
}
