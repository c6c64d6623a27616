use vault_core::{CatalogEntry, PendingFile};

pub fn entry(id: i64, name: &str) -> CatalogEntry {
    CatalogEntry {
        id,
        name: name.to_string(),
        description: String::new(),
        image_url: format!("/uploads/PV-{}/{}", id, name),
        folder_path: Some(format!("PV-{}", id)),
        created_at: None,
    }
}

/// `count` entries with ids `1..=count`
pub fn catalog(count: i64) -> Vec<CatalogEntry> {
    (1..=count)
        .map(|id| entry(id, &format!("product-{}.png", id)))
        .collect()
}

pub fn image(name: &str) -> PendingFile {
    let mime = if name.ends_with(".jpg") {
        "image/jpeg"
    } else {
        "image/png"
    };
    PendingFile::new(name, mime, vec![0x89u8; 64])
}
