use uuid::Uuid;

/// `<name>-<uuid v4>`: readable in the catalog, unique per registration.
pub fn generate_service_id(name: &str) -> String {
    format!("{}-{}", name, Uuid::new_v4().hyphenated())
}
