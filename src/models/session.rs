use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A browsing session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub session_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub is_active: bool,

    // Optional browse-filter preferences, settable via session update
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub section: String,
    #[serde(default)]
    pub garment_group: String,
    #[serde(default)]
    pub product_type: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub graphic_appearance: String,
}

impl Session {
    /// Creates a new active session with a random id
    pub fn new() -> Self {
        Self {
            session_id: Uuid::new_v4(),
            created_at: Utc::now(),
            is_active: true,
            name: String::new(),
            section: String::new(),
            garment_group: String::new(),
            product_type: String::new(),
            color: String::new(),
            graphic_appearance: String::new(),
        }
    }

    /// Merges the provided fields into the session, leaving absent ones untouched
    pub fn apply(&mut self, update: SessionUpdate) {
        if let Some(is_active) = update.is_active {
            self.is_active = is_active;
        }
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(section) = update.section {
            self.section = section;
        }
        if let Some(garment_group) = update.garment_group {
            self.garment_group = garment_group;
        }
        if let Some(product_type) = update.product_type {
            self.product_type = product_type;
        }
        if let Some(color) = update.color {
            self.color = color;
        }
        if let Some(graphic_appearance) = update.graphic_appearance {
            self.graphic_appearance = graphic_appearance;
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Partial session update as accepted by PUT /session/:id
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionUpdate {
    pub is_active: Option<bool>,
    pub name: Option<String>,
    pub section: Option<String>,
    pub garment_group: Option<String>,
    pub product_type: Option<String>,
    pub color: Option<String>,
    pub graphic_appearance: Option<String>,
}
