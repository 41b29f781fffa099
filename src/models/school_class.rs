use serde::{Deserialize, Serialize};

use crate::impl_resource;
use crate::utils::validation::{Validate, ValidationErrors};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchoolClass {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub grade: Option<String>,
    #[serde(default)]
    pub section: Option<String>,
    #[serde(default)]
    pub teacher: Option<i64>,
    #[serde(default)]
    pub room: Option<String>,
    pub capacity: u32,
    #[serde(default, skip_serializing)]
    pub student_count: u32,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

impl SchoolClass {
    /// Fraction of seats taken, 0.0 when the class has no capacity set
    pub fn occupancy(&self) -> f64 {
        if self.capacity == 0 {
            0.0
        } else {
            self.student_count as f64 / self.capacity as f64
        }
    }

    pub fn has_free_seat(&self) -> bool {
        self.student_count < self.capacity
    }
}

impl Validate for SchoolClass {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.require("name", &self.name);
        if self.capacity == 0 {
            errors.add("capacity", "Must be greater than zero.");
        }
        errors.into_result()
    }
}

impl_resource!(SchoolClass, "classes", validated);
