use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::impl_resource;
use crate::utils::validation::{Validate, ValidationErrors};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeAudience {
    #[default]
    All,
    Students,
    Teachers,
    Parents,
    Staff,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notice {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub title: String,
    #[serde(alias = "content")]
    pub body: String,
    #[serde(default)]
    pub audience: NoticeAudience,
    pub publish_date: NaiveDate,
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,
    #[serde(default)]
    pub is_pinned: bool,
}

impl Notice {
    /// Published and not yet expired on `date`
    pub fn is_visible_on(&self, date: NaiveDate) -> bool {
        self.publish_date <= date && self.expiry_date.is_none_or(|expiry| date <= expiry)
    }
}

impl Validate for Notice {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.require("title", &self.title);
        errors.require("body", &self.body);
        if let Some(expiry) = self.expiry_date {
            errors.date_order("expiry_date", self.publish_date, expiry);
        }
        errors.into_result()
    }
}

impl_resource!(Notice, "notices", validated);
