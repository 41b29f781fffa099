use serde::{Deserialize, Serialize};

use crate::impl_resource;
use crate::utils::validation::{Validate, ValidationErrors, is_valid_isbn};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Book {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub title: String,
    #[serde(default)]
    pub isbn: Option<String>,
    #[serde(default)]
    pub author: Option<i64>,
    #[serde(default, skip_serializing)]
    pub author_name: Option<String>, // read-only, filled by the server
    #[serde(default)]
    pub category: Option<i64>,
    #[serde(default)]
    pub publisher: Option<String>,
    #[serde(default)]
    pub publication_year: Option<i32>,
    #[serde(default)]
    pub total_copies: u32,
    #[serde(default)]
    pub available_copies: u32,
    #[serde(default)]
    pub shelf_location: Option<String>,
}

impl Book {
    pub fn is_available(&self) -> bool {
        self.available_copies > 0
    }

    pub fn borrowed_copies(&self) -> u32 {
        self.total_copies.saturating_sub(self.available_copies)
    }
}

impl Validate for Book {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.require("title", &self.title);
        if let Some(isbn) = &self.isbn
            && !isbn.trim().is_empty()
            && !is_valid_isbn(isbn)
        {
            errors.add("isbn", "Enter a valid ISBN-10 or ISBN-13.");
        }
        if self.available_copies > self.total_copies {
            errors.add(
                "available_copies",
                "Cannot exceed the total number of copies.",
            );
        }
        errors.into_result()
    }
}

impl_resource!(Book, "library/books", validated);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_available_cannot_exceed_total() {
        let book = Book {
            title: "Dune".to_string(),
            total_copies: 2,
            available_copies: 3,
            ..Default::default()
        };
        let errors = book.validate().unwrap_err();
        assert!(errors.has("available_copies"));
    }

    #[test]
    fn test_author_name_is_not_sent() {
        let book = Book {
            title: "Dune".to_string(),
            author_name: Some("Frank Herbert".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_value(&book).unwrap();
        assert!(json.get("author_name").is_none());
        assert!(json.get("id").is_none());
    }
}
