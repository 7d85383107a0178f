// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};

use crate::ids::*;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    /// Empty, a `data:` payload, an external URL, or a local file path.
    pub image: String,
    pub sponsored_link: Option<String>,
}

impl Product {
    pub fn blank(id: ProductId) -> Self {
        Self {
            id,
            name: String::new(),
            description: String::new(),
            image: String::new(),
            sponsored_link: None,
        }
    }

    pub fn field(&self, field: ProductField) -> &str {
        match field {
            ProductField::Name => &self.name,
            ProductField::Description => &self.description,
            ProductField::Image => &self.image,
            ProductField::SponsoredLink => self.sponsored_link.as_deref().unwrap_or(""),
        }
    }

    /// Returns a copy with exactly one field replaced. An empty sponsored link is
    /// stored as absent.
    pub fn with_field(&self, field: ProductField, value: impl Into<String>) -> Self {
        let value = value.into();
        let mut next = self.clone();
        match field {
            ProductField::Name => next.name = value,
            ProductField::Description => next.description = value,
            ProductField::Image => next.image = value,
            ProductField::SponsoredLink => {
                next.sponsored_link = if value.is_empty() { None } else { Some(value) };
            }
        }
        next
    }

    pub fn visible_sponsored_link(&self) -> Option<&str> {
        self.sponsored_link
            .as_deref()
            .filter(|link| !link.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductField {
    Name,
    Description,
    Image,
    SponsoredLink,
}

/// The editable text inputs of the overlay, in tab order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextField {
    Name,
    Description,
    SponsoredLink,
}

impl TextField {
    pub const ALL: [Self; 3] = [Self::Name, Self::Description, Self::SponsoredLink];

    pub const fn product_field(self) -> ProductField {
        match self {
            Self::Name => ProductField::Name,
            Self::Description => ProductField::Description,
            Self::SponsoredLink => ProductField::SponsoredLink,
        }
    }

    pub const fn placeholder(self) -> &'static str {
        match self {
            Self::Name => "Product Name",
            Self::Description => "Description",
            Self::SponsoredLink => "Add a sponsored link...",
        }
    }

    pub const fn index(self) -> usize {
        match self {
            Self::Name => 0,
            Self::Description => 1,
            Self::SponsoredLink => 2,
        }
    }

    pub fn rotate(self, delta: isize) -> Self {
        let len = Self::ALL.len() as isize;
        let next = (self.index() as isize + delta).rem_euclid(len) as usize;
        Self::ALL[next]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppMode {
    Nav,
    Edit,
}

impl AppMode {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Nav => "NAV",
            Self::Edit => "EDIT",
        }
    }

    pub const fn is_editable(self) -> bool {
        matches!(self, Self::Edit)
    }
}
