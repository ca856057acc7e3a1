use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::ReviewsError;

/// Product categories published in the Amazon Reviews 2023 collection, in hub order.
pub const CATEGORIES: [&str; 34] = [
    "All_Beauty",
    "Amazon_Fashion",
    "Appliances",
    "Arts_Crafts_and_Sewing",
    "Automotive",
    "Baby_Products",
    "Beauty_and_Personal_Care",
    "Books",
    "CDs_and_Vinyl",
    "Cell_Phones_and_Accessories",
    "Clothing_Shoes_and_Jewelry",
    "Digital_Music",
    "Electronics",
    "Gift_Cards",
    "Grocery_and_Gourmet_Food",
    "Handmade_Products",
    "Health_and_Household",
    "Health_and_Personal_Care",
    "Home_and_Kitchen",
    "Industrial_and_Scientific",
    "Kindle_Store",
    "Magazine_Subscriptions",
    "Movies_and_TV",
    "Musical_Instruments",
    "Office_Products",
    "Patio_Lawn_and_Garden",
    "Pet_Supplies",
    "Software",
    "Sports_and_Outdoors",
    "Subscription_Boxes",
    "Tools_and_Home_Improvement",
    "Toys_and_Games",
    "Video_Games",
    "Unknown",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Category(&'static str);

impl Category {
    pub fn as_str(&self) -> &'static str {
        self.0
    }

    pub fn all() -> Vec<Category> {
        CATEGORIES.iter().copied().map(Category).collect()
    }

    pub fn contains(name: &str) -> bool {
        CATEGORIES.contains(&name)
    }

    /// Parses every name, or fails naming all of the invalid ones at once.
    pub fn parse_all<S: AsRef<str>>(names: &[S]) -> Result<Vec<Category>, ReviewsError> {
        let mut valid = Vec::with_capacity(names.len());
        let mut invalid: Vec<String> = Vec::new();
        for name in names {
            let name = name.as_ref();
            match name.parse::<Category>() {
                Ok(category) => valid.push(category),
                Err(_) => {
                    if !invalid.iter().any(|seen| seen == name) {
                        invalid.push(name.to_string());
                    }
                }
            }
        }
        if !invalid.is_empty() {
            return Err(ReviewsError::InvalidCategories(invalid));
        }
        Ok(valid)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Category {
    type Err = ReviewsError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        CATEGORIES
            .iter()
            .find(|name| **name == value)
            .map(|name| Category(*name))
            .ok_or_else(|| ReviewsError::InvalidCategories(vec![value.to_string()]))
    }
}

impl Serialize for Category {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetType {
    Review,
    Meta,
}

impl DatasetType {
    pub const ALL: [DatasetType; 2] = [DatasetType::Review, DatasetType::Meta];

    pub fn as_str(&self) -> &'static str {
        match self {
            DatasetType::Review => "review",
            DatasetType::Meta => "meta",
        }
    }
}

impl fmt::Display for DatasetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DatasetType {
    type Err = ReviewsError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "review" => Ok(DatasetType::Review),
            "meta" => Ok(DatasetType::Meta),
            _ => Err(ReviewsError::InvalidDatasetType(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CompressionFormat {
    #[default]
    Gz,
    Bz2,
    Xz,
}

impl CompressionFormat {
    pub const ALL: [CompressionFormat; 3] = [
        CompressionFormat::Gz,
        CompressionFormat::Bz2,
        CompressionFormat::Xz,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CompressionFormat::Gz => "gz",
            CompressionFormat::Bz2 => "bz2",
            CompressionFormat::Xz => "xz",
        }
    }

    /// Archive suffix, including the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            CompressionFormat::Gz => ".tar.gz",
            CompressionFormat::Bz2 => ".tar.bz2",
            CompressionFormat::Xz => ".tar.xz",
        }
    }
}

impl fmt::Display for CompressionFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CompressionFormat {
    type Err = ReviewsError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "gz" => Ok(CompressionFormat::Gz),
            "bz2" => Ok(CompressionFormat::Bz2),
            "xz" => Ok(CompressionFormat::Xz),
            _ => Err(ReviewsError::UnsupportedCompressionFormat(
                value.to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CompressionLevel(u32);

impl CompressionLevel {
    pub const MIN: u32 = 1;
    pub const MAX: u32 = 9;
    pub const DEFAULT: u32 = 6;

    pub fn new(level: u32) -> Result<Self, ReviewsError> {
        if !(Self::MIN..=Self::MAX).contains(&level) {
            return Err(ReviewsError::InvalidCompressionLevel(level));
        }
        Ok(Self(level))
    }

    pub fn get(&self) -> u32 {
        self.0
    }

    pub fn speed_label(&self) -> &'static str {
        match self.0 {
            0..=3 => "Fast",
            4..=6 => "Medium",
            _ => "Slow",
        }
    }

    pub fn ratio_label(&self) -> &'static str {
        match self.0 {
            0..=3 => "Low",
            4..=6 => "Medium",
            _ => "High",
        }
    }
}

impl Default for CompressionLevel {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}

impl fmt::Display for CompressionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionSettings {
    pub format: CompressionFormat,
    pub level: CompressionLevel,
}

/// One `(type, category)` pair; maps to a hub config named `raw_<type>_<category>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SplitRequest {
    pub dataset_type: DatasetType,
    pub category: Category,
}

impl SplitRequest {
    pub fn new(dataset_type: DatasetType, category: Category) -> Self {
        Self {
            dataset_type,
            category,
        }
    }

    pub fn config_name(&self) -> String {
        format!("raw_{}_{}", self.dataset_type, self.category)
    }

    /// Path of the split's file inside the dataset repository.
    pub fn remote_path(&self) -> String {
        match self.dataset_type {
            DatasetType::Review => format!("raw/review_categories/{}.jsonl", self.category),
            DatasetType::Meta => format!("raw/meta_categories/meta_{}.jsonl", self.category),
        }
    }
}
