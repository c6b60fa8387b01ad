//! Deterministic demo data: a small instant-noodle catalog, three eaters, and
//! four-dimensional embeddings. `r-011` deliberately has no vector.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use curate_core::{Item, ItemId, Profile};
use rust_decimal::Decimal;

use crate::dataset::{Dataset, StoreError};
use crate::vectors::MemoryVectorStore;

pub const DEMO_VECTORS_LOCATION: &str = "memory://demo";

struct DemoItem {
    id: &'static str,
    label: &'static str,
    brand: &'static str,
    country: &'static str,
    style: &'static str,
    rating: (i64, u32),
    price: (i64, u32),
    vector: Option<[f32; 4]>,
}

const DEMO_ITEMS: &[DemoItem] = &[
    DemoItem {
        id: "r-001",
        label: "Tonkotsu Classic",
        brand: "Nissin",
        country: "Japan",
        style: "Bowl",
        rating: (475, 2),
        price: (287, 2),
        vector: Some([0.92, 0.31, 0.10, 0.05]),
    },
    DemoItem {
        id: "r-002",
        label: "Spicy Miso",
        brand: "Maruchan",
        country: "Japan",
        style: "Pack",
        rating: (4, 0),
        price: (157, 2),
        vector: Some([0.70, 0.62, 0.21, 0.10]),
    },
    DemoItem {
        id: "r-003",
        label: "Shin Ramyun",
        brand: "Nongshim",
        country: "South Korea",
        style: "Pack",
        rating: (375, 2),
        price: (102, 2),
        vector: Some([0.20, 0.95, 0.18, 0.12]),
    },
    DemoItem {
        id: "r-004",
        label: "Tom Yum Shrimp",
        brand: "Mama",
        country: "Thailand",
        style: "Cup",
        rating: (45, 1),
        price: (197, 2),
        vector: Some([0.15, 0.40, 0.88, 0.20]),
    },
    DemoItem {
        id: "r-005",
        label: "Curry Laksa",
        brand: "Prima Taste",
        country: "Singapore",
        style: "Pack",
        rating: (5, 0),
        price: (193, 2),
        vector: Some([0.25, 0.35, 0.80, 0.38]),
    },
    DemoItem {
        id: "r-006",
        label: "Shoyu Chicken",
        brand: "Nissin",
        country: "Japan",
        style: "Cup",
        rating: (425, 2),
        price: (243, 2),
        vector: Some([0.85, 0.20, 0.25, 0.30]),
    },
    DemoItem {
        id: "r-007",
        label: "Black Garlic Tonkotsu",
        brand: "Ichiran",
        country: "Japan",
        style: "Bowl",
        rating: (5, 0),
        price: (391, 2),
        vector: Some([0.95, 0.25, 0.05, 0.12]),
    },
    DemoItem {
        id: "r-008",
        label: "Buldak Carbonara",
        brand: "Samyang",
        country: "South Korea",
        style: "Bowl",
        rating: (45, 1),
        price: (416, 2),
        vector: Some([0.18, 0.90, 0.10, 0.35]),
    },
    DemoItem {
        id: "r-009",
        label: "Mi Goreng",
        brand: "Indomie",
        country: "Indonesia",
        style: "Pack",
        rating: (475, 2),
        price: (89, 2),
        vector: Some([0.30, 0.45, 0.50, 0.68]),
    },
    DemoItem {
        id: "r-010",
        label: "Beef Pho",
        brand: "Vifon",
        country: "Vietnam",
        style: "Bowl",
        rating: (35, 1),
        price: (145, 2),
        vector: Some([0.22, 0.15, 0.60, 0.75]),
    },
    DemoItem {
        id: "r-011",
        label: "Chicken Ramen",
        brand: "Nissin",
        country: "Japan",
        style: "Pack",
        rating: (325, 2),
        price: (75, 2),
        vector: None,
    },
];

pub fn demo_items() -> Vec<Item> {
    DEMO_ITEMS
        .iter()
        .map(|demo| Item {
            id: ItemId::new(demo.id),
            label: demo.label.to_string(),
            brand: demo.brand.to_string(),
            country: demo.country.to_string(),
            style: demo.style.to_string(),
            rating: Decimal::new(demo.rating.0, demo.rating.1),
            price: Decimal::new(demo.price.0, demo.price.1),
        })
        .collect()
}

pub fn demo_profiles() -> Vec<Profile> {
    vec![
        Profile::new("eater-1")
            .with_liked_items(["r-001", "r-007"])
            .with_liked_brands(["Nissin"])
            .with_liked_countries(["Japan"])
            .with_liked_styles(["Bowl"]),
        Profile::new("eater-2")
            .with_liked_items(["r-003"])
            .with_liked_brands(["Samyang", "Nongshim"])
            .with_prohibited_countries(["Japan"])
            .with_liked_styles(["Pack"]),
        Profile::new("eater-3").with_liked_brands(["Mama"]),
    ]
}

pub fn demo_dataset() -> Dataset {
    Dataset { items: demo_items(), profiles: demo_profiles() }
}

pub fn demo_vectors() -> HashMap<ItemId, Vec<f32>> {
    DEMO_ITEMS
        .iter()
        .filter_map(|demo| demo.vector.map(|vector| (ItemId::new(demo.id), vector.to_vec())))
        .collect()
}

pub fn demo_vector_store() -> MemoryVectorStore {
    MemoryVectorStore::default().with_set(DEMO_VECTORS_LOCATION, demo_vectors())
}

/// Writes `catalog.json` and `vectors.json` into `dir` and returns their paths.
pub fn write_demo_files(dir: &Path) -> Result<(PathBuf, PathBuf), StoreError> {
    let dataset_path = dir.join("catalog.json");
    let vectors_path = dir.join("vectors.json");

    fs::write(&dataset_path, demo_dataset().to_json_pretty()?)
        .map_err(|source| StoreError::Write { path: dataset_path.clone(), source })?;

    let ordered: std::collections::BTreeMap<ItemId, Vec<f32>> = demo_vectors().into_iter().collect();
    let vectors = serde_json::to_string_pretty(&ordered).map_err(StoreError::Encode)?;
    fs::write(&vectors_path, vectors)
        .map_err(|source| StoreError::Write { path: vectors_path.clone(), source })?;

    Ok((dataset_path, vectors_path))
}
