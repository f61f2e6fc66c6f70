//! Beverage catalog
//!
//! Products the office can reorder from the keg vendor, grouped by category
//! and brand. Orders are validated against this list before they are stored.

use serde::{Deserialize, Serialize};

/// Vendor order inbox
pub const VENDOR_EMAIL: &str = "orders@kegjoy.com";
/// Vendor phone, shown alongside the order
pub const VENDOR_PHONE: &str = "760.683.9208";

/// Placeholder flavor for brands whose lineup must be confirmed with the vendor
pub const CONTACT_VENDOR: &str = "Contact vendor for flavors";

/// A brand and the flavors it offers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Brand {
    pub id: &'static str,
    pub name: &'static str,
    pub flavors: &'static [&'static str],
}

/// A product category ("kombucha", "cold_brew")
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Category {
    pub key: &'static str,
    pub name: &'static str,
    pub brands: &'static [Brand],
}

pub static CATALOG: &[Category] = &[
    Category {
        key: "kombucha",
        name: "Kombucha",
        brands: &[
            Brand {
                id: "gts",
                name: "GT's Kombucha",
                flavors: &[
                    "Trilogy",
                    "Gingerade",
                    "Watermelon Wonder",
                    "Island Bliss",
                    "Strawberry Serenity",
                    "Golden Pineapple",
                    "Peach Paradise",
                    "Pure (Original)",
                ],
            },
            Brand {
                id: "health-ade",
                name: "Health-Ade Kombucha",
                flavors: &[
                    "Pink Lady Apple",
                    "Pomegranate",
                    "Berry Lemonade",
                    "Tangerine-Passionfruit",
                ],
            },
            Brand {
                id: "mightybooch",
                name: "MightyBooch Kombucha",
                flavors: &[CONTACT_VENDOR],
            },
            Brand {
                id: "marin",
                name: "Marin Kombucha",
                flavors: &[CONTACT_VENDOR],
            },
            Brand {
                id: "babe",
                name: "Babe Kombucha",
                flavors: &[CONTACT_VENDOR],
            },
            Brand {
                id: "bambucha",
                name: "Bambucha Kombucha",
                flavors: &[CONTACT_VENDOR],
            },
        ],
    },
    Category {
        key: "cold_brew",
        name: "Cold Brew Coffee",
        brands: &[
            Brand {
                id: "cwj",
                name: "Commonwealth Joe Nitro Cold Brew",
                flavors: &["NITRO Coffee (Medium Blend)"],
            },
            Brand {
                id: "bona-fide",
                name: "Bona Fide Craft Draft Coffee",
                flavors: &[CONTACT_VENDOR],
            },
            Brand {
                id: "groundwork",
                name: "Groundwork Cold Brew",
                flavors: &[CONTACT_VENDOR],
            },
            Brand {
                id: "steeping-giant",
                name: "Steeping Giant Cold Brew",
                flavors: &[CONTACT_VENDOR],
            },
        ],
    },
];

/// A catalog entry resolved from (category, brand, flavor)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogEntry {
    pub category: &'static Category,
    pub brand: &'static Brand,
    pub flavor: &'static str,
}

/// Look up a category by key
pub fn category(key: &str) -> Option<&'static Category> {
    CATALOG.iter().find(|c| c.key == key)
}

/// Resolve a product. Flavor matching is case-insensitive.
pub fn find(category_key: &str, brand_id: &str, flavor: &str) -> Option<CatalogEntry> {
    let category = category(category_key)?;
    let brand = category.brands.iter().find(|b| b.id == brand_id)?;
    let flavor = brand
        .flavors
        .iter()
        .find(|f| f.eq_ignore_ascii_case(flavor))?;

    Some(CatalogEntry {
        category,
        brand,
        flavor,
    })
}
