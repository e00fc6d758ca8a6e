/// Category -> (display name, base item ID) lookup for the fetch controls.
pub const CATEGORIES: &[(&str, &[(&str, &str)])] = &[
    (
        "Gathered Resources",
        &[
            ("Ore", "ORE"),
            ("Wood", "WOOD"),
            ("Hide", "HIDE"),
            ("Fiber", "FIBER"),
            ("Rock", "ROCK"),
        ],
    ),
    (
        "Refined Resources",
        &[
            ("Metal Bar", "METALBAR"),
            ("Planks", "PLANKS"),
            ("Leather", "LEATHER"),
            ("Cloth", "CLOTH"),
            ("Stone Block", "STONEBLOCK"),
        ],
    ),
    (
        "Consumables",
        &[
            ("Healing Potion", "POTION_HEAL"),
            ("Energy Potion", "POTION_ENERGY"),
            ("Soup", "MEAL_SOUP"),
            ("Salad", "MEAL_SALAD"),
            ("Pie", "MEAL_PIE"),
            ("Omelette", "MEAL_OMELETTE"),
            ("Stew", "MEAL_STEW"),
            ("Sandwich", "MEAL_SANDWICH"),
        ],
    ),
    ("Equipment", &[("Bag", "BAG"), ("Cape", "CAPE")]),
    (
        "Mounts",
        &[("Riding Horse", "MOUNT_HORSE"), ("Transport Ox", "MOUNT_OX")],
    ),
];

/// Trading hubs the analyzer queries.
pub const LOCATIONS: &[&str] = &[
    "Caerleon",
    "Bridgewatch",
    "Fort Sterling",
    "Lymhurst",
    "Martlock",
    "Thetford",
];

/// Expand base IDs into concrete item IDs across tiers and enchantment
/// levels: ("ORE", [4], [0, 1]) -> ["T4_ORE", "T4_ORE_LEVEL1@1"].
pub fn generate_item_list(base_ids: &[&str], tiers: &[i64], enchants: &[i64]) -> Vec<String> {
    // No enchantment selection means flat items only.
    let enchants = if enchants.is_empty() { &[0][..] } else { enchants };

    let mut ids = Vec::new();
    for base in base_ids {
        for tier in tiers {
            let flat = format!("T{tier}_{base}");
            for ench in enchants {
                if *ench == 0 {
                    ids.push(flat.clone());
                } else {
                    ids.push(format!("{flat}_LEVEL{ench}@{ench}"));
                }
            }
        }
    }
    ids
}
