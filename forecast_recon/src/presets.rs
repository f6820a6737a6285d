//! Ready-made hierarchies

use crate::error::Result;
use crate::hierarchy::{Hierarchy, HierarchyBuilder};

/// Total → brand → country → channel hierarchy used by the platform's sample data.
///
/// Three brands are sold in the US, Canada and the UK. Only Brand A's
/// countries are broken down further into retail and hospital channels.
pub fn pharma_hierarchy() -> Result<Hierarchy> {
    let mut builder = HierarchyBuilder::new();
    builder.add_children("Total", ["Brand_A", "Brand_B", "Brand_C"]);
    for brand in ["Brand_A", "Brand_B", "Brand_C"] {
        builder.add_children(
            brand,
            ["US", "CA", "UK"].map(|country| format!("{brand}_{country}")),
        );
    }
    for country in ["US", "CA", "UK"] {
        let node = format!("Brand_A_{country}");
        builder.add_children(
            node.clone(),
            ["Retail", "Hospital"].map(|channel| format!("{node}_{channel}")),
        );
    }
    builder.build()
}
