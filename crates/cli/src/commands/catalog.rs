use atelier_core::{PoseCatalog, Wardrobe};

use super::print_json;
use crate::OutputFormat;

pub(crate) fn cmd_poses(catalog: &PoseCatalog, output: OutputFormat) {
    match output {
        OutputFormat::Json => {
            let poses: Vec<serde_json::Value> = catalog
                .iter()
                .enumerate()
                .map(|(index, instruction)| {
                    serde_json::json!({ "index": index, "instruction": instruction })
                })
                .collect();
            print_json(&serde_json::json!({ "poses": poses }));
        }
        OutputFormat::Text => {
            for (index, instruction) in catalog.iter().enumerate() {
                println!("{:>2}  {}", index, instruction);
            }
        }
    }
}

pub(crate) fn cmd_wardrobe(wardrobe: &Wardrobe, output: OutputFormat) {
    match output {
        OutputFormat::Json => {
            let items: Vec<&atelier_core::Garment> = wardrobe.iter().collect();
            print_json(&serde_json::json!({ "wardrobe": items }));
        }
        OutputFormat::Text => {
            let width = wardrobe.iter().map(|g| g.id.len()).max().unwrap_or(0);
            for garment in wardrobe.iter() {
                println!(
                    "{:<width$}  {}  {}",
                    garment.id,
                    garment.name,
                    garment.image,
                    width = width
                );
            }
        }
    }
}
