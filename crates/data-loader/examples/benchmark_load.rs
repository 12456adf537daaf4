use data_loader::{CfSnapshot, DataIndex, EmbeddingSnapshot};
use std::path::PathBuf;
use std::time::Instant;

fn main() {
    let data_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("data/catalog"));

    println!("Loading catalog from {}...\n", data_dir.display());

    let start = Instant::now();
    let index = DataIndex::load_from_files(&data_dir).expect("Failed to load catalog");
    let catalog_elapsed = start.elapsed();

    let (users, movies, ratings) = index.counts();

    println!("=== Catalog ===");
    println!("Time taken: {:?}", catalog_elapsed);
    println!("Users: {}", users);
    println!("Movies: {}", movies);
    println!("Ratings: {}", ratings);

    let start = Instant::now();
    match CfSnapshot::load(&data_dir.join("cf_model.json")) {
        Ok(cf) => println!("\nCF snapshot: {} items in {:?}", cf.item_map.len(), start.elapsed()),
        Err(e) => println!("\nCF snapshot unavailable: {}", e),
    }

    let start = Instant::now();
    match EmbeddingSnapshot::load(&data_dir.join("embeddings")) {
        Ok(snapshot) => println!(
            "Embeddings: {} x {} in {:?}",
            snapshot.matrix.rows,
            snapshot.matrix.cols,
            start.elapsed()
        ),
        Err(e) => println!("Embeddings unavailable: {}", e),
    }
}
