pub mod poi_loader;
