pub mod render_cache;

pub use render_cache::RenderCache;
