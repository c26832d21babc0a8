pub mod parser_cache;

pub use parser_cache::{CacheEntry, CacheStats, ParserResultCache};
