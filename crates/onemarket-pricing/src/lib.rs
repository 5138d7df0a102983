pub mod candidates;
pub mod consistency;
pub mod engine;
pub mod error;
pub mod normalize;
pub mod parse;
pub mod resolver;
pub mod store;

#[cfg(test)]
mod fixtures;

pub use candidates::{build_candidates, PriceSourceConfig};
pub use consistency::filter_priceable;
pub use engine::{price_items, round_to, scale_to_weight, total_weight, Items, PricedItems};
pub use error::PricingError;
pub use normalize::{fold_key, ProductKeyNormalizer};
pub use parse::{parse_payload, parse_price, ParsedPrices, SourceFormat};
pub use resolver::{CandidateFailure, PriceResolver, PricesUpdated, RefreshOutcome};
pub use store::CatalogStore;
