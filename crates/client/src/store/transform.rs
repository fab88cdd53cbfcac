//! Raw record to catalog item mapping.
//!
//! The posts API has no price, rating or image, so those are derived. Price
//! and rating come from an RNG seeded with the configured seed and the
//! record id, which makes them stable across fetches.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use itemdeck_core::{CATEGORIES, Item, ItemId, ItemsPage, Price, Rating, RawRecord, category_for};

use crate::config::CatalogConfig;

const LIST_IMAGE_SIZE: (u32, u32) = (300, 200);
const DETAIL_IMAGE_SIZE: (u32, u32) = (400, 300);

/// Golden-ratio increment, spreads consecutive ids across the seed space.
const SEED_MIX: u64 = 0x9E37_79B9_7F4A_7C15;

/// Maps raw records to items.
#[derive(Debug, Clone)]
pub struct ItemTransform {
    image_base: String,
    seed: u64,
    limit: usize,
}

impl ItemTransform {
    /// Build a transform from catalog configuration.
    #[must_use]
    pub fn new(config: &CatalogConfig) -> Self {
        Self {
            image_base: config
                .image_base_url
                .as_str()
                .trim_end_matches('/')
                .to_string(),
            seed: config.transform_seed,
            limit: config.items_limit,
        }
    }

    /// Items kept from a list response.
    #[must_use]
    pub const fn limit(&self) -> usize {
        self.limit
    }

    /// Build the first page from a list response.
    ///
    /// Categories follow list position.
    #[must_use]
    pub fn page(&self, records: Vec<RawRecord>) -> ItemsPage {
        let items: Vec<Item> = records
            .into_iter()
            .take(self.limit)
            .enumerate()
            .map(|(index, raw)| self.item(raw, category_for(index), LIST_IMAGE_SIZE))
            .collect();

        ItemsPage {
            total: items.len(),
            items,
            skip: 0,
            limit: self.limit,
        }
    }

    /// Build a detail item. The category follows the record id.
    #[must_use]
    pub fn detail(&self, raw: RawRecord) -> Item {
        let cycle = i32::try_from(CATEGORIES.len()).unwrap_or(i32::MAX);
        let key = usize::try_from(raw.id.as_i32().rem_euclid(cycle)).unwrap_or_default();
        self.item(raw, category_for(key), DETAIL_IMAGE_SIZE)
    }

    fn item(&self, raw: RawRecord, category: &str, (width, height): (u32, u32)) -> Item {
        let mut rng = self.rng_for(raw.id);

        let price = Price::from_whole(rng.random_range(10..1010));
        let rate: f64 = rng.random_range(1.0..5.0);
        let count = rng.random_range(1..100);

        Item {
            id: raw.id,
            image: format!("{}/{width}/{height}?random={}", self.image_base, raw.id),
            title: raw.title,
            description: raw.body,
            price,
            category: category.to_string(),
            rating: Rating {
                rate: (rate * 10.0).round() / 10.0,
                count,
            },
        }
    }

    fn rng_for(&self, id: ItemId) -> StdRng {
        let id = u64::from_le_bytes(i64::from(id.as_i32()).to_le_bytes());
        StdRng::seed_from_u64(self.seed ^ id.wrapping_mul(SEED_MIX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transform() -> ItemTransform {
        ItemTransform::new(&CatalogConfig::default())
    }

    fn record(id: i32) -> RawRecord {
        RawRecord {
            id: ItemId::new(id),
            title: format!("title {id}"),
            body: format!("body {id}"),
        }
    }

    #[test]
    fn test_page_limits_and_categories() {
        let records: Vec<RawRecord> = (1..=100).map(record).collect();
        let page = transform().page(records);

        assert_eq!(page.items.len(), 20);
        assert_eq!(page.total, 20);
        assert_eq!(page.skip, 0);
        assert_eq!(page.limit, 20);

        let categories: Vec<&str> = page.items.iter().map(|i| i.category.as_str()).collect();
        assert_eq!(
            categories.get(..6),
            Some(&["Electronics", "Clothing", "Books", "Home", "Sports", "Electronics"][..])
        );
    }

    #[test]
    fn test_short_list_total_matches() {
        let page = transform().page(vec![record(1), record(2)]);
        assert_eq!(page.total, 2);
        assert_eq!(page.limit, 20);
    }

    #[test]
    fn test_detail_category_follows_id() {
        let t = transform();
        assert_eq!(t.detail(record(5)).category, "Electronics");
        assert_eq!(t.detail(record(3)).category, "Home");
        assert_eq!(t.detail(record(-1)).category, "Sports");
        assert_eq!(t.detail(record(i32::MAX)).category, category_for(2));
    }

    #[test]
    fn test_image_urls() {
        let t = transform();
        let page = t.page(vec![record(7)]);
        assert_eq!(
            page.items.first().map(|i| i.image.as_str()),
            Some("https://picsum.photos/300/200?random=7")
        );
        assert_eq!(
            t.detail(record(7)).image,
            "https://picsum.photos/400/300?random=7"
        );
    }

    #[test]
    fn test_generated_fields_are_stable_and_in_range() {
        let t = transform();
        for id in 1..=50 {
            let a = t.detail(record(id));
            let b = t.detail(record(id));
            assert_eq!(a, b);

            assert!(a.price >= Price::from_whole(10));
            assert!(a.price < Price::from_whole(1010));
            assert!((1.0..=5.0).contains(&a.rating.rate));
            assert!((1..100).contains(&a.rating.count));
            assert!(((a.rating.rate * 10.0).round() - a.rating.rate * 10.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_list_and_detail_share_price() {
        let t = transform();
        let listed = t.page(vec![record(3)]).items.remove(0);
        let detail = t.detail(record(3));
        assert_eq!(listed.price, detail.price);
        assert_eq!(listed.rating, detail.rating);
    }

    #[test]
    fn test_seed_changes_generated_fields() {
        let a = transform();
        let b = ItemTransform::new(&CatalogConfig {
            transform_seed: 42,
            ..CatalogConfig::default()
        });
        let differs = (1..=20).any(|id| a.detail(record(id)) != b.detail(record(id)));
        assert!(differs);
    }
}
