// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use showcase_app::{Product, ProductHost, ProductId, StorageEstimate, StorageEstimator};
use std::cell::Cell;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::rc::Rc;

const ADJECTIVES: [&str; 14] = [
    "Walnut",
    "Linen",
    "Copper",
    "Speckled",
    "Matte",
    "Handwoven",
    "Oak",
    "Stoneware",
    "Brass",
    "Glazed",
    "Recycled",
    "Marble",
    "Canvas",
    "Cedar",
];

const NOUNS: [&str; 16] = [
    "Mug",
    "Tote",
    "Lamp",
    "Planter",
    "Notebook",
    "Candle",
    "Throw",
    "Teapot",
    "Bowl",
    "Clock",
    "Vase",
    "Tray",
    "Stool",
    "Kettle",
    "Rug",
    "Pen",
];

const SHOPS: [&str; 6] = [
    "shop.example.com",
    "store.example.org",
    "market.example.net",
    "goods.example.com",
    "crafts.example.org",
    "outlet.example.net",
];

const WORDS: [&str; 24] = [
    "hand",
    "made",
    "small",
    "batch",
    "durable",
    "finish",
    "everyday",
    "gift",
    "natural",
    "dye",
    "soft",
    "glaze",
    "kiln",
    "fired",
    "sturdy",
    "base",
    "warm",
    "light",
    "classic",
    "shape",
    "dishwasher",
    "safe",
    "ethically",
    "sourced",
];

/// A product as the faker produces it, before a store assigns an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeProduct {
    pub name: String,
    pub description: String,
    pub image: String,
    pub sponsored_link: Option<String>,
}

impl FakeProduct {
    pub fn with_id(self, id: ProductId) -> Product {
        Product {
            id,
            name: self.name,
            description: self.description,
            image: self.image,
            sponsored_link: self.sponsored_link,
        }
    }
}

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }
}

#[derive(Debug, Clone)]
pub struct ProductFaker {
    rng: DeterministicRng,
    issued: u64,
}

impl ProductFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
            issued: 0,
        }
    }

    pub fn int_n(&mut self, n: usize) -> usize {
        self.rng.int_n(n)
    }

    pub fn product(&mut self) -> FakeProduct {
        self.issued += 1;
        let name = format!("{} {}", self.pick(&ADJECTIVES), self.pick(&NOUNS));
        let description = self.sentence(4, 12);
        let image = format!("https://images.example.com/products/{}.png", slug(&name));
        let sponsored_link = if self.rng.int_n(3) == 0 {
            None
        } else {
            Some(format!("https://{}/p/{}", self.pick(&SHOPS), slug(&name)))
        };
        FakeProduct {
            name,
            description,
            image,
            sponsored_link,
        }
    }

    /// A product whose id follows the order of issue, starting at 1.
    pub fn product_with_id(&mut self) -> Product {
        let fake = self.product();
        fake.with_id(ProductId::new(self.issued as i64))
    }

    fn pick<'a>(&mut self, items: &[&'a str]) -> &'a str {
        items[self.rng.int_n(items.len())]
    }

    fn sentence(&mut self, min_words: usize, max_words: usize) -> String {
        let count = min_words + self.rng.int_n(max_words - min_words + 1);
        let parts: Vec<&str> = (0..count).map(|_| self.pick(&WORDS)).collect();
        let mut sentence = parts.join(" ");
        if let Some(first) = sentence.get_mut(0..1) {
            first.make_ascii_uppercase();
        }
        sentence.push('.');
        sentence
    }
}

fn slug(name: &str) -> String {
    name.to_ascii_lowercase().replace(' ', "-")
}

pub fn temp_db_path() -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let db_path = dir.path().join("showcase.db");
    Ok((dir, db_path))
}

/// Records every save and answers deletes from a script. An empty script
/// answers `true`.
#[derive(Debug, Default)]
pub struct RecordingHost {
    pub saved: Vec<Product>,
    pub delete_requests: Vec<ProductId>,
    delete_answers: VecDeque<Result<bool>>,
    save_failure: Option<String>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer_deletes_with(mut self, answer: bool) -> Self {
        self.delete_answers.push_back(Ok(answer));
        self
    }

    pub fn fail_deletes_with(mut self, message: &str) -> Self {
        self.delete_answers.push_back(Err(anyhow!(message.to_owned())));
        self
    }

    pub fn fail_saves_with(mut self, message: &str) -> Self {
        self.save_failure = Some(message.to_owned());
        self
    }

    pub fn last_saved(&self) -> Option<&Product> {
        self.saved.last()
    }
}

impl ProductHost for RecordingHost {
    fn save_product(&mut self, product: &Product) -> Result<()> {
        if let Some(message) = &self.save_failure {
            return Err(anyhow!(message.clone()));
        }
        self.saved.push(product.clone());
        Ok(())
    }

    fn delete_product(&mut self, id: ProductId) -> Result<bool> {
        self.delete_requests.push(id);
        self.delete_answers.pop_front().unwrap_or(Ok(true))
    }
}

/// Replays scripted estimates. Once the script runs out it keeps returning the
/// steady value, or an error when there is none.
#[derive(Debug)]
pub struct ScriptedEstimator {
    script: VecDeque<Result<StorageEstimate>>,
    steady: Option<StorageEstimate>,
    calls: Rc<Cell<usize>>,
}

impl ScriptedEstimator {
    pub fn new(script: Vec<Result<StorageEstimate>>) -> Self {
        Self {
            script: script.into(),
            steady: None,
            calls: Rc::new(Cell::new(0)),
        }
    }

    pub fn steady(used_bytes: u64, total_bytes: u64) -> Self {
        Self {
            script: VecDeque::new(),
            steady: Some(StorageEstimate {
                used_bytes,
                total_bytes,
            }),
            calls: Rc::new(Cell::new(0)),
        }
    }

    /// Shares the call counter so a test can observe it after boxing the estimator.
    pub fn call_counter(&self) -> Rc<Cell<usize>> {
        Rc::clone(&self.calls)
    }
}

impl StorageEstimator for ScriptedEstimator {
    fn estimate(&mut self) -> Result<StorageEstimate> {
        self.calls.set(self.calls.get() + 1);
        if let Some(next) = self.script.pop_front() {
            return next;
        }
        self.steady
            .ok_or_else(|| anyhow!("scripted estimator has no more results"))
    }
}

#[cfg(test)]
mod tests {
    use super::{ProductFaker, RecordingHost, ScriptedEstimator};
    use anyhow::anyhow;
    use showcase_app::{Product, ProductHost, ProductId, StorageEstimate, StorageEstimator};
    use std::collections::BTreeSet;

    #[test]
    fn new_deterministic_seed() {
        let mut left = ProductFaker::new(42);
        let mut right = ProductFaker::new(42);
        assert_eq!(left.product(), right.product());
    }

    #[test]
    fn product_fields_are_populated() {
        let mut faker = ProductFaker::new(7);
        let product = faker.product();

        assert!(product.name.contains(' '));
        assert!(product.description.ends_with('.'));
        assert!(product.image.starts_with("https://images.example.com/"));
        if let Some(link) = &product.sponsored_link {
            assert!(link.starts_with("https://"));
        }
    }

    #[test]
    fn ids_follow_issue_order() {
        let mut faker = ProductFaker::new(3);
        assert_eq!(faker.product_with_id().id, ProductId::new(1));
        assert_eq!(faker.product_with_id().id, ProductId::new(2));
    }

    #[test]
    fn variety_across_seeds() {
        let names: BTreeSet<String> = (1_u64..30_u64)
            .map(|seed| ProductFaker::new(seed).product().name)
            .collect();
        assert!(names.len() > 10, "expected varied names, got {names:?}");
    }

    #[test]
    fn recording_host_scripts_deletes() -> anyhow::Result<()> {
        let mut host = RecordingHost::new()
            .answer_deletes_with(false)
            .fail_deletes_with("locked");
        let id = ProductId::new(9);

        assert!(!host.delete_product(id)?);
        assert!(host.delete_product(id).is_err());
        assert!(host.delete_product(id)?);
        assert_eq!(host.delete_requests.len(), 3);

        host.save_product(&Product::blank(id))?;
        assert_eq!(host.last_saved().map(|p| p.id), Some(id));
        Ok(())
    }

    #[test]
    fn scripted_estimator_falls_back_to_steady() -> anyhow::Result<()> {
        let mut estimator = ScriptedEstimator::steady(1, 2);
        let calls = estimator.call_counter();
        assert_eq!(
            estimator.estimate()?,
            StorageEstimate {
                used_bytes: 1,
                total_bytes: 2
            }
        );
        assert_eq!(calls.get(), 1);

        let mut exhausted = ScriptedEstimator::new(vec![Err(anyhow!("boom"))]);
        assert!(exhausted.estimate().is_err());
        assert!(exhausted.estimate().is_err());
        Ok(())
    }
}
