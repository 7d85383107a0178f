// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, bail};
use showcase_app::{Product, ProductHost, ProductId};
use showcase_db::{NewProduct, Store};

pub struct StoreRuntime<'a> {
    store: &'a Store,
    read_only: bool,
}

impl<'a> StoreRuntime<'a> {
    pub fn new(store: &'a Store, read_only: bool) -> Self {
        Self { store, read_only }
    }

    fn ensure_writable(&self) -> Result<()> {
        if self.read_only {
            bail!("read-only session; restart without --read-only to change products");
        }
        Ok(())
    }
}

impl ProductHost for StoreRuntime<'_> {
    fn save_product(&mut self, product: &Product) -> Result<()> {
        self.ensure_writable()?;
        self.store
            .update_product(product)
            .with_context(|| format!("save product {}", product.id))
    }

    fn delete_product(&mut self, id: ProductId) -> Result<bool> {
        self.ensure_writable()?;
        self.store
            .soft_delete_product(id)
            .with_context(|| format!("delete product {id}"))
    }
}

impl showcase_tui::AppRuntime for StoreRuntime<'_> {
    fn load_products(&mut self) -> Result<Vec<Product>> {
        self.store.list_products()
    }

    fn create_product(&mut self) -> Result<Product> {
        self.ensure_writable()?;
        let id = self.store.create_product(&NewProduct::default())?;
        self.store.get_product(id)
    }
}
