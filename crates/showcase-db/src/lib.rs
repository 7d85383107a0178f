// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod estimate;

pub use estimate::{DiskEstimator, StoreQuotaEstimator, sidecar_paths};

use anyhow::{Context, Result, anyhow, bail};
use rusqlite::{Connection, OptionalExtension, params};
use sha2::{Digest, Sha256};
use showcase_app::{Product, ProductId};
use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{debug, info};

pub const APP_NAME: &str = "showcase";
pub const DEFAULT_QUOTA_BUDGET_BYTES: u64 = 50 << 20;

const REQUIRED_SCHEMA: &[(&str, &[&str])] = &[(
    "products",
    &[
        "id",
        "name",
        "description",
        "image",
        "image_sha256",
        "sponsored_link",
        "created_at",
        "updated_at",
        "deleted_at",
    ],
)];

const DEMO_PRODUCTS: [(&str, &str, &str, Option<&str>); 5] = [
    (
        "Speckled Stoneware Mug",
        "Kiln fired in small batches.\nHolds 12 oz and is dishwasher safe.",
        "https://images.example.com/products/speckled-stoneware-mug.png",
        Some("https://shop.example.com/p/speckled-stoneware-mug"),
    ),
    (
        "Linen Tote",
        "Heavyweight natural linen with an inside pocket.",
        "https://images.example.com/products/linen-tote.png",
        None,
    ),
    (
        "Walnut Desk Lamp",
        "Warm light on a turned walnut base.",
        "https://images.example.com/products/walnut-desk-lamp.png",
        Some("https://store.example.org/p/walnut-desk-lamp"),
    ),
    (
        "Copper Planter",
        "Hammered copper with a drainage tray.",
        "",
        None,
    ),
    (
        "Canvas Notebook",
        "A5, dot grid, lay-flat binding.",
        "data:image/png;base64,not-really-an-image",
        Some("https://market.example.net/p/canvas-notebook"),
    ),
];

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub image: String,
    pub sponsored_link: Option<String>,
}

pub struct Store {
    conn: Connection,
    path: Option<PathBuf>,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let printable = path.to_string_lossy().to_string();
        validate_db_path(&printable)?;
        let conn = Connection::open(path)
            .with_context(|| format!("open database at {}", path.display()))?;
        configure_connection(&conn)?;
        let path = (printable != ":memory:").then(|| path.to_path_buf());
        Ok(Self { conn, path })
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory database")?;
        configure_connection(&conn)?;
        Ok(Self { conn, path: None })
    }

    /// The database file, or `None` for an in-memory store.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn bootstrap(&self) -> Result<()> {
        if has_user_tables(&self.conn)? {
            validate_schema(&self.conn)?;
            info!(path = ?self.path, "validated existing product schema");
        } else {
            self.conn
                .execute_batch(include_str!("sql/schema.sql"))
                .context("create schema")?;
            info!(path = ?self.path, "created product schema");
        }
        Ok(())
    }

    pub fn list_products(&self) -> Result<Vec<Product>> {
        let mut stmt = self
            .conn
            .prepare(
                "
                SELECT id, name, description, image, sponsored_link
                FROM products
                WHERE deleted_at IS NULL
                ORDER BY id ASC
                ",
            )
            .context("prepare products query")?;
        let rows = stmt
            .query_map([], product_from_row)
            .context("query products")?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("collect products")
    }

    pub fn get_product(&self, product_id: ProductId) -> Result<Product> {
        self.conn
            .query_row(
                "
                SELECT id, name, description, image, sponsored_link
                FROM products
                WHERE id = ? AND deleted_at IS NULL
                ",
                params![product_id.get()],
                product_from_row,
            )
            .optional()
            .with_context(|| format!("load product {product_id}"))?
            .ok_or_else(|| anyhow!("product {product_id} not found or deleted"))
    }

    pub fn create_product(&self, product: &NewProduct) -> Result<ProductId> {
        let now = now_rfc3339()?;
        self.conn
            .execute(
                "
                INSERT INTO products (
                  name, description, image, image_sha256, sponsored_link,
                  created_at, updated_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?)
                ",
                params![
                    product.name,
                    product.description,
                    product.image,
                    checksum_sha256(product.image.as_bytes()),
                    normalize_link(product.sponsored_link.as_deref()),
                    now,
                    now,
                ],
            )
            .context("insert product")?;

        let id = ProductId::new(self.conn.last_insert_rowid());
        debug!(product_id = id.get(), "created product");
        Ok(id)
    }

    /// Writes every field of `product` over the live row with the same id.
    pub fn update_product(&self, product: &Product) -> Result<()> {
        let now = now_rfc3339()?;
        let rows_affected = self
            .conn
            .execute(
                "
                UPDATE products
                SET
                  name = ?,
                  description = ?,
                  image = ?,
                  image_sha256 = ?,
                  sponsored_link = ?,
                  updated_at = ?
                WHERE id = ? AND deleted_at IS NULL
                ",
                params![
                    product.name,
                    product.description,
                    product.image,
                    checksum_sha256(product.image.as_bytes()),
                    normalize_link(product.sponsored_link.as_deref()),
                    now,
                    product.id.get(),
                ],
            )
            .context("update product")?;
        if rows_affected == 0 {
            bail!(
                "product {} not found or deleted -- reopen the list and retry",
                product.id
            );
        }
        Ok(())
    }

    /// Marks the product deleted. Returns `false` when no live row matched.
    pub fn soft_delete_product(&self, product_id: ProductId) -> Result<bool> {
        let now = now_rfc3339()?;
        let rows_affected = self
            .conn
            .execute(
                "UPDATE products SET deleted_at = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL",
                params![now, now, product_id.get()],
            )
            .with_context(|| format!("soft delete product {product_id}"))?;
        Ok(rows_affected > 0)
    }

    pub fn product_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM products WHERE deleted_at IS NULL",
                [],
                |row| row.get(0),
            )
            .context("count products")?;
        usize::try_from(count).context("product count out of range")
    }

    pub fn image_checksum(&self, product_id: ProductId) -> Result<String> {
        self.conn
            .query_row(
                "SELECT image_sha256 FROM products WHERE id = ?",
                params![product_id.get()],
                |row| row.get(0),
            )
            .with_context(|| format!("load image checksum for product {product_id}"))
    }

    /// Inserts the demo catalog into an empty store. Returns how many rows were added.
    pub fn seed_demo_data(&self) -> Result<usize> {
        if self.product_count()? > 0 {
            return Ok(0);
        }
        for (name, description, image, link) in DEMO_PRODUCTS {
            self.create_product(&NewProduct {
                name: name.to_owned(),
                description: description.to_owned(),
                image: image.to_owned(),
                sponsored_link: link.map(str::to_owned),
            })
            .with_context(|| format!("seed demo product {name}"))?;
        }
        info!(count = DEMO_PRODUCTS.len(), "seeded demo products");
        Ok(DEMO_PRODUCTS.len())
    }
}

pub fn default_db_path() -> Result<PathBuf> {
    if let Some(override_path) = env::var_os("SHOWCASE_DB_PATH") {
        return Ok(PathBuf::from(override_path));
    }

    let data_root = dirs::data_local_dir().ok_or_else(|| {
        anyhow!("cannot resolve data directory; set SHOWCASE_DB_PATH to a writable database path")
    })?;

    let app_dir = data_root.join(APP_NAME);
    fs::create_dir_all(&app_dir)
        .with_context(|| format!("create data directory {}", app_dir.display()))?;
    Ok(app_dir.join("showcase.db"))
}

/// Where downloaded product images land: the user's download directory, falling
/// back to a folder under the data directory.
pub fn default_downloads_dir() -> Result<PathBuf> {
    if let Some(dir) = dirs::download_dir() {
        return Ok(dir);
    }
    let data_root = dirs::data_local_dir().ok_or_else(|| {
        anyhow!("cannot resolve a downloads directory; set [storage].downloads_dir in the config")
    })?;
    Ok(data_root.join(APP_NAME).join("downloads"))
}

pub fn validate_db_path(path: &str) -> Result<()> {
    if path.is_empty() {
        bail!("database path must not be empty");
    }
    if path == ":memory:" {
        return Ok(());
    }

    if let Some(index) = path.find("://")
        && index > 0
    {
        let scheme = &path[..index];
        if scheme.chars().all(char::is_alphabetic) {
            bail!(
                "database path {path:?} looks like a URI ({scheme}://); pass a filesystem path instead"
            );
        }
    }

    if path.starts_with("file:") {
        bail!("database path {path:?} uses file: URI syntax; pass a plain filesystem path");
    }

    if path.contains('?') {
        bail!(
            "database path {path:?} contains '?'; remove query parameters and use a plain file path"
        );
    }

    Ok(())
}

fn product_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Product> {
    let sponsored_link: Option<String> = row.get(4)?;
    Ok(Product {
        id: ProductId::new(row.get(0)?),
        name: row.get(1)?,
        description: row.get(2)?,
        image: row.get(3)?,
        sponsored_link: normalize_link(sponsored_link.as_deref()),
    })
}

fn normalize_link(link: Option<&str>) -> Option<String> {
    link.filter(|value| !value.is_empty()).map(str::to_owned)
}

fn has_user_tables(conn: &Connection) -> Result<bool> {
    let count: i64 = conn
        .query_row(
            "
            SELECT COUNT(*)
            FROM sqlite_master
            WHERE type = 'table'
              AND name NOT LIKE 'sqlite_%'
            ",
            [],
            |row| row.get(0),
        )
        .context("count user tables")?;
    Ok(count > 0)
}

fn validate_schema(conn: &Connection) -> Result<()> {
    for (table, required_columns) in REQUIRED_SCHEMA {
        let columns = table_columns(conn, table)?;
        if columns.is_empty() {
            bail!(
                "database is missing required table `{table}`; point [storage].db_path at a showcase database"
            );
        }

        let missing: Vec<&str> = required_columns
            .iter()
            .copied()
            .filter(|column| !columns.contains(*column))
            .collect();
        if !missing.is_empty() {
            bail!(
                "table `{table}` is missing required columns: {}; run migration before launching",
                missing.join(", ")
            );
        }
    }
    Ok(())
}

fn table_columns(conn: &Connection, table: &str) -> Result<BTreeSet<String>> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({table})"))
        .with_context(|| format!("inspect columns for {table}"))?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .with_context(|| format!("query column info for {table}"))?;
    rows.collect::<rusqlite::Result<BTreeSet<_>>>()
        .with_context(|| format!("collect columns for {table}"))
}

fn configure_connection(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        PRAGMA foreign_keys = ON;
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA busy_timeout = 5000;
        ",
    )
    .context("configure sqlite pragmas")
}

fn now_rfc3339() -> Result<String> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .context("format current timestamp")
}

fn checksum_sha256(data: &[u8]) -> String {
    let digest = Sha256::digest(data);
    let mut output = String::with_capacity(64);
    for byte in digest {
        use std::fmt::Write as _;
        let _ = write!(&mut output, "{byte:02x}");
    }
    output
}
