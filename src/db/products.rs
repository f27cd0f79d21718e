//! Catalog reads and writes against the `products` and `product_attributes` tables.
//!
//! An empty code filter means "every product" throughout this module.

use anyhow::Result;
use rusqlite::{params, params_from_iter, Connection, Row};

use crate::catalog::{group_attributes, AttributeMapping, Product, ProductAttribute, ProductBatch};

const PRODUCT_COLUMNS: &str = "id, code, name, description, brand, category, gross_weight";

fn product_from_row(row: &Row<'_>) -> rusqlite::Result<Product> {
    Ok(Product {
        id: row.get(0)?,
        code: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        brand: row.get(4)?,
        category: row.get(5)?,
        gross_weight: row.get(6)?,
    })
}

fn attribute_from_row(row: &Row<'_>) -> rusqlite::Result<ProductAttribute> {
    Ok(ProductAttribute {
        id: row.get(0)?,
        product_code: row.get(1)?,
        name: row.get(2)?,
        value: row.get(3)?,
    })
}

/// `?1, ?2, ...` for an `IN (...)` clause of `n` values.
fn placeholders(n: usize) -> String {
    (1..=n).map(|i| format!("?{i}")).collect::<Vec<_>>().join(", ")
}

/// Load products by code, or all products when `codes` is empty. Ordered by insertion.
pub fn get_products(conn: &Connection, codes: &[String]) -> Result<Vec<Product>> {
    let sql = if codes.is_empty() {
        format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY rowid")
    } else {
        format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE code IN ({}) ORDER BY rowid",
            placeholders(codes.len())
        )
    };
    let mut stmt = conn.prepare(&sql)?;
    let products = stmt
        .query_map(params_from_iter(codes.iter()), product_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(products)
}

/// Load attributes grouped by product code, or every attribute when `codes` is empty.
pub fn get_attribute_mapping(conn: &Connection, codes: &[String]) -> Result<AttributeMapping> {
    let sql = if codes.is_empty() {
        "SELECT id, product_code, name, value FROM product_attributes ORDER BY id".to_string()
    } else {
        format!(
            "SELECT id, product_code, name, value FROM product_attributes WHERE product_code IN ({}) ORDER BY id",
            placeholders(codes.len())
        )
    };
    let mut stmt = conn.prepare(&sql)?;
    let attributes = stmt
        .query_map(params_from_iter(codes.iter()), attribute_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(group_attributes(attributes))
}

/// Load the products and attributes needed for one indexing request.
pub fn load_batch(conn: &Connection, codes: &[String]) -> Result<ProductBatch> {
    let products = get_products(conn, codes)?;
    let attribute_mapping = get_attribute_mapping(conn, codes)?;
    tracing::debug!(
        requested = codes.len(),
        products = products.len(),
        attributed = attribute_mapping.len(),
        "catalog batch loaded"
    );
    Ok(ProductBatch {
        products,
        attribute_mapping,
    })
}

/// Insert or replace a product row.
pub fn upsert_product(conn: &Connection, product: &Product) -> Result<()> {
    conn.execute(
        "INSERT INTO products (id, code, name, description, brand, category, gross_weight) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7) \
         ON CONFLICT(id) DO UPDATE SET code = excluded.code, name = excluded.name, \
         description = excluded.description, brand = excluded.brand, \
         category = excluded.category, gross_weight = excluded.gross_weight",
        params![
            product.id,
            product.code,
            product.name,
            product.description,
            product.brand,
            product.category,
            product.gross_weight(),
        ],
    )?;
    Ok(())
}

/// Attach an attribute to a product. Returns the new attribute id.
pub fn insert_attribute(conn: &Connection, product_code: &str, name: &str, value: &str) -> Result<i64> {
    conn.execute(
        "INSERT INTO product_attributes (product_code, name, value) VALUES (?1, ?2, ?3)",
        params![product_code, name, value],
    )?;
    Ok(conn.last_insert_rowid())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;

    fn seeded() -> Connection {
        let conn = open_memory_database().unwrap();
        upsert_product(&conn, &Product::new("1", "SH-01", "Red Shoe")).unwrap();
        upsert_product(&conn, &Product::new("2", "SA-01", "Red Sandal")).unwrap();
        upsert_product(&conn, &Product::new("3", "LP-01", "Blue Laptop")).unwrap();
        insert_attribute(&conn, "SH-01", "size", "42").unwrap();
        insert_attribute(&conn, "LP-01", "ram", "16GB").unwrap();
        insert_attribute(&conn, "SH-01", "material", "leather").unwrap();
        conn
    }

    #[test]
    fn empty_filter_loads_everything() {
        let conn = seeded();
        let products = get_products(&conn, &[]).unwrap();
        let codes: Vec<&str> = products.iter().map(|p| p.code.as_str()).collect();
        assert_eq!(codes, vec!["SH-01", "SA-01", "LP-01"]);

        let mapping = get_attribute_mapping(&conn, &[]).unwrap();
        assert_eq!(mapping.len(), 2);
        assert_eq!(mapping["SH-01"].len(), 2);
    }

    #[test]
    fn code_filter_restricts_products_and_attributes() {
        let conn = seeded();
        let batch = load_batch(&conn, &["SH-01".to_string(), "SA-01".to_string()]).unwrap();
        assert_eq!(batch.products.len(), 2);
        assert!(batch.attribute_mapping.contains_key("SH-01"));
        assert!(!batch.attribute_mapping.contains_key("LP-01"));

        let shoe = &batch.products[0];
        let names: Vec<&str> = batch
            .attributes_for(shoe)
            .iter()
            .map(|a| a.name.as_str())
            .collect();
        assert_eq!(names, vec!["size", "material"]);
        assert!(batch.attributes_for(&batch.products[1]).is_empty());
    }

    #[test]
    fn unknown_codes_load_nothing() {
        let conn = seeded();
        let products = get_products(&conn, &["NOPE".to_string()]).unwrap();
        assert!(products.is_empty());
    }

    #[test]
    fn upsert_product_replaces_fields() {
        let conn = seeded();
        let mut shoe = Product::new("1", "SH-01", "Crimson Shoe");
        shoe.gross_weight = Some(f64::NAN);
        upsert_product(&conn, &shoe).unwrap();

        let loaded = get_products(&conn, &["SH-01".to_string()]).unwrap();
        assert_eq!(loaded[0].name, "Crimson Shoe");
        assert_eq!(loaded[0].gross_weight, Some(0.0));
    }
}
